use std::time::{Duration, Instant};

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::{pin_mut, Stream, TryStreamExt};
use log::debug;
use warp::{
    http::StatusCode,
    reject,
    reply::{json, with_header, with_status, Reply},
};

use super::rejection::Rejection;
use super::response::{SuccessResponse, REGISTRATION_MESSAGE};
use super::SERVER_TIMING_HEADER;
use crate::environment::Environment;
use crate::errors::BackendError;
use crate::registration;

type RouteResult = Result<Box<dyn Reply>, reject::Rejection>;

pub async fn register(environment: Environment, body: Bytes) -> RouteResult {
    let start = Instant::now();

    debug!(environment.logger, "Received registration request"; "length" => body.len());
    let result = registration::register(&environment, &body).await;
    let server_timing = format_server_timing(start.elapsed());

    match result {
        Ok(record) => {
            debug!(environment.logger, "Sending response..."; "id" => record.id);

            let response = SuccessResponse::Registration {
                message: REGISTRATION_MESSAGE,
            };

            Ok(Box::new(with_header(
                with_status(json(&response), StatusCode::CREATED),
                SERVER_TIMING_HEADER,
                server_timing,
            )))
        }
        Err(e) => Err(Rejection::new(e, server_timing).into()),
    }
}

/// Collects a request body, chunked or not. A declared length over
/// `limit` is refused before anything is read; otherwise reading stops as
/// soon as the running total passes it.
pub async fn read_body<S, B>(
    stream: S,
    declared_length: Option<u64>,
    limit: u64,
) -> Result<Bytes, reject::Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    let start = Instant::now();
    let fail = |error: BackendError| -> reject::Rejection {
        reject::custom(Rejection::new(error, format_server_timing(start.elapsed())))
    };

    if declared_length.map_or(false, |length| length > limit) {
        return Err(fail(BackendError::PayloadTooLarge { limit }));
    }

    pin_mut!(stream);
    let mut body = BytesMut::new();

    while let Some(chunk) = stream
        .try_next()
        .await
        .map_err(|_| fail(BackendError::MalformedRequest))?
    {
        if (body.len() + chunk.remaining()) as u64 > limit {
            return Err(fail(BackendError::PayloadTooLarge { limit }));
        }

        body.put(chunk);
    }

    Ok(body.freeze())
}

fn format_server_timing(elapsed: Duration) -> String {
    format!("handler;dur={}", elapsed.as_secs_f64() * 1000.0)
}
