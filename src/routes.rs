use std::sync::Arc;

use log::{error, warn, Logger};
use warp::http::StatusCode;
use warp::reject;
use warp::reply::{json, with_header, with_status, Reply};
use warp::Filter;

use crate::environment::Environment;
use crate::errors::BackendError;

pub mod admin;
mod handlers;
mod rejection;
mod response;

pub use internal::*;
pub use rejection::ErrorResponse;
pub use response::REGISTRATION_MESSAGE;

const SERVER_TIMING_HEADER: &str = "server-timing";

/// Request headers accepted on cross-origin requests.
const ALLOWED_HEADERS: [&str; 7] = [
    "accept",
    "accept-language",
    "authorization",
    "content-language",
    "content-type",
    "origin",
    "x-requested-with",
];

/// The public API: the registration route with CORS and error
/// formatting applied.
pub fn make_api(
    environment: Environment,
) -> impl Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    let logger = environment.logger.clone();

    let cors = warp::cors()
        .allow_any_origin()
        .allow_methods(vec!["POST"])
        .allow_headers(ALLOWED_HEADERS.iter().copied());

    make_registration_route(environment)
        .recover(move |r| format_rejection(logger.clone(), r))
        .with(cors)
}

pub async fn format_rejection(
    logger: Arc<Logger>,
    rej: reject::Rejection,
) -> Result<Box<dyn Reply>, reject::Rejection> {
    if let Some(r) = rej.find::<rejection::Rejection>() {
        let e = &r.error;
        let status = status_code_for(e);

        if status.is_server_error() {
            error!(logger, "Backend error"; "error" => ?e, "status" => %status, "message" => %e);
        } else {
            warn!(logger, "Rejected registration"; "error" => ?e, "status" => %status, "message" => %e);
        }

        let reply = with_status(json(&r.flatten()), status);

        return Ok(Box::new(with_header(
            reply,
            SERVER_TIMING_HEADER,
            r.server_timing.clone(),
        )));
    }

    Err(rej)
}

fn status_code_for(e: &BackendError) -> StatusCode {
    use BackendError::*;

    match e {
        MalformedRequest | MissingFields(..) => StatusCode::BAD_REQUEST,
        PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        DuplicateRegistration => StatusCode::CONFLICT,
        PhotoProcessing { .. } | DatabaseConnection { .. } | Sqlx { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

mod internal {
    use bytes::Bytes;
    use warp::filters::BoxedFilter;
    use warp::path::end;
    use warp::reject;
    use warp::Filter;
    use warp::Reply;
    use warp::{path as p, post};

    use super::handlers;
    use crate::environment::Environment;

    type Route = BoxedFilter<(Box<dyn Reply>,)>;

    /// `POST /<registration path>` with a JSON body.
    pub fn make_registration_route(environment: Environment) -> Route {
        let path = environment.config.registration_path.clone();
        let limit = environment.config.max_content_length;

        warp::any()
            .map(move || environment.clone())
            .and(p(path))
            .and(end())
            .and(post())
            .and(body(limit))
            .and_then(handlers::register)
            .boxed()
    }

    /// The raw request body, read whether or not it came with a
    /// `content-length`, refusing anything over `limit` bytes.
    fn body(limit: u64) -> impl Filter<Extract = (Bytes,), Error = reject::Rejection> + Clone {
        warp::header::optional::<u64>("content-length")
            .and(warp::body::stream())
            .and_then(move |declared_length: Option<u64>, stream| {
                handlers::read_body(stream, declared_length, limit)
            })
    }
}
