use warp::reject;
use warp::reply::{json, Reply};
use warp::Filter;

use super::response::SuccessResponse;

/// `GET /healthz`, reporting the build that is running.
pub fn make_healthz_route(
) -> impl warp::Filter<Extract = (impl Reply,), Error = reject::Rejection> + Clone {
    warp::path("healthz")
        .and(warp::path::end())
        .and(warp::get())
        .map(move || {
            json(&SuccessResponse::Healthz {
                name: info::NAME,
                revision: info::REVISION,
                timestamp: info::BUILD_TIMESTAMP,
                version: info::VERSION,
            })
        })
}
