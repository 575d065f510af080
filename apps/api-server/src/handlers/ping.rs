//! Rate-limited ping endpoint.

use actix_web::{HttpMessage, HttpRequest, HttpResponse, web};
use tally_core::{Decision, LimiterIdentity};
use tally_shared::ApiResponse;
use tally_shared::dto::RateLimitStatus;

use crate::middleware::error::{AppError, AppResult};
use crate::observability::RequestId;
use crate::state::AppState;

/// Reports the caller's standing after this request was admitted.
///
/// GET /api/ping
pub async fn ping(
    req: HttpRequest,
    request_id: RequestId,
    state: web::Data<AppState>,
) -> AppResult<HttpResponse> {
    let (decision, identity) = {
        let extensions = req.extensions();
        let decision = extensions.get::<Decision>().copied();
        let identity = extensions.get::<LimiterIdentity>().map(|id| id.to_string());
        decision.zip(identity)
    }
    .ok_or_else(|| AppError::Internal("ping served without rate limiting".to_string()))?;

    let status = RateLimitStatus {
        identity,
        limit: decision.allowed(),
        window_minutes: state.policy.window_minutes,
        remaining: decision.remaining(),
    };

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        status,
        format!("pong ({})", request_id.as_str()),
    )))
}
