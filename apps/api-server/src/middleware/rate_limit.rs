//! Rate limiting middleware.
//!
//! Keys each request by the client's real IP, runs it through a per-client
//! [`RateLimiter`] over the shared cache and turns a rejection into a 429.

use actix_web::{
    Error, HttpMessage, ResponseError,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;

use tally_core::Decision;

use crate::middleware::error::{AppError, seconds_to_next_minute};
use crate::observability::RequestId;
use crate::state::AppState;

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    state: AppState,
}

impl RateLimitMiddleware {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            state: self.state.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    state: AppState,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let state = self.state.clone();

        Box::pin(async move {
            // Get client identifier (IP address)
            let key = req
                .connection_info()
                .realip_remote_addr()
                .unwrap_or("unknown")
                .to_string();

            let limiter = match state.limiter_for(&key) {
                Ok(limiter) => limiter,
                Err(e) => return Ok(reject(req, AppError::from(e))),
            };

            match limiter.evaluate(&state.policy).await {
                Ok(decision @ Decision::Admitted { .. }) => {
                    {
                        let mut extensions = req.extensions_mut();
                        extensions.insert(decision);
                        extensions.insert(limiter.identity().clone());
                    }
                    let mut res = service.call(req).await?;
                    let headers = res.headers_mut();
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-limit"),
                        HeaderValue::from(decision.allowed()),
                    );
                    headers.insert(
                        HeaderName::from_static("x-ratelimit-remaining"),
                        HeaderValue::from(decision.remaining()),
                    );
                    Ok(res.map_into_left_body())
                }
                Ok(Decision::Rejected { total, allowed }) => {
                    tracing::warn!(
                        identity = %limiter.identity(),
                        total,
                        allowed,
                        "Rate limit exceeded"
                    );
                    let request_id = req.extensions().get::<RequestId>().map(|id| id.0.clone());
                    let error = AppError::TooManyRequests {
                        identity: limiter.identity().to_string(),
                        allowed,
                        retry_after_secs: seconds_to_next_minute(),
                        request_id,
                    };
                    Ok(reject(req, error))
                }
                Err(e) if state.fail_open => {
                    tracing::error!(error = %e, "Rate limiter backend error, failing open");
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(e) => Ok(reject(req, AppError::from(e))),
            }
        })
    }
}

fn reject<B>(req: ServiceRequest, error: AppError) -> ServiceResponse<EitherBody<B>> {
    req.into_response(error.error_response()).map_into_right_body()
}
