//! Admission control middleware.

use actix_web::{
    Error,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::header::{self, HeaderName, HeaderValue},
};
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use forum_core::ports::AdmissionLimiter;

use crate::middleware::error::AppError;

const REMAINING_HEADER: &str = "x-ratelimit-remaining";

/// Admission middleware factory.
///
/// Runs before routing. A rejected request is answered with 429 and never
/// reaches a handler. Limiter failures admit the request.
pub struct AdmissionMiddleware {
    limiter: Arc<dyn AdmissionLimiter>,
    trust_proxy: bool,
}

impl AdmissionMiddleware {
    pub fn new(limiter: Arc<dyn AdmissionLimiter>, trust_proxy: bool) -> Self {
        Self {
            limiter,
            trust_proxy,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdmissionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AdmissionService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdmissionService {
            service: Rc::new(service),
            limiter: self.limiter.clone(),
            trust_proxy: self.trust_proxy,
        }))
    }
}

pub struct AdmissionService<S> {
    service: Rc<S>,
    limiter: Arc<dyn AdmissionLimiter>,
    trust_proxy: bool,
}

/// Client identity: the socket peer, or the forwarded address behind a
/// trusted proxy.
fn client_key(req: &ServiceRequest, trust_proxy: bool) -> String {
    let info = req.connection_info();
    let addr = if trust_proxy {
        info.realip_remote_addr()
    } else {
        info.peer_addr()
    };
    addr.unwrap_or("unknown").to_string()
}

/// Whole seconds until the window resets, never zero.
fn retry_after_secs(reset_after: Duration) -> u64 {
    let secs = reset_after.as_secs();
    if reset_after.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs.max(1)
    }
}

impl<S, B> Service<ServiceRequest> for AdmissionService<S>
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
        let limiter = self.limiter.clone();
        let client = client_key(&req, self.trust_proxy);

        Box::pin(async move {
            let remaining = match limiter.admit(&client).await {
                Ok(admission) if !admission.allowed => {
                    let retry_after = retry_after_secs(admission.reset_after);
                    tracing::warn!(client = %client, retry_after, "Admission rejected");

                    let mut response = AppError::TooManyRequests.respond_to(req.request());
                    let headers = response.headers_mut();
                    headers.insert(header::RETRY_AFTER, HeaderValue::from(retry_after));
                    headers.insert(HeaderName::from_static(REMAINING_HEADER), HeaderValue::from(0u32));

                    return Ok(req.into_response(response).map_into_right_body());
                }
                Ok(admission) => Some(admission.remaining),
                Err(e) => {
                    tracing::error!(error = %e, client = %client, "Admission limiter failed, admitting request");
                    None
                }
            };

            let mut res = service.call(req).await?;
            if let Some(remaining) = remaining {
                res.headers_mut().insert(
                    HeaderName::from_static(REMAINING_HEADER),
                    HeaderValue::from(remaining),
                );
            }
            Ok(res.map_into_left_body())
        })
    }
}
