//! HTTP boundary
//!
//! GET /registerdevice?uid=&key=
//! GET /gettoken?uid=&timestamp=&signature=
//! GET /health
//!
//! Parameter validation, outcome → status mapping and request logging live
//! here; the token service never sees HTTP types.

use crate::{
    error::{Result, TvmError},
    packaging::SignedPayload,
    requests::{RegisterDeviceRequest, TokenRequestParams},
    service::AnonymousTokenService,
};
use actix_web::{get, http::StatusCode, web, HttpResponse, Responder, ResponseError};
use tracing::{error, info, warn};

const LOG_VALUE_LIMIT: usize = 80;

impl ResponseError for TvmError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(TvmError::status_code(self))
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        // Server-side detail stays in the logs
        let message = if self.is_client_error() {
            self.to_string()
        } else {
            "Internal server error".to_string()
        };

        HttpResponse::build(ResponseError::status_code(self)).json(serde_json::json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}

/// Escape a client-supplied value for logging
pub fn log_safe(value: &str) -> String {
    let escaped = value.escape_default().to_string();
    if escaped.len() > LOG_VALUE_LIMIT {
        format!("{}...", &escaped[..LOG_VALUE_LIMIT])
    } else {
        escaped
    }
}

fn log_outcome<T>(operation: &str, uid: &str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => info!(operation, uid, "request succeeded"),
        Err(e) if e.is_client_error() => {
            warn!(operation, uid, status = TvmError::status_code(e), "request rejected: {}", e)
        }
        Err(e) => {
            error!(operation, uid, status = TvmError::status_code(e), "request failed: {}", e)
        }
    }
    result
}

/// Register a device
#[get("/registerdevice")]
pub async fn register_device(
    service: web::Data<AnonymousTokenService>,
    query: web::Query<RegisterDeviceRequest>,
) -> Result<impl Responder> {
    let uid = log_safe(&query.uid);
    info!(uid = %uid, "register device request");

    let result: Result<()> = async {
        let (identifier, key) = query.into_inner().into_validated()?;
        service.register_device(&identifier, &key).await
    }
    .await;
    log_outcome("registerdevice", &uid, result)?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "status": "registered" })))
}

/// Validate a signed token request and return the packaged credentials
#[get("/gettoken")]
pub async fn get_token(
    service: web::Data<AnonymousTokenService>,
    query: web::Query<TokenRequestParams>,
) -> Result<impl Responder> {
    let uid = log_safe(&query.uid);
    info!(uid = %uid, timestamp = %log_safe(&query.timestamp), "token request");

    let result: Result<SignedPayload> = async {
        let request = query.into_inner().into_token_request()?;
        service.request_token(&request).await
    }
    .await;
    let payload = log_outcome("gettoken", &uid, result)?;

    Ok(HttpResponse::Ok().json(payload))
}

/// Health check endpoint
#[get("/health")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Register routes. The service itself is provided as `web::Data` by the caller.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| TvmError::Validation(err.to_string()).into()),
    )
    .service(register_device)
    .service(get_token)
    .service(health_check);
}
