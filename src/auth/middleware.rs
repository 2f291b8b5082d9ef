use crate::auth::auth::ViewerSession;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::utils::session_revocation::RevokedSessions;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header.and_then(|h| h.strip_prefix("Bearer ")).map(str::trim)
}

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?
        .clone();
    let revoked = req
        .app_data::<Data<RevokedSessions>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("Session store missing"))?
        .clone();

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"error": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let token = match bearer_token(Some(header_value)) {
        Some(t) => t,
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"error": "Authorization header must start with Bearer"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"error": "Invalid or expired session", "details": e}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    if revoked.is_revoked(&claims.jti).await {
        let resp = HttpResponse::Unauthorized().json(json!({"error": "Session logged out"}));
        return Ok(req.into_response(resp.map_into_boxed_body()));
    }

    req.extensions_mut().insert(ViewerSession::from(claims));

    next.call(req).await
}
