use crate::{
    auth::{
        auth::ViewerSession,
        jwt::{generate_session_token, session_claims, verify_token},
        middleware::bearer_token,
    },
    config::Config,
    error::{AppError, AppResult},
    google::oauth::GoogleOAuth,
    model::{permission::PermissionSet, staff::StaffRecord},
    models::{CallbackQuery, DevLoginReq, SessionResponse},
    utils::{roster_cache::RosterStore, session_revocation::RevokedSessions},
};
use actix_web::{HttpRequest, HttpResponse, Responder, get, web};
use serde_json::json;
use tracing::{debug, info, instrument, warn};

/// The staff entry an email may log in as: first row with that login id
/// whose permission label is login-eligible.
pub fn check_user_permission<'a>(
    email: &str,
    staff: &'a [StaffRecord],
    permissions: &PermissionSet,
) -> Option<&'a StaffRecord> {
    let email = email.trim();
    if email.is_empty() {
        return None;
    }
    staff
        .iter()
        .find(|s| s.login_id.trim() == email && permissions.can_login(&s.permission_label))
}

fn issue_session(staff: &StaffRecord, email: &str, config: &Config) -> AppResult<SessionResponse> {
    let claims = session_claims(staff, email, &config.permissions, config.session_ttl)?;
    let session_token = generate_session_token(&claims, &config.jwt_secret)?;
    info!(employee_id = %claims.employee_id, permission = %claims.permission_label, "Session created");
    Ok(SessionResponse {
        session_token,
        full_name: claims.full_name,
        permission_label: claims.permission_label,
    })
}

/// Google sign-in URL
#[utoipa::path(
    get,
    path = "/auth/google/url",
    responses(
        (status = 200, description = "Authorization URL", body = Object, example = json!({
            "url": "https://accounts.google.com/o/oauth2/v2/auth?client_id=..."
        })),
        (status = 404, description = "OAuth is not configured")
    ),
    tag = "Auth"
)]
pub async fn google_auth_url(
    config: web::Data<Config>,
    oauth: web::Data<GoogleOAuth>,
) -> AppResult<HttpResponse> {
    if !config.has_oauth() {
        return Ok(HttpResponse::NotFound().json(json!({"error": "Google OAuth is not configured"})));
    }
    Ok(HttpResponse::Ok().json(json!({ "url": oauth.authorization_url()? })))
}

/// OAuth redirect target: exchanges the code and opens a session
#[utoipa::path(
    get,
    path = "/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 401, description = "Authentication failed"),
        (status = 403, description = "No permission for this account"),
        (status = 502, description = "Roster unavailable")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_google_callback", skip_all)]
pub async fn google_callback(
    query: web::Query<CallbackQuery>,
    config: web::Data<Config>,
    oauth: web::Data<GoogleOAuth>,
    store: web::Data<RosterStore>,
) -> AppResult<HttpResponse> {
    if !config.has_oauth() {
        return Err(AppError::Authentication("Google OAuth is not configured".into()));
    }
    if let Some(error) = &query.error {
        return Err(AppError::Authentication(format!("provider returned {error}")));
    }
    let code = query
        .code
        .as_deref()
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::Authentication("missing authorization code".into()))?;

    let email = oauth.email_for_code(code).await?;
    debug!(%email, "OAuth code exchanged");

    let roster = store.get().await?;
    let staff = check_user_permission(&email, &roster.staff.records, &config.permissions)
        .ok_or_else(|| {
            warn!(%email, "Login refused: no eligible roster entry");
            AppError::Forbidden("no access permission for this account".into())
        })?;

    Ok(HttpResponse::Ok().json(issue_session(staff, &email, &config)?))
}

/// Development user picker
#[utoipa::path(
    get,
    path = "/auth/dev/users",
    responses(
        (status = 200, description = "Login-eligible users", body = Object, example = json!([{
            "login_id": "t.tanaka@example.com",
            "label": "田中太郎 (t.tanaka@example.com) - 4. 承認者"
        }])),
        (status = 404, description = "Development mode is off")
    ),
    tag = "Auth"
)]
pub async fn dev_users(
    config: web::Data<Config>,
    store: web::Data<RosterStore>,
) -> AppResult<HttpResponse> {
    if !config.development_mode {
        return Ok(HttpResponse::NotFound().finish());
    }

    let roster = store.get().await?;
    let users: Vec<_> = roster
        .staff
        .records
        .iter()
        .filter(|s| config.permissions.can_login(&s.permission_label))
        .map(|s| json!({ "login_id": s.login_id.trim(), "label": s.display_label() }))
        .collect();

    Ok(HttpResponse::Ok().json(users))
}

/// Development login without OAuth
#[utoipa::path(
    post,
    path = "/auth/dev/login",
    request_body = DevLoginReq,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 403, description = "User not eligible"),
        (status = 404, description = "Development mode is off")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_dev_login", skip(config, store, req), fields(login_id = %req.login_id))]
pub async fn dev_login(
    req: web::Json<DevLoginReq>,
    config: web::Data<Config>,
    store: web::Data<RosterStore>,
) -> AppResult<HttpResponse> {
    if !config.development_mode {
        return Ok(HttpResponse::NotFound().finish());
    }

    let roster = store.get().await?;
    let staff = check_user_permission(&req.login_id, &roster.staff.records, &config.permissions)
        .ok_or_else(|| AppError::Forbidden("user is not eligible to log in".into()))?;

    Ok(HttpResponse::Ok().json(issue_session(staff, staff.login_id.trim(), &config)?))
}

/// Ends the session carried in the Authorization header. Always 204.
pub async fn logout(
    req: HttpRequest,
    config: web::Data<Config>,
    revoked: web::Data<RevokedSessions>,
) -> impl Responder {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok());

    let claims = match bearer_token(header).map(|t| verify_token(t, &config.jwt_secret)) {
        Some(Ok(c)) => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    revoked.revoke(&claims.jti).await;
    info!(employee_id = %claims.employee_id, "Session logged out");

    HttpResponse::NoContent().finish()
}

/// Current viewer
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Session identity", body = ViewerSession),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Auth"
)]
#[get("/me")]
pub async fn me(session: ViewerSession) -> impl Responder {
    HttpResponse::Ok().json(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(login: &str, label: &str) -> StaffRecord {
        StaffRecord {
            employee_id: "E1".into(),
            login_id: login.into(),
            surname: "田中".into(),
            given_name: "太郎".into(),
            permission_label: label.into(),
            first_approver_reference: None,
        }
    }

    #[test]
    fn eligibility_needs_login_and_permission() {
        let roster = vec![
            staff("retired@example.com", "1. 退職者"),
            staff("jdoe@example.com", "4. 承認者"),
        ];
        let perms = PermissionSet::default();

        assert!(check_user_permission("jdoe@example.com", &roster, &perms).is_some());
        assert!(check_user_permission(" jdoe@example.com ", &roster, &perms).is_some());
        assert!(check_user_permission("retired@example.com", &roster, &perms).is_none());
        assert!(check_user_permission("", &roster, &perms).is_none());
        assert!(check_user_permission("other@example.com", &roster, &perms).is_none());
    }

    #[test]
    fn eligibility_follows_configured_login_set() {
        let roster = vec![staff("user@example.com", "5. 一般利用者")];
        let perms = PermissionSet::from_config("", "system_admin,approver,approver_and_user").unwrap();
        assert!(check_user_permission("user@example.com", &roster, &perms).is_none());
    }
}
