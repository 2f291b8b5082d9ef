use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{AppError, AppResult};
use crate::model::permission::PermissionSet;
use crate::model::staff::StaffRecord;
use crate::models::Claims;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

fn now() -> AppResult<usize> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as usize)
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// Builds the viewer's claims from their roster entry.
pub fn session_claims(
    staff: &StaffRecord,
    email: &str,
    permissions: &PermissionSet,
    ttl: usize,
) -> AppResult<Claims> {
    Ok(Claims {
        sub: email.to_string(),
        full_name: staff.full_name(),
        login_id: staff.login_id.trim().to_string(),
        employee_id: staff.employee_id.trim().to_string(),
        permission: permissions.level_of(&staff.permission_label),
        permission_label: staff.permission_label.trim().to_string(),
        exp: now()? + ttl,
        jti: Uuid::new_v4().to_string(),
    })
}

pub fn generate_session_token(claims: &Claims, secret: &str) -> AppResult<String> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("cannot sign session token: {e}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::permission::PermissionLevel;

    fn staff() -> StaffRecord {
        StaffRecord {
            employee_id: " E100 ".into(),
            login_id: "jdoe@example.com".into(),
            surname: " 田中 ".into(),
            given_name: "太郎".into(),
            permission_label: "4. 承認者".into(),
            first_approver_reference: None,
        }
    }

    #[test]
    fn token_round_trips_viewer_identity() {
        let claims =
            session_claims(&staff(), "jdoe@example.com", &PermissionSet::default(), 60).unwrap();
        let token = generate_session_token(&claims, "secret").unwrap();
        let decoded = verify_token(&token, "secret").unwrap();

        assert_eq!(decoded.full_name, "田中太郎");
        assert_eq!(decoded.employee_id, "E100");
        assert_eq!(decoded.permission, Some(PermissionLevel::Approver));
        assert_eq!(decoded.jti, claims.jti);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims =
            session_claims(&staff(), "jdoe@example.com", &PermissionSet::default(), 60).unwrap();
        let token = generate_session_token(&claims, "secret").unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut claims =
            session_claims(&staff(), "jdoe@example.com", &PermissionSet::default(), 0).unwrap();
        claims.exp -= 3600;
        let token = generate_session_token(&claims, "secret").unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
