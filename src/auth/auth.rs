use crate::model::permission::PermissionLevel;
use crate::models::Claims;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};
use serde::Serialize;
use utoipa::ToSchema;

/// The authenticated viewer. Created at login, carried in the session token,
/// placed in request extensions by `auth_middleware`, gone after logout.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ViewerSession {
    pub email: String,
    pub full_name: String,
    pub login_id: String,
    pub employee_id: String,
    pub permission: Option<PermissionLevel>,
    pub permission_label: String,
    #[serde(skip)]
    pub jti: String,
}

impl From<Claims> for ViewerSession {
    fn from(c: Claims) -> Self {
        Self {
            email: c.sub,
            full_name: c.full_name,
            login_id: c.login_id,
            employee_id: c.employee_id,
            permission: c.permission,
            permission_label: c.permission_label,
            jti: c.jti,
        }
    }
}

impl FromRequest for ViewerSession {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        match req.extensions().get::<ViewerSession>() {
            Some(session) => ready(Ok(session.clone())),
            None => ready(Err(ErrorUnauthorized("Not logged in"))),
        }
    }
}

impl ViewerSession {
    pub fn require_admin(&self) -> actix_web::Result<()> {
        if self.permission == Some(PermissionLevel::SystemAdmin) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("System admin only"))
        }
    }

    /// Heading for the attendance list.
    pub fn scope_label(&self) -> &'static str {
        match self.permission {
            Some(PermissionLevel::SystemAdmin) => "全スタッフ",
            Some(p) if p.is_approver() => "承認対象スタッフ",
            Some(PermissionLevel::GeneralUser) => "自分の勤怠データ",
            _ => "表示データ",
        }
    }

    /// Message shown when the filtered list is empty.
    pub fn empty_message(&self) -> &'static str {
        match self.permission {
            Some(p) if p.is_approver() => {
                "承認対象のスタッフがいません。第一承認者として割り当てられているスタッフのデータのみ表示されます。"
            }
            Some(PermissionLevel::GeneralUser) => "あなたの勤怠データが見つかりません。",
            _ => "表示可能なデータがありません。",
        }
    }
}
