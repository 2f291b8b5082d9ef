use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::model::permission::PermissionLevel;

/// Session token claims. The viewer identity is fixed at login and travels
/// with every request; nothing about the session lives in server memory
/// except the revocation list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Authenticated email (or login id in development mode).
    pub sub: String,
    pub full_name: String,
    pub login_id: String,
    pub employee_id: String,
    pub permission: Option<PermissionLevel>,
    pub permission_label: String,
    pub exp: usize,
    pub jti: String,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct DevLoginReq {
    #[schema(example = "t.tanaka@example.com")]
    pub login_id: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    pub session_token: String,
    pub full_name: String,
    pub permission_label: String,
}
