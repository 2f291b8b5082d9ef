use crate::api::attendance::AttendanceListResponse;
use crate::auth::auth::ViewerSession;
use crate::model::permission::PermissionLevel;
use crate::model::staff::StaffRecord;
use crate::models::{DevLoginReq, SessionResponse};
use utoipa::Modify;
use utoipa::OpenApi;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kintai Review API",
        version = "0.1.0",
        description = r#"
## Attendance review

Monthly attendance exported from the HR portal is pasted into a shared
spreadsheet; this API lets employees sign in and see the rows their roster
permission allows.

### Visibility
- **system_admin**: every row
- **approver / approver_and_user**: rows whose first approver is the viewer
  (by login id or by full name), plus their own row
- **general_user**: the viewer's own row
- anything else: nothing

### Security
Sign in through Google OAuth (or the development picker) to obtain a session
token, then send it as a **Bearer** token.
"#,
    ),
    paths(
        crate::auth::handlers::google_auth_url,
        crate::auth::handlers::google_callback,
        crate::auth::handlers::dev_users,
        crate::auth::handlers::dev_login,
        crate::auth::handlers::me,

        crate::api::attendance::list_attendance,
        crate::api::attendance::refresh_attendance
    ),
    components(
        schemas(
            AttendanceListResponse,
            ViewerSession,
            PermissionLevel,
            StaffRecord,
            DevLoginReq,
            SessionResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Sign-in and session APIs"),
        (name = "Attendance", description = "Attendance review APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}
