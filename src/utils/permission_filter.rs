use crate::auth::auth::ViewerSession;
use crate::model::attendance::JoinedRecord;
use crate::model::permission::PermissionLevel;
use crate::utils::approver::same_identity;

/// Returns the rows the viewer may see. Never fails: an unmatched viewer,
/// an empty roster or an unknown permission all yield zero rows.
pub fn apply_user_filter(rows: &[JoinedRecord], viewer: &ViewerSession) -> Vec<JoinedRecord> {
    match viewer.permission {
        Some(PermissionLevel::SystemAdmin) => rows.to_vec(),
        Some(PermissionLevel::Approver | PermissionLevel::ApproverAndUser) => rows
            .iter()
            .filter(|row| approved_by(row, viewer))
            .cloned()
            .collect(),
        Some(PermissionLevel::GeneralUser) => rows
            .iter()
            .filter(|row| owned_by(row, viewer))
            .cloned()
            .collect(),
        None => Vec::new(),
    }
}

/// The reference may hold the approver's login id or display name. The row
/// owner's full name lets an approver keep their own row in view, and the
/// resolved name covers references that only matched after lookup.
fn approved_by(row: &JoinedRecord, viewer: &ViewerSession) -> bool {
    let approver = row.approver.as_deref().unwrap_or_default();
    let approver_full_name = row.approver_full_name.as_deref().unwrap_or_default();
    let resolved = row.resolved_approver_name.as_deref().unwrap_or_default();

    same_identity(approver, &viewer.login_id)
        || same_identity(approver, &viewer.full_name)
        || same_identity(approver_full_name, &viewer.full_name)
        || same_identity(resolved, &viewer.full_name)
}

/// Login id only counts when the attendance sheet carries that column.
fn owned_by(row: &JoinedRecord, viewer: &ViewerSession) -> bool {
    let by_employee_id = same_identity(&row.record.employee_id, &viewer.employee_id);
    let by_login_id = row
        .record
        .login_id
        .as_deref()
        .is_some_and(|login| same_identity(login, &viewer.login_id));
    by_employee_id || by_login_id
}
