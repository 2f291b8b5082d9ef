use std::collections::HashMap;

use tracing::warn;

use crate::model::attendance::{AttendanceTable, JoinedRecord};
use crate::model::staff::{COL_FIRST_APPROVER, StaffRecord, StaffTable};

/// Trimmed, non-empty equality. Blank values never match anything.
pub fn same_identity(a: &str, b: &str) -> bool {
    let a = a.trim();
    !a.is_empty() && a == b.trim()
}

/// Finds the staff member a first-approver reference points at. The roster
/// stores either a login id or a full name in that column, so both are tried.
pub fn resolve_approver<'a>(reference: &str, staff: &'a [StaffRecord]) -> Option<&'a StaffRecord> {
    staff.iter().find(|s| {
        same_identity(reference, &s.login_id) || same_identity(reference, &s.full_name())
    })
}

/// Left join of attendance rows onto the roster by employee id.
///
/// `approver` is the row owner's raw first-approver reference,
/// `approver_full_name` the row owner's own roster full name, and
/// `resolved_approver_name` the full name of whoever the reference points at.
/// Rows without a roster entry keep all three empty, as does every row when
/// the roster has no first-approver column. When several roster rows share an
/// employee id, the first one is used.
pub fn join_approvers(attendance: &AttendanceTable, staff: &StaffTable) -> Vec<JoinedRecord> {
    if !staff.has_approver_column {
        warn!("staff sheet has no {} column, approver fields left empty", COL_FIRST_APPROVER);
    }

    let mut by_employee: HashMap<&str, &StaffRecord> = HashMap::new();
    for s in &staff.records {
        by_employee.entry(s.employee_id.trim()).or_insert(s);
    }

    attendance
        .records
        .iter()
        .map(|record| {
            let owner = by_employee
                .get(record.employee_id.trim())
                .filter(|_| staff.has_approver_column);
            let approver = owner.and_then(|o| o.first_approver_reference.clone());
            let approver_full_name = owner
                .map(|o| o.full_name())
                .filter(|name| !name.is_empty());
            let resolved_approver_name = approver
                .as_deref()
                .and_then(|r| resolve_approver(r, &staff.records))
                .map(StaffRecord::full_name);

            JoinedRecord {
                record: record.clone(),
                approver,
                approver_full_name,
                resolved_approver_name,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::attendance::AttendanceRecord;

    fn staff(id: &str, login: &str, surname: &str, given: &str, approver: Option<&str>) -> StaffRecord {
        StaffRecord {
            employee_id: id.into(),
            login_id: login.into(),
            surname: surname.into(),
            given_name: given.into(),
            permission_label: "5. 一般利用者".into(),
            first_approver_reference: approver.map(Into::into),
        }
    }

    fn attendance(ids: &[&str]) -> AttendanceTable {
        AttendanceTable {
            headers: vec!["社員番号".into()],
            records: ids
                .iter()
                .map(|id| AttendanceRecord {
                    employee_id: id.to_string(),
                    name: String::new(),
                    login_id: None,
                    fields: HashMap::new(),
                })
                .collect(),
        }
    }

    fn roster() -> StaffTable {
        StaffTable {
            records: vec![
                staff("E001", "jdoe", "田中", "太郎", None),
                staff("E100", "hsato", "佐藤", "花子", Some("jdoe")),
                staff("E200", "kito", "伊藤", "健", Some("田中太郎")),
                staff("E300", "myama", "山田", "誠", Some("退職者")),
            ],
            has_approver_column: true,
        }
    }

    #[test]
    fn reference_resolves_by_login_id_or_full_name() {
        let staff = roster();
        assert_eq!(resolve_approver("jdoe", &staff.records).unwrap().employee_id, "E001");
        assert_eq!(resolve_approver(" 田中太郎 ", &staff.records).unwrap().employee_id, "E001");
        assert!(resolve_approver("", &staff.records).is_none());
        assert!(resolve_approver("nobody", &staff.records).is_none());
    }

    #[test]
    fn join_fills_approver_fields() {
        let joined = join_approvers(&attendance(&["E100", "E200", "E300", "E999"]), &roster());

        assert_eq!(joined[0].approver.as_deref(), Some("jdoe"));
        assert_eq!(joined[0].approver_full_name.as_deref(), Some("佐藤花子"));
        assert_eq!(joined[0].resolved_approver_name.as_deref(), Some("田中太郎"));

        assert_eq!(joined[1].approver.as_deref(), Some("田中太郎"));
        assert_eq!(joined[1].approver_full_name.as_deref(), Some("伊藤健"));
        assert_eq!(joined[1].resolved_approver_name.as_deref(), Some("田中太郎"));

        // reference that names nobody on the roster
        assert_eq!(joined[2].approver.as_deref(), Some("退職者"));
        assert_eq!(joined[2].approver_full_name.as_deref(), Some("山田誠"));
        assert_eq!(joined[2].resolved_approver_name, None);

        // no roster entry
        assert_eq!(joined[3].approver, None);
        assert_eq!(joined[3].approver_full_name, None);
        assert_eq!(joined[3].resolved_approver_name, None);
    }

    #[test]
    fn missing_approver_column_leaves_fields_empty() {
        let mut staff = roster();
        staff.has_approver_column = false;
        for s in &mut staff.records {
            s.first_approver_reference = None;
        }
        let joined = join_approvers(&attendance(&["E100"]), &staff);
        assert_eq!(joined[0].approver, None);
        assert_eq!(joined[0].approver_full_name, None);
        assert_eq!(joined[0].resolved_approver_name, None);
    }
}
