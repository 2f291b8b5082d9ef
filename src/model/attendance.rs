use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::staff::COL_EMPLOYEE_ID;

pub const COL_NAME: &str = "名前";

/// Columns shown to viewers, in display order. Absent ones are skipped.
pub const DISPLAY_COLUMNS: [&str; 13] = [
    COL_EMPLOYEE_ID,
    COL_NAME,
    "休日出勤",
    "有休日数",
    "欠勤日数",
    "出勤時間",
    "総残業時間",
    "規定残業時間",
    "規定残業超過分",
    "深夜残業時間",
    "60時間超過残業",
    "打刻ズレ",
    "勤怠マイナス分",
];

/// One employee for one pay period. Numeric and time fields stay as text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub employee_id: String,
    pub name: String,
    /// `None` when the sheet has no `ログインID` column at all.
    pub login_id: Option<String>,
    pub fields: HashMap<String, String>,
}

impl AttendanceRecord {
    pub fn field(&self, column: &str) -> Option<&str> {
        self.fields.get(column).map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AttendanceTable {
    pub headers: Vec<String>,
    pub records: Vec<AttendanceRecord>,
}

impl AttendanceTable {
    pub fn display_columns(&self) -> Vec<&'static str> {
        DISPLAY_COLUMNS
            .iter()
            .copied()
            .filter(|c| self.headers.iter().any(|h| h == c))
            .collect()
    }
}

/// An attendance row with its approver fields resolved from the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinedRecord {
    pub record: AttendanceRecord,
    /// Raw first-approver reference (login id or display name).
    pub approver: Option<String>,
    /// Roster full name of the row owner.
    pub approver_full_name: Option<String>,
    /// Full name of the staff member the reference resolved to.
    pub resolved_approver_name: Option<String>,
}

impl JoinedRecord {
    pub fn project(&self, columns: &[&str]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.record.field(c).unwrap_or_default().to_string())
            .collect()
    }
}
