use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const COL_EMPLOYEE_ID: &str = "社員番号";
pub const COL_LOGIN_ID: &str = "ログインID";
pub const COL_SURNAME: &str = "姓";
pub const COL_GIVEN_NAME: &str = "名";
pub const COL_PERMISSION: &str = "権限";
pub const COL_FIRST_APPROVER: &str = "第一承認者";

/// One row of the staff roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StaffRecord {
    #[schema(example = "E100")]
    pub employee_id: String,
    #[schema(example = "t.tanaka@example.com")]
    pub login_id: String,
    #[schema(example = "田中")]
    pub surname: String,
    #[schema(example = "太郎")]
    pub given_name: String,
    #[schema(example = "4. 承認者")]
    pub permission_label: String,
    /// Either a login id or a display name, depending on who typed it.
    pub first_approver_reference: Option<String>,
}

/// `surname + given_name`, each trimmed, no separator.
pub fn full_name(surname: &str, given_name: &str) -> String {
    format!("{}{}", surname.trim(), given_name.trim())
}

impl StaffRecord {
    pub fn full_name(&self) -> String {
        full_name(&self.surname, &self.given_name)
    }

    /// Label used by the development user picker.
    pub fn display_label(&self) -> String {
        let name = match self.full_name() {
            n if n.is_empty() => "名前なし".to_string(),
            n => n,
        };
        format!(
            "{} ({}) - {}",
            name,
            self.login_id.trim(),
            self.permission_label.trim()
        )
    }
}

/// The roster as loaded; `has_approver_column` is false when the sheet
/// lacks `第一承認者` entirely.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaffTable {
    pub records: Vec<StaffRecord>,
    pub has_approver_column: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn staff(surname: &str, given_name: &str) -> StaffRecord {
        StaffRecord {
            employee_id: "E1".into(),
            login_id: "jdoe".into(),
            surname: surname.into(),
            given_name: given_name.into(),
            permission_label: "4. 承認者".into(),
            first_approver_reference: None,
        }
    }

    #[test]
    fn full_name_trims_components() {
        assert_eq!(full_name(" 田中 ", "太郎"), "田中太郎");
        assert_eq!(staff("田中", " 太郎\t").full_name(), "田中太郎");
    }

    #[test]
    fn display_label_falls_back_for_blank_names() {
        assert_eq!(staff("田中", "太郎").display_label(), "田中太郎 (jdoe) - 4. 承認者");
        assert_eq!(staff(" ", "").display_label(), "名前なし (jdoe) - 4. 承認者");
    }
}
