use std::collections::HashMap;

use crate::error::{AppError, AppResult};
use crate::model::attendance::{AttendanceRecord, AttendanceTable, COL_NAME};
use crate::model::staff::{
    COL_EMPLOYEE_ID, COL_FIRST_APPROVER, COL_GIVEN_NAME, COL_LOGIN_ID, COL_PERMISSION,
    COL_SURNAME, StaffRecord, StaffTable,
};

/// Repeated headers get a `_n` suffix: `A, A, A` -> `A, A_1, A_2`.
pub fn dedupe_headers(raw: &[String]) -> Vec<String> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    raw.iter()
        .map(|col| match seen.get_mut(col.as_str()) {
            Some(count) => {
                *count += 1;
                format!("{col}_{count}")
            }
            None => {
                seen.insert(col.as_str(), 0);
                col.clone()
            }
        })
        .collect()
}

fn column(headers: &[String], name: &str) -> Option<usize> {
    headers.iter().position(|h| h == name)
}

fn cell(row: &[String], idx: Option<usize>) -> String {
    idx.and_then(|i| row.get(i))
        .map(|v| v.trim().to_string())
        .unwrap_or_default()
}

/// Builds the attendance table from a sheet's raw values (header row first).
/// Rows with a blank employee id are dropped.
pub fn parse_attendance(values: &[Vec<String>]) -> AppResult<AttendanceTable> {
    let Some((header_row, rows)) = values.split_first() else {
        return Err(AppError::UpstreamUnavailable(
            "attendance sheet is empty".into(),
        ));
    };

    let headers = dedupe_headers(header_row);
    let id_col = column(&headers, COL_EMPLOYEE_ID).ok_or_else(|| {
        AppError::UpstreamUnavailable(format!("attendance sheet has no {COL_EMPLOYEE_ID} column"))
    })?;
    let name_col = column(&headers, COL_NAME);
    let login_col = column(&headers, COL_LOGIN_ID);

    let records = rows
        .iter()
        .filter(|row| !cell(row, Some(id_col)).is_empty())
        .map(|row| {
            let fields = headers
                .iter()
                .enumerate()
                .map(|(i, h)| (h.clone(), row.get(i).cloned().unwrap_or_default()))
                .collect();
            AttendanceRecord {
                employee_id: cell(row, Some(id_col)),
                name: cell(row, name_col),
                login_id: login_col.map(|i| cell(row, Some(i))),
                fields,
            }
        })
        .collect();

    Ok(AttendanceTable { headers, records })
}

/// Builds the staff roster from a sheet's raw values (header row first).
pub fn parse_staff(values: &[Vec<String>]) -> AppResult<StaffTable> {
    let Some((headers, rows)) = values.split_first() else {
        return Err(AppError::UpstreamUnavailable("staff sheet is empty".into()));
    };

    let id_col = column(headers, COL_EMPLOYEE_ID).ok_or_else(|| {
        AppError::UpstreamUnavailable(format!("staff sheet has no {COL_EMPLOYEE_ID} column"))
    })?;
    let login_col = column(headers, COL_LOGIN_ID);
    let surname_col = column(headers, COL_SURNAME);
    let given_col = column(headers, COL_GIVEN_NAME);
    let permission_col = column(headers, COL_PERMISSION);
    let approver_col = column(headers, COL_FIRST_APPROVER);

    let records = rows
        .iter()
        .filter(|row| row.iter().any(|v| !v.trim().is_empty()))
        .map(|row| StaffRecord {
            employee_id: cell(row, Some(id_col)),
            login_id: cell(row, login_col),
            surname: cell(row, surname_col),
            given_name: cell(row, given_col),
            permission_label: cell(row, permission_col),
            first_approver_reference: approver_col
                .map(|i| cell(row, Some(i)))
                .filter(|v| !v.is_empty()),
        })
        .collect();

    Ok(StaffTable {
        records,
        has_approver_column: approver_col.is_some(),
    })
}
