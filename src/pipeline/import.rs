use encoding_rs::SHIFT_JIS;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::google::drive::{DriveClient, DriveFile, contains_query};
use crate::google::sheets::SheetsClient;
use crate::utils::file_selector::{DatedFile, select_latest};
use crate::utils::time_format::normalize_row;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, PartialEq)]
pub struct ImportReport {
    pub file_name: String,
    pub token: String,
    pub other_candidates: Vec<String>,
    pub rows: usize,
}

/// Portal exports are CP932. UTF-8 is accepted when it carries a BOM or
/// when the bytes are not valid CP932.
pub fn decode_export(bytes: &[u8]) -> AppResult<String> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        return String::from_utf8(rest.to_vec())
            .map_err(|e| AppError::UpstreamUnavailable(format!("export is not UTF-8: {e}")));
    }

    let (text, _, had_errors) = SHIFT_JIS.decode(bytes);
    if !had_errors {
        return Ok(text.into_owned());
    }

    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|_| AppError::UpstreamUnavailable("export is neither CP932 nor UTF-8".into()))
}

/// Header plus data rows, normalised for the paste sheet. Short rows are
/// padded to the header width.
pub fn prepare_rows(text: &str) -> AppResult<Vec<Vec<String>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<String> = record.iter().map(str::to_string).collect();
        if row.iter().all(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(row);
    }

    let width = rows.first().map(Vec::len).unwrap_or_default();
    Ok(rows
        .into_iter()
        .map(|mut row| {
            if row.len() < width {
                row.resize(width, String::new());
            }
            normalize_row(&row)
        })
        .collect())
}

/// Latest dated export among `files`, plus the names of the other candidates.
pub fn choose_export(
    files: Vec<DriveFile>,
    prefix: &str,
) -> AppResult<(DatedFile<DriveFile>, Vec<String>)> {
    if files.is_empty() {
        return Err(AppError::FileNotFound(format!("{prefix}*")));
    }

    let candidates: Vec<String> = files.iter().map(|f| f.name.clone()).collect();
    let latest = select_latest(files, |f| f.name.as_str()).ok_or_else(|| {
        AppError::FileNotFound(format!("no {prefix}* file carries a YYYY-MM token"))
    })?;

    let others = candidates
        .into_iter()
        .filter(|n| *n != latest.file.name)
        .collect();
    Ok((latest, others))
}

/// Pastes the most recent monthly export from Drive into the paste sheet.
pub async fn run_import(
    config: &Config,
    drive: &DriveClient,
    sheets: &SheetsClient,
) -> AppResult<ImportReport> {
    let files = drive
        .list(&contains_query(&config.drive_folder_id, &config.export_prefix))
        .await?;
    let (latest, other_candidates) = choose_export(files, &config.export_prefix)?;

    info!(
        file = %latest.file.name,
        token = %latest.token,
        modified = latest.file.modified_time.as_deref().unwrap_or("-"),
        "Latest export selected"
    );
    if !other_candidates.is_empty() {
        info!(others = ?other_candidates, "Other candidate files");
    }

    let bytes = drive.download(&latest.file.id).await?;
    let text = decode_export(&bytes)?;
    let rows = prepare_rows(&text)?;
    if rows.is_empty() {
        warn!(file = %latest.file.name, "Export is empty");
    }

    sheets.clear(&config.paste_sheet).await?;
    sheets.write_rows(&config.paste_sheet, &rows).await?;

    info!(file = %latest.file.name, sheet = %config.paste_sheet, "Import finished");

    Ok(ImportReport {
        file_name: latest.file.name,
        token: latest.token,
        other_candidates,
        rows: rows.len().saturating_sub(1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cp932_export_is_decoded() {
        let (bytes, _, _) = SHIFT_JIS.encode("社員番号,名前\nE100,田中太郎\n");
        assert_eq!(decode_export(&bytes).unwrap(), "社員番号,名前\nE100,田中太郎\n");
    }

    #[test]
    fn utf8_with_bom_is_accepted() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice("名前\n田中\n".as_bytes());
        assert_eq!(decode_export(&bytes).unwrap(), "名前\n田中\n");
    }

    #[test]
    fn rows_are_normalised_and_padded() {
        let text = "社員番号,名前,所定時間外勤務時間,'備考\nE100,田中太郎,'12:30,\nE200,佐藤花子\n\n";
        let rows = prepare_rows(text).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0][3], "備考");
        assert_eq!(rows[1], vec!["E100", "田中太郎", "12:30:00", ""]);
        assert_eq!(rows[2], vec!["E200", "佐藤花子", "", ""]);
    }

    fn drive_file(id: &str, name: &str) -> DriveFile {
        DriveFile {
            id: id.into(),
            name: name.into(),
            modified_time: None,
        }
    }

    #[test]
    fn latest_export_is_chosen_and_others_listed() {
        let files = vec![
            drive_file("1", "kintai_2025-04.csv"),
            drive_file("2", "kintai_2025-05.csv"),
            drive_file("3", "kintai_notes.txt"),
        ];
        let (latest, others) = choose_export(files, "kintai_").unwrap();

        assert_eq!(latest.file.id, "2");
        assert_eq!(latest.token, "2025-05");
        assert_eq!(others, vec!["kintai_2025-04.csv", "kintai_notes.txt"]);
    }

    #[test]
    fn missing_or_undated_exports_are_not_found() {
        assert!(matches!(
            choose_export(Vec::new(), "kintai_"),
            Err(AppError::FileNotFound(_))
        ));
        assert!(matches!(
            choose_export(vec![drive_file("1", "kintai_draft.csv")], "kintai_"),
            Err(AppError::FileNotFound(_))
        ));
    }

    #[test]
    fn empty_export_gives_no_rows() {
        assert!(prepare_rows("").unwrap().is_empty());
    }
}
