use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static YEAR_MONTH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4})-(\d{2})").expect("year-month pattern"));

/// A candidate file with its parsed `YYYY-MM` token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatedFile<T> {
    pub file: T,
    pub token: String,
}

/// First `YYYY-MM` in the name, if it names a real month.
pub fn extract_year_month(filename: &str) -> Option<String> {
    let caps = YEAR_MONTH.captures(filename)?;
    let year: i32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?;
    Some(caps[0].to_string())
}

/// Keeps the files whose names carry a valid token, in input order.
pub fn dated_files<T, F>(files: impl IntoIterator<Item = T>, name_of: F) -> Vec<DatedFile<T>>
where
    F: Fn(&T) -> &str,
{
    files
        .into_iter()
        .filter_map(|file| {
            let token = extract_year_month(name_of(&file))?;
            Some(DatedFile { file, token })
        })
        .collect()
}

/// Picks the file with the greatest token. On equal tokens the first one
/// encountered wins. `None` when nothing parses.
pub fn select_latest<T, F>(files: impl IntoIterator<Item = T>, name_of: F) -> Option<DatedFile<T>>
where
    F: Fn(&T) -> &str,
{
    dated_files(files, name_of)
        .into_iter()
        .fold(None, |best: Option<DatedFile<T>>, candidate| match best {
            Some(b) if b.token >= candidate.token => Some(b),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pick(names: &[&'static str]) -> Option<&'static str> {
        select_latest(names.iter().copied(), |n| *n).map(|d| d.file)
    }

    #[test]
    fn picks_greatest_month() {
        assert_eq!(
            pick(&["kintai_2025-03.csv", "kintai_2025-05.csv", "kintai_2024-12.csv"]),
            Some("kintai_2025-05.csv")
        );
    }

    #[test]
    fn unparseable_names_are_discarded() {
        assert_eq!(pick(&["kintai.csv", "kintai_2025-5.csv", "notes.txt"]), None);
        assert_eq!(pick(&[]), None);
        assert_eq!(
            pick(&["kintai_latest.csv", "kintai_2023-01.csv"]),
            Some("kintai_2023-01.csv")
        );
    }

    #[test]
    fn invalid_months_do_not_count() {
        assert_eq!(extract_year_month("kintai_2025-13.csv"), None);
        assert_eq!(extract_year_month("kintai_2025-00.csv"), None);
        assert_eq!(
            pick(&["kintai_2025-13.csv", "kintai_2025-02.csv"]),
            Some("kintai_2025-02.csv")
        );
    }

    #[test]
    fn ties_keep_first_encountered() {
        let files = vec![("a", "kintai_2025-05.csv"), ("b", "kintai_2025-05 (1).csv")];
        let latest = select_latest(files, |f| f.1).unwrap();
        assert_eq!(latest.file.0, "a");
        assert_eq!(latest.token, "2025-05");
    }
}
