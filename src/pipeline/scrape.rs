use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{Datelike, Local, NaiveDate};
use serde_json::json;
use thirtyfour::components::SelectElement;
use thirtyfour::prelude::*;
use tracing::{debug, info, warn};

use crate::config::{Config, PortalConfig};
use crate::error::{AppError, AppResult};
use crate::google::drive::{DriveClient, UploadOutcome};
use crate::pipeline::poll::{Backoff, poll_until};
use crate::utils::file_selector::extract_year_month;

const EXPORT_ACCEPTED: &str = "月次集計データ出力 を受け付けました。";
const DOWNLOAD_LINK_XPATH: &str =
    "//a[contains(text(),'出力') and contains(@href, '/files/') and contains(@class, 'btnSubmit')]";

#[derive(Debug, Clone, PartialEq)]
pub struct ScrapeReport {
    pub month: String,
    pub drive_name: String,
    pub local_path: PathBuf,
    pub outcome: UploadOutcome,
}

/// `YYYY-MM` of the month before `today`.
pub fn previous_month(today: NaiveDate) -> String {
    let (year, month) = match today.month() {
        1 => (today.year() - 1, 12),
        m => (today.year(), m - 1),
    };
    format!("{year}-{month:02}")
}

/// Accepts exactly `YYYY-MM` naming a real month.
pub fn parse_month(value: &str) -> AppResult<String> {
    let value = value.trim();
    match extract_year_month(value) {
        Some(token) if token == value => Ok(token),
        _ => Err(AppError::Config(format!("month must be YYYY-MM, got '{value}'"))),
    }
}

pub fn export_file_name(prefix: &str, month: &str) -> String {
    format!("{prefix}{month}.csv")
}

fn csv_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut found = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            found.push(path);
        }
    }
    Ok(found)
}

/// Waits for a CSV in `dir` that was not there before (`known`). When
/// several appear, the most recently modified one wins.
pub async fn wait_for_new_csv(
    dir: &Path,
    known: &HashSet<PathBuf>,
    timeout: Duration,
) -> AppResult<PathBuf> {
    poll_until("downloaded CSV file", timeout, Backoff::default(), || async move {
        let mut fresh: Vec<(std::time::SystemTime, PathBuf)> = csv_files(dir)?
            .into_iter()
            .filter(|p| !known.contains(p))
            .filter_map(|p| {
                let modified = p.metadata().and_then(|m| m.modified()).ok()?;
                Some((modified, p))
            })
            .collect();
        fresh.sort();
        Ok(fresh.pop().map(|(_, p)| p))
    })
    .await
}

async fn wait_for_element(
    driver: &WebDriver,
    by: By,
    what: &str,
    timeout: Duration,
) -> AppResult<WebElement> {
    poll_until(what, timeout, Backoff::default(), || {
        let by = by.clone();
        async move { Ok(driver.find(by).await.ok()) }
    })
    .await
}

async fn wait_for_text(
    driver: &WebDriver,
    by: By,
    expected: &str,
    timeout: Duration,
) -> AppResult<()> {
    poll_until(expected, timeout, Backoff::default(), || {
        let by = by.clone();
        async move {
            let Ok(elements) = driver.find_all(by).await else {
                return Ok(None);
            };
            for element in elements {
                if element.text().await.is_ok_and(|t| t.contains(expected)) {
                    return Ok(Some(()));
                }
            }
            Ok(None)
        }
    })
    .await
}

async fn new_session(portal: &PortalConfig, download_dir: &Path) -> AppResult<WebDriver> {
    let mut caps = DesiredCapabilities::chrome();
    caps.add_arg("--headless=new")?;
    caps.add_arg("--no-sandbox")?;
    caps.add_arg("--disable-dev-shm-usage")?;
    caps.add_experimental_option(
        "prefs",
        json!({
            "download.default_directory": download_dir.to_string_lossy(),
            "download.prompt_for_download": false,
            "directory_upgrade": true,
            "safebrowsing.enabled": true,
        }),
    )?;

    Ok(WebDriver::new(portal.webdriver_url.as_str(), caps).await?)
}

/// Hrefs of every export download link on the current page.
async fn download_links(driver: &WebDriver) -> AppResult<Vec<String>> {
    let mut hrefs = Vec::new();
    for link in driver.find_all(By::XPath(DOWNLOAD_LINK_XPATH)).await? {
        if let Some(href) = link.prop("href").await? {
            hrefs.push(href);
        }
    }
    Ok(hrefs)
}

/// First link that was not on the history page before the export request.
pub fn pick_new_link(links: Vec<String>, known: &HashSet<String>) -> Option<String> {
    links.into_iter().find(|href| !known.contains(href))
}

/// Logs in, requests the monthly export and starts its download.
async fn request_export(
    driver: &WebDriver,
    portal: &PortalConfig,
    month: &str,
    timeout: Duration,
) -> AppResult<()> {
    driver.goto(portal.url.as_str()).await?;

    wait_for_element(driver, By::Id("user_login_id"), "login form", timeout)
        .await?
        .send_keys(portal.user.as_str())
        .await?;
    driver
        .find(By::Id("user_password"))
        .await?
        .send_keys(portal.password.as_str())
        .await?;
    driver
        .find(By::XPath("//input[@type='submit' and @value='ログイン']"))
        .await?
        .click()
        .await?;
    info!("Logged in to portal");

    wait_for_element(driver, By::LinkText("レポート"), "report menu", timeout)
        .await?
        .click()
        .await?;
    wait_for_element(driver, By::LinkText("月次集計データ出力"), "monthly export link", timeout)
        .await?
        .click()
        .await?;
    let export_page = driver.current_url().await?;

    // Links already listed belong to earlier exports.
    let history_link =
        wait_for_element(driver, By::LinkText("CSV・PDF履歴"), "export history link", timeout)
            .await?;
    let history_url = history_link
        .prop("href")
        .await?
        .ok_or_else(|| AppError::Internal("export history link has no href".into()))?;
    driver.goto(history_url.as_str()).await?;
    let known: HashSet<String> = download_links(driver).await?.into_iter().collect();
    debug!(known = known.len(), "Existing export links");
    driver.goto(export_page.as_str()).await?;

    for id in ["select", "select_last"] {
        let element = wait_for_element(driver, By::Id(id), "month selector", timeout).await?;
        SelectElement::new(&element)
            .await?
            .select_by_value(month)
            .await?;
    }

    let form = wait_for_element(driver, By::Id("output_file_month"), "export form", timeout).await?;
    let button = form
        .find(By::Css("input[type='submit'][value='CSV出力']"))
        .await?;
    button.scroll_into_view().await?;
    button.click().await?;
    info!(month, "Export requested");

    wait_for_text(driver, By::Css("span.notice"), EXPORT_ACCEPTED, timeout).await?;
    info!("Export accepted");

    driver.goto(history_url.as_str()).await?;
    let known = &known;
    let href = poll_until("new export download link", timeout, Backoff::default(), || async move {
        driver.refresh().await?;
        Ok(pick_new_link(download_links(driver).await?, known))
    })
    .await?;
    driver.goto(href.as_str()).await?;
    info!("Download started");

    Ok(())
}

/// Exports `month` from the portal and uploads it to the Drive folder.
/// The browser session is closed whatever the outcome.
pub async fn run_scrape(
    config: &Config,
    drive: &DriveClient,
    month: Option<&str>,
) -> AppResult<ScrapeReport> {
    let portal = &config.portal;
    if portal.url.is_empty() || portal.user.is_empty() || portal.password.is_empty() {
        return Err(AppError::Config(
            "PORTAL_URL, PORTAL_USER and PORTAL_PASSWORD must be set".into(),
        ));
    }

    let month = match month {
        Some(m) => parse_month(m)?,
        None => previous_month(Local::now().date_naive()),
    };
    let timeout = Duration::from_secs(portal.timeout_secs);

    std::fs::create_dir_all(&portal.download_dir)?;
    let download_dir = std::fs::canonicalize(&portal.download_dir)?;
    let known: HashSet<PathBuf> = csv_files(&download_dir)?.into_iter().collect();

    let driver = new_session(portal, &download_dir).await?;
    let exported = request_export(&driver, portal, &month, timeout).await;
    let downloaded = match exported {
        Ok(()) => wait_for_new_csv(&download_dir, &known, timeout).await,
        Err(e) => Err(e),
    };
    if let Err(e) = driver.quit().await {
        warn!(error = %e, "Failed to close browser session");
    }
    let local_path = downloaded?;
    info!(path = %local_path.display(), "Export downloaded");

    let drive_name = export_file_name(&config.export_prefix, &month);
    let content = std::fs::read(&local_path)?;
    let outcome = drive
        .upload(&config.drive_folder_id, &drive_name, content, "text/csv")
        .await?;
    info!(name = %drive_name, ?outcome, "Uploaded to Drive");

    Ok(ScrapeReport {
        month,
        drive_name,
        local_path,
        outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn previous_month_wraps_year() {
        let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap();
        assert_eq!(previous_month(d(2025, 6, 15)), "2025-05");
        assert_eq!(previous_month(d(2025, 1, 1)), "2024-12");
    }

    #[test]
    fn month_argument_is_validated() {
        assert_eq!(parse_month(" 2025-05 ").unwrap(), "2025-05");
        assert!(parse_month("2025-5").is_err());
        assert!(parse_month("2025-13").is_err());
        assert!(parse_month("kintai_2025-05").is_err());
    }

    #[test]
    fn only_links_added_after_the_request_are_taken() {
        let known: HashSet<String> = ["/files/41".to_string()].into_iter().collect();

        assert_eq!(pick_new_link(vec!["/files/41".into()], &known), None);
        assert_eq!(
            pick_new_link(vec!["/files/41".into(), "/files/42".into()], &known),
            Some("/files/42".into())
        );
        assert_eq!(pick_new_link(Vec::new(), &known), None);
    }

    #[test]
    fn drive_name_embeds_month() {
        assert_eq!(export_file_name("kintai_", "2025-05"), "kintai_2025-05.csv");
    }

    #[tokio::test]
    async fn new_csv_is_detected_and_old_ones_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let old = dir.path().join("old.csv");
        std::fs::write(&old, "a").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let known: HashSet<PathBuf> = csv_files(dir.path()).unwrap().into_iter().collect();

        let fresh = dir.path().join("export.CSV");
        std::fs::write(&fresh, "b").unwrap();

        let found = wait_for_new_csv(dir.path(), &known, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(found, fresh);
    }

    #[tokio::test]
    async fn missing_download_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let result = wait_for_new_csv(dir.path(), &HashSet::new(), Duration::from_millis(50)).await;
        assert!(matches!(result, Err(AppError::PortalTimeout(_))));
    }
}
