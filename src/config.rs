use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use dotenvy::dotenv;

use crate::model::permission::PermissionSet;

#[derive(Clone)]
pub struct Config {
    pub server_addr: String,
    pub jwt_secret: String,
    pub session_ttl: usize,
    pub api_prefix: String,

    // Rate limiting
    pub rate_login_per_min: u32,
    pub rate_protected_per_min: u32,

    // Spreadsheet
    pub sheet_id: String,
    pub attendance_sheet: String,
    pub staff_sheet: String,
    pub paste_sheet: String,
    pub data_cache_ttl: u64,

    // Drive
    pub drive_folder_id: String,
    pub export_prefix: String,
    pub credentials_path: Option<PathBuf>,

    // Google OAuth
    pub google_client_id: String,
    pub google_client_secret: String,
    pub redirect_uri: String,
    pub development_mode: bool,

    pub permissions: PermissionSet,

    // Portal scrape
    pub portal: PortalConfig,
}

#[derive(Clone)]
pub struct PortalConfig {
    pub url: String,
    pub user: String,
    pub password: String,
    pub webdriver_url: String,
    pub download_dir: PathBuf,
    pub timeout_secs: u64,
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .map(|v| v.trim().to_string())
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn required(key: &str) -> Result<String> {
    let value = var_or(key, "");
    if value.is_empty() {
        return Err(anyhow!("{key} must be set"));
    }
    Ok(value)
}

fn parsed<T>(key: &str, default: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    var_or(key, default)
        .parse()
        .with_context(|| format!("{key} has an invalid value"))
}

fn parse_bool(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Accepts either a bare spreadsheet id or a full `.../spreadsheets/d/<id>/edit` URL.
pub fn sheet_id_from_url(value: &str) -> String {
    let value = value.trim();
    match value.split("/d/").nth(1) {
        Some(rest) => rest.split('/').next().unwrap_or(rest).to_string(),
        None => value.to_string(),
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let sheet_source = match var_or("SHEET_ID", "") {
            id if !id.is_empty() => id,
            _ => required("SHEET_URL").context("SHEET_ID or SHEET_URL must be set")?,
        };

        let permissions = PermissionSet::from_config(
            &var_or("PERMISSION_LABELS", ""),
            &var_or("LOGIN_PERMISSIONS", ""),
        )?;

        let credentials_path = match var_or("GOOGLE_APPLICATION_CREDENTIALS", "") {
            p if p.is_empty() => None,
            p => Some(PathBuf::from(p)),
        };

        Ok(Self {
            server_addr: var_or("SERVER_ADDR", "127.0.0.1:8080"),
            jwt_secret: required("JWT_SECRET")?,
            session_ttl: parsed("SESSION_TTL", "28800")?, // default 8 hours
            api_prefix: var_or("API_PREFIX", "/api"),

            rate_login_per_min: parsed("RATE_LOGIN_PER_MIN", "60")?,
            rate_protected_per_min: parsed("RATE_PROTECTED_PER_MIN", "1000")?,

            sheet_id: sheet_id_from_url(&sheet_source),
            attendance_sheet: var_or("ATTENDANCE_SHEET", "勤怠確認シート(打刻管理)"),
            staff_sheet: var_or("STAFF_SHEET", "社員一覧"),
            paste_sheet: var_or("PASTE_SHEET", "貼り付け用"),
            data_cache_ttl: parsed("DATA_CACHE_TTL", "300")?,

            drive_folder_id: var_or("DRIVE_FOLDER_ID", ""),
            export_prefix: var_or("EXPORT_PREFIX", "kintai_"),
            credentials_path,

            google_client_id: var_or("GOOGLE_CLIENT_ID", ""),
            google_client_secret: var_or("GOOGLE_CLIENT_SECRET", ""),
            redirect_uri: var_or("REDIRECT_URI", "http://localhost:8501/"),
            development_mode: parse_bool(&var_or("DEVELOPMENT_MODE", "false")),

            permissions,

            portal: PortalConfig {
                url: var_or("PORTAL_URL", ""),
                user: var_or("PORTAL_USER", ""),
                password: var_or("PORTAL_PASSWORD", ""),
                webdriver_url: var_or("WEBDRIVER_URL", "http://localhost:9515"),
                download_dir: PathBuf::from(var_or("DOWNLOAD_DIR", "downloads")),
                timeout_secs: parsed("PORTAL_TIMEOUT", "120")?,
            },
        })
    }

    /// OAuth is usable only with an id and a plausible-looking secret.
    pub fn has_oauth(&self) -> bool {
        let id = self.google_client_id.trim();
        let secret = self.google_client_secret.trim();
        if id.is_empty() || secret.is_empty() {
            return false;
        }
        (secret.starts_with("GOCSPX-") && secret.len() > 10) || secret.len() > 20
    }

    /// Minimal config for handler tests.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            server_addr: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            session_ttl: 3600,
            api_prefix: "/api".into(),
            rate_login_per_min: 1000,
            rate_protected_per_min: 1000,
            sheet_id: "sheet".into(),
            attendance_sheet: "勤怠確認シート(打刻管理)".into(),
            staff_sheet: "社員一覧".into(),
            paste_sheet: "貼り付け用".into(),
            data_cache_ttl: 300,
            drive_folder_id: "folder".into(),
            export_prefix: "kintai_".into(),
            credentials_path: None,
            google_client_id: String::new(),
            google_client_secret: String::new(),
            redirect_uri: "http://localhost:8501/".into(),
            development_mode: true,
            permissions: PermissionSet::default(),
            portal: PortalConfig {
                url: String::new(),
                user: String::new(),
                password: String::new(),
                webdriver_url: "http://localhost:9515".into(),
                download_dir: PathBuf::from("downloads"),
                timeout_secs: 5,
            },
        }
    }
}
