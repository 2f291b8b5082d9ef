use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};
use crate::google::service_account::ServiceAccount;

const FILES_URL: &str = "https://www.googleapis.com/drive/v3/files";
const UPLOAD_URL: &str = "https://www.googleapis.com/upload/drive/v3/files";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    Created,
    Overwritten,
}

/// Where an upload lands given the same-named files already in the folder.
#[derive(Debug, PartialEq)]
pub enum UploadPlan<'a> {
    Overwrite(&'a DriveFile),
    Create,
}

/// The first same-named file is overwritten; with none, a new file is created.
pub fn plan_upload(existing: &[DriveFile]) -> UploadPlan<'_> {
    match existing.first() {
        Some(file) => UploadPlan::Overwrite(file),
        None => UploadPlan::Create,
    }
}

/// Escapes a literal for the Drive query language.
pub fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Files in `folder` whose name contains `fragment`, excluding trash.
pub fn contains_query(folder: &str, fragment: &str) -> String {
    format!(
        "name contains {} and {} in parents and trashed=false",
        quote_literal(fragment),
        quote_literal(folder)
    )
}

/// Files in `folder` named exactly `name`, excluding trash.
pub fn exact_name_query(folder: &str, name: &str) -> String {
    format!(
        "name={} and {} in parents and trashed=false",
        quote_literal(name),
        quote_literal(folder)
    )
}

#[derive(Clone)]
pub struct DriveClient {
    http: reqwest::Client,
    auth: Arc<ServiceAccount>,
}

impl DriveClient {
    pub fn new(http: reqwest::Client, auth: Arc<ServiceAccount>) -> Self {
        Self { http, auth }
    }

    async fn check(response: reqwest::Response, what: &str) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(AppError::UpstreamUnavailable(format!("{what} returned {status}")))
        }
    }

    /// Runs a files.list query, following page tokens.
    pub async fn list(&self, query: &str) -> AppResult<Vec<DriveFile>> {
        let token = self.auth.access_token().await?;
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![
                ("q", query.to_string()),
                ("spaces", "drive".to_string()),
                (
                    "fields",
                    "nextPageToken, files(id, name, modifiedTime)".to_string(),
                ),
            ];
            if let Some(t) = page_token.take() {
                params.push(("pageToken", t));
            }

            let response = self
                .http
                .get(FILES_URL)
                .bearer_auth(&token)
                .query(&params)
                .send()
                .await?;
            let page: FileList = Self::check(response, "listing drive files")
                .await?
                .json()
                .await?;

            files.extend(page.files);
            match page.next_page_token {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        debug!(query, found = files.len(), "Drive listing");
        Ok(files)
    }

    pub async fn download(&self, file_id: &str) -> AppResult<Vec<u8>> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .get(format!("{FILES_URL}/{file_id}"))
            .bearer_auth(token)
            .query(&[("alt", "media")])
            .send()
            .await?;
        let bytes = Self::check(response, "downloading drive file")
            .await?
            .bytes()
            .await?;
        Ok(bytes.to_vec())
    }

    async fn put_media(&self, file_id: &str, content: Vec<u8>, mime: &str) -> AppResult<()> {
        let token = self.auth.access_token().await?;
        let response = self
            .http
            .patch(format!("{UPLOAD_URL}/{file_id}"))
            .bearer_auth(token)
            .query(&[("uploadType", "media")])
            .header(reqwest::header::CONTENT_TYPE, mime)
            .body(content)
            .send()
            .await?;
        Self::check(response, "uploading drive content").await?;
        Ok(())
    }

    /// Uploads under `name`, overwriting the content of a same-named file in
    /// the folder when one exists.
    pub async fn upload(
        &self,
        folder: &str,
        name: &str,
        content: Vec<u8>,
        mime: &str,
    ) -> AppResult<UploadOutcome> {
        let existing = self.list(&exact_name_query(folder, name)).await?;

        if let UploadPlan::Overwrite(file) = plan_upload(&existing) {
            self.put_media(&file.id, content, mime).await?;
            info!(name, file_id = %file.id, "Overwrote existing drive file");
            return Ok(UploadOutcome::Overwritten);
        }

        let token = self.auth.access_token().await?;
        let response = self
            .http
            .post(FILES_URL)
            .bearer_auth(token)
            .query(&[("fields", "id")])
            .json(&json!({ "name": name, "parents": [folder], "mimeType": mime }))
            .send()
            .await?;
        let created: CreatedFile = Self::check(response, "creating drive file")
            .await?
            .json()
            .await?;

        self.put_media(&created.id, content, mime).await?;
        info!(name, file_id = %created.id, "Created drive file");
        Ok(UploadOutcome::Created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queries_escape_literals() {
        assert_eq!(
            contains_query("folder1", "kintai_"),
            "name contains 'kintai_' and 'folder1' in parents and trashed=false"
        );
        assert_eq!(
            exact_name_query("f", "it's.csv"),
            "name='it\\'s.csv' and 'f' in parents and trashed=false"
        );
    }

    #[test]
    fn upload_overwrites_first_match_or_creates() {
        let file = |id: &str| DriveFile {
            id: id.into(),
            name: "kintai_2025-05.csv".into(),
            modified_time: None,
        };
        let existing = vec![file("a"), file("b")];

        assert_eq!(plan_upload(&existing), UploadPlan::Overwrite(&existing[0]));
        assert_eq!(plan_upload(&[]), UploadPlan::Create);
    }

    #[test]
    fn file_list_parses_camel_case() {
        let list: FileList = serde_json::from_str(
            r#"{"files":[{"id":"1","name":"kintai_2025-05.csv","modifiedTime":"2025-06-01T00:00:00Z"}]}"#,
        )
        .unwrap();
        assert_eq!(list.files[0].modified_time.as_deref(), Some("2025-06-01T00:00:00Z"));
        assert!(list.next_page_token.is_none());
    }
}
