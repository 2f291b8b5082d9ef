use std::sync::Arc;

use actix_web::middleware::NormalizePath;
use actix_web::web::Data;
use actix_web::{App, HttpResponse, HttpServer, Responder, get};
use anyhow::{Context, anyhow};

mod api;
mod auth;
mod cli;
mod config;
mod docs;
mod error;
mod google;
mod model;
mod models;
mod pipeline;
mod routes;
mod utils;

use cli::Command;
use config::Config;
use google::{
    drive::DriveClient, oauth::GoogleOAuth, service_account::ServiceAccount, sheets::SheetsClient,
};
use utils::roster_cache::{RosterStore, SheetsRosterSource};
use utils::session_revocation::RevokedSessions;

use crate::docs::ApiDoc;
use tracing::{error, info, warn};
use tracing_appender::rolling;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

fn service_account(config: &Config, http: &reqwest::Client) -> anyhow::Result<Arc<ServiceAccount>> {
    let path = config
        .credentials_path
        .as_ref()
        .ok_or_else(|| anyhow!("GOOGLE_APPLICATION_CREDENTIALS must point to a service account file"))?;
    let account = ServiceAccount::from_file(path, http.clone())?;
    info!(account = %account.client_email(), "Service account loaded");
    Ok(Arc::new(account))
}

async fn serve(config: Config, http: reqwest::Client) -> anyhow::Result<()> {
    let auth = service_account(&config, &http)?;
    let sheets = SheetsClient::new(http.clone(), auth, config.sheet_id.clone());

    let store = Data::new(RosterStore::new(
        Arc::new(SheetsRosterSource {
            sheets,
            attendance_sheet: config.attendance_sheet.clone(),
            staff_sheet: config.staff_sheet.clone(),
        }),
        config.data_cache_ttl,
    ));
    let revoked = Data::new(RevokedSessions::new(config.session_ttl as u64));
    let oauth = Data::new(GoogleOAuth::new(http, &config));

    if !config.has_oauth() {
        warn!("Google OAuth is not configured");
    }
    if config.development_mode {
        warn!("Development mode: user picker login is enabled");
    }

    let store_for_warmup = store.clone();
    actix_web::rt::spawn(async move {
        if let Err(e) = store_for_warmup.get().await {
            error!(error = %e, "Failed to warm up roster cache");
        }
    });

    let server_addr = config.server_addr.clone();
    let config_data = Data::new(config.clone());

    info!(addr = %server_addr, "Server starting...");

    HttpServer::new(move || {
        App::new()
            .wrap(actix_web::middleware::Logger::default())
            .wrap(NormalizePath::trim())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-doc/openapi.json", ApiDoc::openapi()),
            )
            .app_data(config_data.clone())
            .app_data(store.clone())
            .app_data(revoked.clone())
            .app_data(oauth.clone())
            .service(health)
            .configure(|cfg| routes::configure(cfg, config.clone()))
    })
    .bind(server_addr)?
    .run()
    .await
    .context("server stopped with an error")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let command = cli::detect_command()?;
    let config = Config::from_env()?;

    // Rolling daily log
    let file_appender = rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_target(false) // removes module path
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .pretty()
        .init();

    let http = reqwest::Client::new();

    match command {
        Command::Serve => serve(config, http).await,
        Command::Import => {
            let auth = service_account(&config, &http)?;
            let drive = DriveClient::new(http.clone(), auth.clone());
            let sheets = SheetsClient::new(http, auth, config.sheet_id.clone());

            let report = pipeline::import::run_import(&config, &drive, &sheets)
                .await
                .inspect_err(|e| error!(error = %e, "Import failed"))?;
            println!(
                "Updated '{}' from {} [{}] ({} rows)",
                config.paste_sheet, report.file_name, report.token, report.rows
            );
            if !report.other_candidates.is_empty() {
                println!("Skipped: {}", report.other_candidates.join(", "));
            }
            Ok(())
        }
        Command::Scrape { month } => {
            let auth = service_account(&config, &http)?;
            let drive = DriveClient::new(http, auth);

            let report = pipeline::scrape::run_scrape(&config, &drive, month.as_deref())
                .await
                .inspect_err(|e| error!(error = %e, "Scrape failed"))?;
            println!(
                "Uploaded {} ({:?}) from {}",
                report.drive_name,
                report.outcome,
                report.local_path.display()
            );
            Ok(())
        }
    }
}
