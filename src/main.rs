// This is the entry point of the activity logger service.
//
// **Architecture Overview:**
// - `core/` = Business logic (no HTTP framework, no Google types)
// - `infra/` = Implementations of core traits (Sheets API, OAuth, token file)
// - `http/` = axum routes and handlers
//
// This file's job is to:
// 1. Load configuration from the environment
// 2. Initialize services (dependency injection)
// 3. Build the router and serve it

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with a pile of mod.rs files that all look the same.
#[path = "core/core_layer.rs"]
mod core;
#[path = "http/http_layer.rs"]
mod http;
#[path = "infra/infra_layer.rs"]
mod infra;

use std::net::SocketAddr;
use std::sync::Arc;

use crate::core::activity::ActivityService;
use crate::core::auth::CredentialManager;
use crate::http::{router, AppContext};
use crate::infra::auth::{FileTokenStore, GoogleAuthBroker};
use crate::infra::sheets::SheetsApiClient;

// The sheet this deployment has always logged to.
const DEFAULT_SPREADSHEET_ID: &str = "1fmcRrLH57ZDlGSWpEKTdazPYrzOSybcdKize61C8X8Q";
const DEFAULT_SHEET_RANGE: &str = "Sheet1!A:D";
const DEFAULT_CLIENT_SECRET_PATH: &str = "credentials.json";
const DEFAULT_TOKEN_STORE_PATH: &str = "token.json";
const DEFAULT_OAUTH_CALLBACK_PORT: u16 = 8080;
const DEFAULT_HTTP_PORT: u16 = 8000;

/// Runtime configuration, read from the environment at startup.
#[derive(Debug, Clone)]
struct Config {
    spreadsheet_id: String,
    sheet_range: String,
    client_secret_path: String,
    token_store_path: String,
    oauth_callback_port: u16,
    http_port: u16,
}

impl Config {
    fn from_env() -> Self {
        Self {
            spreadsheet_id: env_or("SPREADSHEET_ID", DEFAULT_SPREADSHEET_ID),
            sheet_range: env_or("SHEET_RANGE", DEFAULT_SHEET_RANGE),
            client_secret_path: env_or("CLIENT_SECRET_PATH", DEFAULT_CLIENT_SECRET_PATH),
            token_store_path: env_or("TOKEN_STORE_PATH", DEFAULT_TOKEN_STORE_PATH),
            oauth_callback_port: env_port("OAUTH_CALLBACK_PORT", DEFAULT_OAUTH_CALLBACK_PORT),
            http_port: env_port("PORT", DEFAULT_HTTP_PORT),
        }
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_port(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from .env file (if it exists)
    dotenv::dotenv().ok();

    let config = Config::from_env();
    tracing::info!(
        spreadsheet_id = %config.spreadsheet_id,
        range = %config.sheet_range,
        "Starting Activity Logger API"
    );

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // This is the "composition root" where we wire everything together.
    // Handlers only ever see the AppContext; nothing here is a global.

    let sheets = SheetsApiClient::new(&config.spreadsheet_id, &config.sheet_range);
    let token_store = FileTokenStore::new(&config.token_store_path);
    let broker = GoogleAuthBroker::new(&config.client_secret_path, config.oauth_callback_port);

    let context = Arc::new(AppContext {
        activities: ActivityService::new(sheets),
        credentials: CredentialManager::new(token_store, broker),
    });

    let app = router(context);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.http_port));
    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
