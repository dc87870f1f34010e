// Installed-app OAuth flow against Google's authorization endpoints.
//
// `authorize` is interactive: it binds a loopback listener, logs a consent
// URL for the operator to open, waits for the browser redirect carrying
// the authorization code, and exchanges the code for tokens. `refresh`
// is a plain form post to the token endpoint.
//
// The client secret file is the JSON Google Cloud Console hands out for
// "Desktop app" OAuth clients:
//
//   {"installed": {"client_id": ..., "client_secret": ...,
//                  "auth_uri": ..., "token_uri": ..., ...}}
//
// The file is read on every call rather than at startup so a missing file
// shows up as an unhealthy /health response instead of a crashed process.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use reqwest::{Client, Url};
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use crate::core::auth::{AuthBroker, AuthError, StoredCredential, CREDENTIAL_SCHEMA_VERSION};

/// Scope requested during authorization. Read-write access to spreadsheets
/// is needed for the append call.
pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

const SUCCESS_PAGE: &str = "Authentication successful! You can close this window.";
const FAILURE_PAGE: &str = "Authentication failed. Check the service logs and try again.";

#[derive(Debug, Deserialize)]
struct ClientSecretFile {
    installed: InstalledClient,
}

/// The fields of the client secret file this flow actually uses.
#[derive(Debug, Clone, Deserialize)]
struct InstalledClient {
    client_id: String,
    client_secret: String,
    auth_uri: String,
    token_uri: String,
}

/// Response from Google's token endpoint. `refresh_token` is only present
/// on the initial code exchange (and only with `access_type=offline`).
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: i64,
}

pub struct GoogleAuthBroker {
    secret_path: PathBuf,
    callback_port: u16,
    client: Client,
}

impl GoogleAuthBroker {
    pub fn new(secret_path: impl Into<PathBuf>, callback_port: u16) -> Self {
        Self {
            secret_path: secret_path.into(),
            callback_port,
            client: Client::new(),
        }
    }

    async fn load_secrets(&self) -> Result<InstalledClient, AuthError> {
        let raw = tokio::fs::read_to_string(&self.secret_path)
            .await
            .map_err(|_| AuthError::MissingClientSecret(self.secret_path.display().to_string()))?;
        let parsed: ClientSecretFile = serde_json::from_str(&raw)
            .map_err(|err| AuthError::Broker(format!("Invalid client secret file: {}", err)))?;
        Ok(parsed.installed)
    }

    fn redirect_uri(&self) -> String {
        format!("http://localhost:{}/", self.callback_port)
    }

    fn consent_url(&self, secrets: &InstalledClient, state: &str) -> Result<Url, AuthError> {
        let redirect_uri = self.redirect_uri();
        Url::parse_with_params(
            &secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
                ("scope", SHEETS_SCOPE),
                ("state", state),
                // Offline access is what yields a refresh token.
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|err| AuthError::Broker(format!("Invalid auth_uri in client secret: {}", err)))
    }

    /// Accepts exactly one connection on the listener, extracts the
    /// authorization code from the redirect, and answers the browser with
    /// a small HTML page either way.
    async fn wait_for_code(listener: TcpListener, expected_state: &str) -> Result<String, AuthError> {
        let (mut socket, _) = listener
            .accept()
            .await
            .map_err(|err| AuthError::Broker(format!("Callback listener failed: {}", err)))?;

        let outcome = Self::read_redirect(&mut socket, expected_state).await;

        let page = if outcome.is_ok() { SUCCESS_PAGE } else { FAILURE_PAGE };
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            page.len(),
            page
        );
        // Best effort; the code matters more than the browser page.
        let _ = socket.write_all(response.as_bytes()).await;

        outcome
    }

    async fn read_redirect(socket: &mut TcpStream, expected_state: &str) -> Result<String, AuthError> {
        let mut buf = vec![0u8; 8192];
        let n = socket
            .read(&mut buf)
            .await
            .map_err(|err| AuthError::Broker(format!("Failed to read redirect request: {}", err)))?;
        let request = String::from_utf8_lossy(&buf[..n]);

        // Only the request line matters: "GET /?state=...&code=... HTTP/1.1"
        let path = request
            .lines()
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .ok_or_else(|| AuthError::Broker("Malformed redirect request".to_string()))?;
        let url = Url::parse(&format!("http://localhost{}", path))
            .map_err(|err| AuthError::Broker(format!("Malformed redirect URL: {}", err)))?;

        let mut code = None;
        let mut state = None;
        for (key, value) in url.query_pairs() {
            match key.as_ref() {
                "code" => code = Some(value.into_owned()),
                "state" => state = Some(value.into_owned()),
                "error" => {
                    return Err(AuthError::Broker(format!(
                        "Authorization was denied: {}",
                        value
                    )))
                }
                _ => {}
            }
        }

        if state.as_deref() != Some(expected_state) {
            return Err(AuthError::Broker(
                "State mismatch in redirect; discarding authorization code".to_string(),
            ));
        }
        code.ok_or_else(|| AuthError::Broker("Redirect carried no authorization code".to_string()))
    }

    async fn exchange(
        &self,
        secrets: &InstalledClient,
        params: &[(&str, &str)],
        wrap: fn(String) -> AuthError,
    ) -> Result<TokenResponse, AuthError> {
        let response = self
            .client
            .post(&secrets.token_uri)
            .form(params)
            .send()
            .await
            .map_err(|err| wrap(err.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(wrap(format!("Token endpoint returned {}: {}", status, text)));
        }

        response.json().await.map_err(|err| wrap(err.to_string()))
    }

    fn credential_from(token: TokenResponse, fallback_refresh: Option<String>) -> StoredCredential {
        StoredCredential {
            version: CREDENTIAL_SCHEMA_VERSION,
            access_token: token.access_token,
            // Google omits the refresh token on refresh responses; keep
            // the one we already have.
            refresh_token: token.refresh_token.or(fallback_refresh),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        }
    }
}

#[async_trait]
impl AuthBroker for GoogleAuthBroker {
    async fn authorize(&self) -> Result<StoredCredential, AuthError> {
        let secrets = self.load_secrets().await?;

        let state: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(32)
            .map(char::from)
            .collect();
        let consent_url = self.consent_url(&secrets, &state)?;

        // Bind before logging the URL so the redirect cannot beat the
        // listener.
        let listener = TcpListener::bind(("127.0.0.1", self.callback_port))
            .await
            .map_err(|err| {
                AuthError::Broker(format!(
                    "Failed to bind callback listener on port {}: {}",
                    self.callback_port, err
                ))
            })?;
        tracing::info!(
            "Authorization required. Open this URL in a browser: {}",
            consent_url
        );

        let code = Self::wait_for_code(listener, &state).await?;

        let redirect_uri = self.redirect_uri();
        let token = self
            .exchange(
                &secrets,
                &[
                    ("grant_type", "authorization_code"),
                    ("code", code.as_str()),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                    ("redirect_uri", redirect_uri.as_str()),
                ],
                AuthError::Broker,
            )
            .await?;

        tracing::info!("Created new credential through OAuth flow");
        Ok(Self::credential_from(token, None))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<StoredCredential, AuthError> {
        let secrets = self.load_secrets().await?;

        let token = self
            .exchange(
                &secrets,
                &[
                    ("grant_type", "refresh_token"),
                    ("refresh_token", refresh_token),
                    ("client_id", secrets.client_id.as_str()),
                    ("client_secret", secrets.client_secret.as_str()),
                ],
                AuthError::Refresh,
            )
            .await?;

        Ok(Self::credential_from(token, Some(refresh_token.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secrets() -> InstalledClient {
        InstalledClient {
            client_id: "id-123".to_string(),
            client_secret: "secret".to_string(),
            auth_uri: "https://accounts.google.com/o/oauth2/auth".to_string(),
            token_uri: "https://oauth2.googleapis.com/token".to_string(),
        }
    }

    #[test]
    fn consent_url_carries_scope_state_and_offline_access() {
        let broker = GoogleAuthBroker::new("credentials.json", 8080);
        let url = broker.consent_url(&secrets(), "st4te").unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(pairs.contains(&("client_id".to_string(), "id-123".to_string())));
        assert!(pairs.contains(&("scope".to_string(), SHEETS_SCOPE.to_string())));
        assert!(pairs.contains(&("state".to_string(), "st4te".to_string())));
        assert!(pairs.contains(&("access_type".to_string(), "offline".to_string())));
        assert!(pairs.contains(&(
            "redirect_uri".to_string(),
            "http://localhost:8080/".to_string()
        )));
    }

    #[tokio::test]
    async fn missing_client_secret_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let broker = GoogleAuthBroker::new(dir.path().join("nope.json"), 8080);

        let err = broker.load_secrets().await.unwrap_err();
        assert!(matches!(err, AuthError::MissingClientSecret(_)));
    }

    #[tokio::test]
    async fn redirect_with_matching_state_yields_the_code() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        let client = tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?state=expected&code=c0de HTTP/1.1\r\nHost: localhost\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            stream.read_to_string(&mut response).await.unwrap();
            response
        });

        let code = GoogleAuthBroker::wait_for_code(listener, "expected")
            .await
            .unwrap();
        assert_eq!(code, "c0de");

        let response = client.await.unwrap();
        assert!(response.contains("Authentication successful"));
    }

    #[tokio::test]
    async fn redirect_with_wrong_state_is_rejected() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?state=forged&code=c0de HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            let _ = stream.read_to_string(&mut response).await;
        });

        let err = GoogleAuthBroker::wait_for_code(listener, "expected")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Broker(_)));
    }

    #[tokio::test]
    async fn redirect_with_error_param_fails_the_flow() {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            stream
                .write_all(b"GET /?error=access_denied&state=expected HTTP/1.1\r\n\r\n")
                .await
                .unwrap();
            let mut response = String::new();
            let _ = stream.read_to_string(&mut response).await;
        });

        let err = GoogleAuthBroker::wait_for_code(listener, "expected")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn refresh_response_without_refresh_token_keeps_the_old_one() {
        let token = TokenResponse {
            access_token: "new-access".to_string(),
            refresh_token: None,
            expires_in: 3600,
        };

        let credential =
            GoogleAuthBroker::credential_from(token, Some("old-refresh".to_string()));

        assert_eq!(credential.access_token, "new-access");
        assert_eq!(credential.refresh_token.as_deref(), Some("old-refresh"));
        assert_eq!(credential.version, CREDENTIAL_SCHEMA_VERSION);
    }
}
