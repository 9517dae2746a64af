//! Downloads the extended OPML export from overcast.fm.

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::Account;

const OVERCAST_BASE: &str = "https://overcast.fm";

/// Errors that can occur while retrieving the export. All of them are fatal
/// to the run: without a fresh export there is nothing to publish.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// The login endpoint rejected the credentials.
    #[error("Could not log in: status {0}")]
    Login(StatusCode),
    /// The export endpoint refused the request after a successful login.
    #[error("Could not get the export: status {0}")]
    Export(StatusCode),
}

/// HTTP client for the overcast.fm account endpoints.
///
/// Holds a cookie store so the session established by the login call is
/// carried into the export download.
pub struct OvercastClient {
    http: reqwest::Client,
    base_url: String,
}

impl OvercastClient {
    /// Client against the production host.
    pub fn new() -> Result<Self, DownloadError> {
        Self::with_base_url(OVERCAST_BASE)
    }

    /// Client against a different host; tests point this at a mock server.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DownloadError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Logs in and downloads the extended OPML export.
    ///
    /// Each call is a single login POST followed by a single export GET —
    /// no retries. The password leaves its [`secrecy`] wrapper only here,
    /// at the request boundary.
    pub async fn download_export(&self, account: &Account) -> Result<String, DownloadError> {
        let login = self
            .http
            .post(format!("{}/login", self.base_url))
            .form(&[
                ("email", account.email.as_str()),
                ("password", account.password.expose_secret()),
                ("then", "account"),
            ])
            .send()
            .await?;
        if !login.status().is_success() {
            return Err(DownloadError::Login(login.status()));
        }
        tracing::debug!(email = %account.email, "Logged in");

        let export = self
            .http
            .get(format!("{}/account/export_opml/extended", self.base_url))
            .send()
            .await?;
        if !export.status().is_success() {
            return Err(DownloadError::Export(export.status()));
        }

        Ok(export.text().await?)
    }
}
