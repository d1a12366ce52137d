// File: crates/roombook_gcal/src/auth.rs
//! OAuth2 credential store for the calendar account.
//!
//! The store reads the Google client secret and, if present, a previously
//! obtained token file. Without a token it drives the authorization code
//! flow through [`AuthState`]: the consent URL is produced, the operator
//! signs in, Google redirects to `/oauth2callback` with a one-time code, and
//! [`CredentialStore::complete_authorization`] exchanges it and persists the
//! result. Expired tokens are refreshed on demand.

use chrono::{DateTime, Duration, Utc};
use roombook_common::models::Credential;
use roombook_common::{RoombookError, HTTP_CLIENT};
use roombook_config::GcalConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Full read/write access to the account's calendars.
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/calendar";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

#[derive(Error, Debug)]
pub enum AuthError {
    /// No usable credential; an operator has to open the URL
    #[error("Authorization required, visit {0}")]
    AuthorizationRequired(String),

    #[error("Invalid credentials file: {0}")]
    InvalidFile(String),

    #[error("No authorization is in progress")]
    NoPendingAuthorization,

    #[error("The calendar account is already authorized")]
    AlreadyAuthorized,

    #[error("OAuth state parameter does not match the pending authorization")]
    StateMismatch,

    #[error("Authorization was denied: {0}")]
    Denied(String),

    #[error("Token exchange failed: {0}")]
    Exchange(String),

    #[error("Token refresh failed: {0}")]
    Refresh(String),

    #[error("Failed to store token: {0}")]
    Storage(String),
}

impl From<AuthError> for RoombookError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::AuthorizationRequired(url) => RoombookError::AuthorizationRequired { url },
            AuthError::InvalidFile(message) => RoombookError::ConfigError(message),
            other @ AuthError::AlreadyAuthorized => RoombookError::ConflictError(other.to_string()),
            AuthError::Storage(message) => RoombookError::InternalError(message),
            other => RoombookError::AuthError(other.to_string()),
        }
    }
}

/// OAuth client registration as downloaded from the Google Cloud console.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

// The console wraps the registration in `web` or `installed`.
#[derive(Deserialize)]
struct ClientSecretFile {
    web: Option<ClientSecret>,
    installed: Option<ClientSecret>,
}

impl ClientSecret {
    pub fn from_json(json: &str) -> Result<Self, AuthError> {
        let file: ClientSecretFile =
            serde_json::from_str(json).map_err(|e| AuthError::InvalidFile(e.to_string()))?;
        let secret = file.web.or(file.installed).ok_or_else(|| {
            AuthError::InvalidFile("expected a `web` or `installed` client".to_string())
        })?;
        if secret.redirect_uris.is_empty() {
            return Err(AuthError::InvalidFile(
                "client has no redirect_uris".to_string(),
            ));
        }
        Ok(secret)
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| AuthError::InvalidFile(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&contents)
    }

    /// The redirect URI registered first, where `/oauth2callback` is served.
    pub fn redirect_uri(&self) -> &str {
        self.redirect_uris
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// Where the credential handshake currently stands.
#[derive(Debug, Clone)]
pub enum AuthState {
    Unauthenticated,
    AwaitingCode {
        authorization_url: String,
        csrf_state: String,
    },
    Authorized(Credential),
}

/// Public view of [`AuthState`] without token material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    /// `unauthenticated`, `awaiting_code` or `authorized`
    pub state: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
}

impl From<&AuthState> for AuthStatus {
    fn from(state: &AuthState) -> Self {
        match state {
            AuthState::Unauthenticated => AuthStatus {
                state: "unauthenticated".to_string(),
                authorization_url: None,
                expires_at: None,
                has_refresh_token: false,
            },
            AuthState::AwaitingCode {
                authorization_url, ..
            } => AuthStatus {
                state: "awaiting_code".to_string(),
                authorization_url: Some(authorization_url.clone()),
                expires_at: None,
                has_refresh_token: false,
            },
            AuthState::Authorized(credential) => AuthStatus {
                state: "authorized".to_string(),
                authorization_url: None,
                expires_at: credential.expires_at(),
                has_refresh_token: credential.refresh_token.is_some(),
            },
        }
    }
}

/// Body of a successful token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

impl TokenResponse {
    fn into_credential(self, issued_at: DateTime<Utc>) -> Credential {
        Credential {
            access_token: self.access_token,
            refresh_token: self.refresh_token,
            scope: self.scope,
            token_type: self.token_type,
            expiry_date: self
                .expires_in
                .map(|secs| (issued_at + Duration::seconds(secs)).timestamp_millis()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Holds the single cached credential for the calendar account.
pub struct CredentialStore {
    secret: ClientSecret,
    token_path: PathBuf,
    scopes: Vec<String>,
    http: reqwest::Client,
    state: RwLock<AuthState>,
}

impl CredentialStore {
    /// Build the store from configuration. A missing or invalid client
    /// secret file is an error; a missing token file is not.
    pub fn load(config: &GcalConfig) -> Result<Self, AuthError> {
        let secret = ClientSecret::from_file(Path::new(&config.credentials_path))?;
        let scopes = config
            .scopes
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| vec![DEFAULT_SCOPE.to_string()]);
        Self::new(secret, PathBuf::from(&config.token_path), scopes)
    }

    pub fn new(
        secret: ClientSecret,
        token_path: PathBuf,
        scopes: Vec<String>,
    ) -> Result<Self, AuthError> {
        let state = match read_token_file(&token_path)? {
            Some(credential) => {
                info!("Loaded stored token from {}", token_path.display());
                AuthState::Authorized(credential)
            }
            None => {
                info!(
                    "No token at {}, authorization is required",
                    token_path.display()
                );
                AuthState::Unauthenticated
            }
        };

        Ok(Self {
            secret,
            token_path,
            scopes,
            http: HTTP_CLIENT.clone(),
            state: RwLock::new(state),
        })
    }

    /// Returns a usable credential, refreshing it first when it has expired.
    ///
    /// Without a credential this starts (or repeats) the authorization
    /// handshake and fails with [`AuthError::AuthorizationRequired`].
    pub async fn obtain_credential(&self) -> Result<Credential, AuthError> {
        {
            let state = self.state.read().await;
            match &*state {
                AuthState::Authorized(credential) if !credential.is_expired() => {
                    return Ok(credential.clone());
                }
                AuthState::AwaitingCode {
                    authorization_url, ..
                } => {
                    return Err(AuthError::AuthorizationRequired(authorization_url.clone()));
                }
                _ => {}
            }
        }

        let mut state = self.state.write().await;
        // Another request may have moved the state on while we waited.
        match &*state {
            AuthState::Authorized(credential) if !credential.is_expired() => {
                Ok(credential.clone())
            }
            AuthState::Authorized(credential) => match credential.refresh_token.clone() {
                Some(refresh_token) => {
                    let refreshed = self.refresh(&refresh_token).await?;
                    self.persist(&refreshed)?;
                    *state = AuthState::Authorized(refreshed.clone());
                    Ok(refreshed)
                }
                None => {
                    warn!("Stored token expired and has no refresh token");
                    let url = self.start_handshake(&mut state);
                    Err(AuthError::AuthorizationRequired(url))
                }
            },
            AuthState::AwaitingCode {
                authorization_url, ..
            } => Err(AuthError::AuthorizationRequired(authorization_url.clone())),
            AuthState::Unauthenticated => {
                let url = self.start_handshake(&mut state);
                Err(AuthError::AuthorizationRequired(url))
            }
        }
    }

    /// Returns the consent URL of the pending handshake, starting one if
    /// there is none.
    ///
    /// A credential that is still valid or can be refreshed is never given
    /// up here: the call fails with [`AuthError::AlreadyAuthorized`].
    pub async fn begin_authorization(&self) -> Result<String, AuthError> {
        let mut state = self.state.write().await;
        match &*state {
            AuthState::Authorized(credential)
                if !credential.is_expired() || credential.refresh_token.is_some() =>
            {
                warn!("Ignoring authorization request, a credential is already held");
                Err(AuthError::AlreadyAuthorized)
            }
            AuthState::AwaitingCode {
                authorization_url, ..
            } => Ok(authorization_url.clone()),
            _ => Ok(self.start_handshake(&mut state)),
        }
    }

    fn start_handshake(&self, state: &mut AuthState) -> String {
        let csrf_state = uuid::Uuid::new_v4().to_string();
        let authorization_url = self.authorization_url(&csrf_state);
        info!(
            "Authorize this app by visiting this url: {}",
            authorization_url
        );
        *state = AuthState::AwaitingCode {
            authorization_url: authorization_url.clone(),
            csrf_state,
        };
        authorization_url
    }

    /// Consent URL for the configured scopes with the given CSRF state.
    pub fn authorization_url(&self, csrf_state: &str) -> String {
        let scope = self.scopes.join(" ");
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("redirect_uri", self.secret.redirect_uri()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
            ("access_type", "offline"),
            ("prompt", "consent"),
            ("state", csrf_state),
        ];
        // Encoding a fixed list of string pairs cannot fail.
        let query = serde_urlencoded::to_string(params).unwrap_or_default();
        format!("{}?{}", self.secret.auth_uri, query)
    }

    /// Finish the handshake with the code from the redirect.
    ///
    /// The state must be `AwaitingCode` and `csrf_state` must echo the value
    /// sent with the consent URL. On exchange failure the store keeps
    /// waiting for a code.
    pub async fn complete_authorization(
        &self,
        code: &str,
        csrf_state: Option<&str>,
    ) -> Result<Credential, AuthError> {
        let mut state = self.state.write().await;
        let expected = match &*state {
            AuthState::AwaitingCode { csrf_state, .. } => csrf_state.clone(),
            _ => return Err(AuthError::NoPendingAuthorization),
        };
        if csrf_state != Some(expected.as_str()) {
            warn!("Rejecting OAuth callback with missing or mismatching state");
            return Err(AuthError::StateMismatch);
        }

        let credential = self.exchange_code(code).await.map_err(|e| {
            error!("Error retrieving access token: {}", e);
            e
        })?;
        self.persist(&credential)?;
        info!("Token stored to {}", self.token_path.display());

        *state = AuthState::Authorized(credential.clone());
        Ok(credential)
    }

    pub async fn status(&self) -> AuthStatus {
        AuthStatus::from(&*self.state.read().await)
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential, AuthError> {
        let params = [
            ("code", code),
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("redirect_uri", self.secret.redirect_uri()),
            ("grant_type", "authorization_code"),
        ];
        let response = self
            .post_token_request(&params)
            .await
            .map_err(AuthError::Exchange)?;
        Ok(response.into_credential(Utc::now()))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<Credential, AuthError> {
        debug!("Refreshing access token");
        let params = [
            ("client_id", self.secret.client_id.as_str()),
            ("client_secret", self.secret.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self.post_token_request(&params).await.map_err(|e| {
            error!("Failed to refresh access token: {}", e);
            AuthError::Refresh(e)
        })?;

        let mut credential = response.into_credential(Utc::now());
        // Google omits the refresh token on refresh; keep the one we have.
        if credential.refresh_token.is_none() {
            credential.refresh_token = Some(refresh_token.to_string());
        }
        info!("Access token refreshed");
        Ok(credential)
    }

    async fn post_token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse, String> {
        let body = serde_urlencoded::to_string(params).map_err(|e| e.to_string())?;
        let response = self
            .http
            .post(&self.secret.token_uri)
            .header(
                reqwest::header::CONTENT_TYPE,
                "application/x-www-form-urlencoded",
            )
            .body(body)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        let text = response.text().await.map_err(|e| e.to_string())?;
        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&text) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{} ({}): {}", status, err.error, description),
                    None => format!("{} ({})", status, err.error),
                },
                Err(_) => format!("{}: {}", status, text),
            });
        }
        serde_json::from_str(&text).map_err(|e| format!("invalid token response: {}", e))
    }

    /// Writes the token file via a temporary file and a rename, so readers
    /// see either the old or the new complete token.
    fn persist(&self, credential: &Credential) -> Result<(), AuthError> {
        let json = serde_json::to_string(credential)
            .map_err(|e| AuthError::Storage(e.to_string()))?;

        if let Some(dir) = self.token_path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).map_err(|e| AuthError::Storage(e.to_string()))?;
            }
        }

        let tmp_path = self.token_path.with_extension("json.tmp");
        let mut file = open_private(&tmp_path).map_err(|e| AuthError::Storage(e.to_string()))?;
        file.write_all(json.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| AuthError::Storage(e.to_string()))?;
        fs::rename(&tmp_path, &self.token_path).map_err(|e| AuthError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

fn read_token_file(path: &Path) -> Result<Option<Credential>, AuthError> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| AuthError::InvalidFile(format!("{}: {}", path.display(), e)))?;
    let credential = serde_json::from_str(&contents)
        .map_err(|e| AuthError::InvalidFile(format!("{}: {}", path.display(), e)))?;
    Ok(Some(credential))
}
