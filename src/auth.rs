// OAuth2 access tokens for the Storage and Monitoring APIs.
// Token exchange and caching are delegated to gcp_auth.

use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::instrument;

/// Read-only scope covering bucket listing and time series reads.
pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform.read-only"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("service account credentials {path}: {source}")]
    Credentials {
        path: String,
        #[source]
        source: gcp_auth::Error,
    },
    #[error("access token request failed: {0}")]
    Token(#[source] gcp_auth::Error),
    #[error("project id not available from credentials: {0}")]
    ProjectId(#[source] gcp_auth::Error),
    #[error("token source returned an empty access token")]
    EmptyToken,
}

#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Service-account key file auth.
pub struct ServiceAccountAuth {
    account: CustomServiceAccount,
}

impl ServiceAccountAuth {
    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let account =
            CustomServiceAccount::from_file(path).map_err(|source| AuthError::Credentials {
                path: path.display().to_string(),
                source,
            })?;
        Ok(Self { account })
    }

    /// Project the service account belongs to.
    pub async fn project_id(&self) -> Result<String, AuthError> {
        TokenProvider::project_id(&self.account)
            .await
            .map(|id| id.to_string())
            .map_err(AuthError::ProjectId)
    }
}

#[async_trait]
impl AccessTokenSource for ServiceAccountAuth {
    #[instrument(skip(self), fields(operation = "access_token"))]
    async fn access_token(&self) -> Result<String, AuthError> {
        let token = self.account.token(SCOPES).await.map_err(AuthError::Token)?;
        non_empty(token.as_str())
    }
}

/// Fixed bearer token, for tests and emulators.
pub struct StaticToken(pub String);

#[async_trait]
impl AccessTokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, AuthError> {
        non_empty(&self.0)
    }
}

fn non_empty(token: &str) -> Result<String, AuthError> {
    if token.is_empty() {
        return Err(AuthError::EmptyToken);
    }
    Ok(token.to_string())
}

/// Shared handle type the repos hold.
pub type SharedTokenSource = Arc<dyn AccessTokenSource>;
