//! Token resolution use case.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::application::dto::TokenSource;
use crate::domain::entities::AuthToken;
use crate::domain::errors::AuthError;
use crate::domain::ports::TokenStoragePort;

/// Resolved token with its source.
#[derive(Debug, Clone)]
pub struct ResolvedToken {
    /// The bearer token.
    pub token: AuthToken,
    /// Source of the token.
    pub source: TokenSource,
}

impl ResolvedToken {
    /// Creates new resolved token.
    #[must_use]
    pub const fn new(token: AuthToken, source: TokenSource) -> Self {
        Self { token, source }
    }
}

/// Resolves the bearer token from available sources.
pub struct ResolveTokenUseCase {
    storage_port: Arc<dyn TokenStoragePort>,
}

impl ResolveTokenUseCase {
    /// Creates new use case.
    #[must_use]
    pub const fn new(storage_port: Arc<dyn TokenStoragePort>) -> Self {
        Self { storage_port }
    }

    /// Resolves the token.
    ///
    /// Priority:
    /// 1. CLI/Env (passed as argument)
    /// 2. Keyring
    ///
    /// With `persist`, a command-line token is also written to the keyring.
    ///
    /// # Errors
    /// Returns error if a command-line token is malformed.
    pub async fn execute(
        &self,
        cli_token: Option<String>,
        persist: bool,
    ) -> Result<Option<ResolvedToken>, AuthError> {
        if let Some(token_str) = cli_token.filter(|s| !s.trim().is_empty()) {
            debug!("Checking command-line/env token");
            let token = AuthToken::new(token_str)
                .ok_or_else(|| AuthError::invalid_format("token must not contain whitespace"))?;

            if persist {
                match self.storage_port.store_token(&token).await {
                    Ok(()) => info!("Saved token to system keyring"),
                    Err(e) => warn!(error = %e, "Failed to save token to keyring"),
                }
            }

            info!("Using token from command line / environment");
            return Ok(Some(ResolvedToken::new(token, TokenSource::CommandLine)));
        }

        debug!("Checking keyring for stored token");
        match self.storage_port.get_token().await {
            Ok(Some(token)) => {
                info!("Using token from system keyring");
                Ok(Some(ResolvedToken::new(token, TokenSource::Keyring)))
            }
            Ok(None) => {
                debug!("No token found in any source");
                Ok(None)
            }
            Err(e) => {
                debug!(error = %e, "Failed to check keyring");
                Err(e)
            }
        }
    }

    /// Removes the stored token.
    ///
    /// # Errors
    /// Returns error if the keyring cannot be written.
    pub async fn forget(&self) -> Result<(), AuthError> {
        self.storage_port.delete_token().await?;
        info!("Removed token from system keyring");
        Ok(())
    }
}
