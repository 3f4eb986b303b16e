pub mod backend;
pub mod cli;
pub mod commands;

use std::sync::Arc;
use std::time::Duration;

use coffee_bar_config::CoffeeBarConfig;
use coffee_bar_core::CoreError;
use coffee_bar_gateway::{
    Auth0Config, Auth0IdentityProvider, CoffeeGateway, FileTokenStorage, MemoryTokenStorage,
    Session, StoredToken, TokenStorage, TOKEN_STORAGE_KEY,
};

pub use backend::GatewayBackend;

/// Pre-issued access token; when set the token file is neither read nor written.
pub const ENV_ACCESS_TOKEN: &str = "COFFEE_BAR_ACCESS_TOKEN";

pub struct App {
    pub config: CoffeeBarConfig,
    pub session: Arc<Session>,
    pub backend: Arc<GatewayBackend>,
}

impl App {
    pub fn from_config(config: CoffeeBarConfig) -> Result<Self, CoreError> {
        let identity = config
            .identity_runtime()
            .map_err(|error| CoreError::Configuration(error.to_string()))?;
        let provider = Auth0IdentityProvider::new(Auth0Config {
            domain: identity.domain,
            client_id: identity.client_id,
            audience: identity.audience,
            scope: identity.scope,
            connection: identity.connection,
            redirect_uri: identity.redirect_uri,
            logout_return_to: identity.logout_return_to,
        })?;

        let storage: Arc<dyn TokenStorage> = match static_access_token() {
            Some(access_token) => Arc::new(MemoryTokenStorage::with_token(
                TOKEN_STORAGE_KEY,
                StoredToken {
                    access_token,
                    refresh_token: None,
                    expires_at: None,
                },
            )),
            None => Arc::new(FileTokenStorage::new(config.token_path())),
        };
        let session = Arc::new(Session::new(Arc::new(provider), storage));
        let gateway = Arc::new(CoffeeGateway::new(
            config.gateway_url.clone(),
            session.tokens(),
        )?);
        Ok(Self::with_parts(config, session, gateway))
    }

    pub fn with_parts(
        config: CoffeeBarConfig,
        session: Arc<Session>,
        gateway: Arc<CoffeeGateway>,
    ) -> Self {
        let backend = Arc::new(GatewayBackend::new(
            gateway,
            Arc::clone(&session),
            config.identity.support_email.clone(),
        ));
        Self {
            config,
            session,
            backend,
        }
    }

    pub fn search_debounce(&self) -> Duration {
        Duration::from_millis(self.config.ui.search_debounce_ms)
    }
}

fn static_access_token() -> Option<String> {
    std::env::var(ENV_ACCESS_TOKEN)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
