//! Shared application state.

use std::sync::Arc;

use storefront_core::PricingConfig;
use storefront_db::{CheckoutService, Database};

use crate::auth::JwtManager;
use crate::config::AppConfig;

/// Cloned into every handler. Everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub pricing: PricingConfig,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(db: Database, config: AppConfig) -> Self {
        let jwt = JwtManager::new(config.auth.jwt_secret.clone(), config.auth.token_lifetime_secs);

        AppState {
            db,
            jwt: Arc::new(jwt),
            pricing: config.pricing(),
            config: Arc::new(config),
        }
    }

    pub fn checkout(&self) -> CheckoutService {
        self.db.checkout(self.pricing)
    }
}
