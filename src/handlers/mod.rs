use crate::{
    auth::JwtService,
    config::Config,
    database::UserStore,
    errors::{AppError, Result},
    services::{ImageRestorer, MetricsService, OrderVerifier},
    storage::LocalStorage,
};
use std::sync::Arc;

pub mod auth;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod restore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub restorer: Arc<dyn ImageRestorer>,
    /// Present when PayPal credentials allow server-side order checks.
    pub order_verifier: Option<Arc<dyn OrderVerifier>>,
    pub uploads: LocalStorage,
    pub jwt: JwtService,
    pub config: Config,
    pub metrics: Arc<MetricsService>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn UserStore>,
        restorer: Arc<dyn ImageRestorer>,
        order_verifier: Option<Arc<dyn OrderVerifier>>,
    ) -> Result<Self> {
        let uploads = LocalStorage::new(&config.upload_dir, &config.public_base_url)?;
        let jwt = JwtService::new(&config.jwt_secret, config.jwt_expiry_hours);
        let metrics = MetricsService::new().map_err(|e| AppError::Internal(e.into()))?;

        Ok(Self {
            store,
            restorer,
            order_verifier,
            uploads,
            jwt,
            config,
            metrics: Arc::new(metrics),
        })
    }
}
