use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::Store;
use crate::services::clock::Clock;
use crate::services::maintenance::MaintenanceGate;
use crate::services::notification::{Mailer, NotificationDispatcher};
use crate::services::otp_service::OtpService;
use crate::services::password::PasswordHasher;
use crate::services::token::TokenService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub hasher: PasswordHasher,
    pub tokens: TokenService,
    pub otp: Arc<OtpService>,
    pub notifications: NotificationDispatcher,
    pub maintenance: Arc<MaintenanceGate>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wire every service around one store and clock. Spawns the
    /// notification worker, so it must run inside a Tokio runtime.
    pub fn new(
        config: AppConfig,
        store: Store,
        mailer: Option<Arc<dyn Mailer>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self::with_hasher(config, store, mailer, clock, PasswordHasher::new())
    }

    pub fn with_hasher(
        config: AppConfig,
        store: Store,
        mailer: Option<Arc<dyn Mailer>>,
        clock: Arc<dyn Clock>,
        hasher: PasswordHasher,
    ) -> Self {
        let production = config.is_production();

        let notifications = NotificationDispatcher::spawn(mailer);
        let tokens = TokenService::new(&config.jwt_secret, clock.clone());
        let otp = OtpService::new(
            store.users.clone(),
            store.resets.clone(),
            hasher,
            notifications.clone(),
            clock.clone(),
            production,
        );
        let maintenance = MaintenanceGate::new(store.settings.clone(), clock.clone());

        AppState {
            config: Arc::new(config),
            store,
            hasher,
            tokens,
            otp: Arc::new(otp),
            notifications,
            maintenance: Arc::new(maintenance),
            clock,
        }
    }
}
