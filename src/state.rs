//! Shared application state: configuration, storage handles and the
//! long-lived services. Everything is injected here once at startup; no
//! process-wide globals.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::models::PointsCatalog;
use crate::services::{
    EscalationPolicy, EscalationService, LogNotifier, Notifier, RewardService, SmtpNotifier,
};
use crate::store::{FeedbackStore, PgStore, RewardStore, TicketStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub tickets: Arc<dyn TicketStore>,
    pub rewards: Arc<dyn RewardStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub notifier: Arc<dyn Notifier>,
    pub escalation: Arc<EscalationService>,
    pub reward_service: Arc<RewardService>,
}

impl AppState {
    pub async fn from_env() -> anyhow::Result<Self> {
        let config = Config::from_env()?;

        let store = Arc::new(PgStore::connect(&config.database).await?);
        info!("Connected to Postgres at {}", redact_url(&config.database.url));

        let notifier: Arc<dyn Notifier> = match &config.smtp {
            Some(smtp) => Arc::new(SmtpNotifier::new(smtp)?),
            None => {
                warn!("SMTP credentials not configured, notifications will be logged only");
                Arc::new(LogNotifier)
            }
        };

        Ok(Self::assemble(config, store.clone(), store.clone(), store, notifier))
    }

    /// Wire the services onto arbitrary store implementations. Tests use this
    /// with the in-memory store.
    pub fn assemble(
        config: Config,
        tickets: Arc<dyn TicketStore>,
        rewards: Arc<dyn RewardStore>,
        feedback: Arc<dyn FeedbackStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let escalation = Arc::new(EscalationService::new(
            Arc::clone(&tickets),
            Arc::clone(&rewards),
            Arc::clone(&notifier),
            EscalationPolicy::from(&config.escalation),
        ));
        let reward_service = Arc::new(RewardService::new(
            Arc::clone(&tickets),
            Arc::clone(&rewards),
            Arc::clone(&notifier),
            PointsCatalog::default(),
        ));

        Self {
            config: Arc::new(config),
            tickets,
            rewards,
            feedback,
            notifier,
            escalation,
            reward_service,
        }
    }
}

fn redact_url(url: &str) -> String {
    match url.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{host}"),
        None => url.to_string(),
    }
}
