//! Configuration management.

use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub smtp: Option<SmtpConfig>,
    pub escalation: EscalationConfig,
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub server: String,
    pub username: String,
    pub password: String,
    pub from_address: String,
}

/// SLA windows for the escalation sweep, in hours from ticket creation.
/// One canonical table keyed by priority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub high_hours: i64,
    pub medium_hours: i64,
    pub low_hours: i64,
    /// Open tickets are scanned in pages of this size so a large backlog is
    /// never fully resident during a sweep.
    pub sweep_page_size: i64,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            high_hours: 24,
            medium_hours: 72,
            low_hours: 120,
            sweep_page_size: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        // SMTP is optional; without credentials the notifier degrades to
        // log-only delivery.
        let smtp = match (env::var("SMTP_USERNAME"), env::var("SMTP_PASSWORD")) {
            (Ok(username), Ok(password)) => Some(SmtpConfig {
                server: env::var("SMTP_SERVER").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                from_address: env::var("SMTP_FROM").unwrap_or_else(|_| username.clone()),
                username,
                password,
            }),
            _ => None,
        };

        Ok(Config {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .unwrap_or_else(|_| "postgresql://localhost:5432/complaints_db".to_string()),
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()?,
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()?,
                acquire_timeout_seconds: env::var("DATABASE_ACQUIRE_TIMEOUT_SECONDS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()?,
            },
            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .unwrap_or_else(|_| "change-me-complaint-ws-secret".to_string()),
            },
            smtp,
            escalation: EscalationConfig {
                high_hours: env::var("ESCALATION_HIGH_HOURS")
                    .unwrap_or_else(|_| "24".to_string())
                    .parse()?,
                medium_hours: env::var("ESCALATION_MEDIUM_HOURS")
                    .unwrap_or_else(|_| "72".to_string())
                    .parse()?,
                low_hours: env::var("ESCALATION_LOW_HOURS")
                    .unwrap_or_else(|_| "120".to_string())
                    .parse()?,
                sweep_page_size: env::var("ESCALATION_SWEEP_PAGE_SIZE")
                    .unwrap_or_else(|_| "200".to_string())
                    .parse()?,
            },
            app: AppConfig {
                environment: env::var("ENVIRONMENT")
                    .unwrap_or_else(|_| "development".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()?,
            },
        })
    }

    pub fn is_production(&self) -> bool {
        self.app.environment == "production"
    }
}
