use chrono::NaiveTime;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_seconds: u64,
}

fn default_max_connections() -> u32 { 5 }
fn default_acquire_timeout() -> u64 { 3 }

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentProviderKind {
    Stripe,
    Mock,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaymentsConfig {
    pub provider: PaymentProviderKind,
    pub stripe_secret_key: Option<String>,
    #[serde(default = "default_stripe_api_base")]
    pub stripe_api_base: String,
    /// Rental id is appended to both redirect urls
    pub success_url: String,
    pub cancel_url: String,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

fn default_stripe_api_base() -> String { "https://api.stripe.com".to_string() }
fn default_currency() -> String { "usd".to_string() }
fn default_provider_timeout() -> u64 { 10 }

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum NotificationSinkKind {
    #[default]
    Log,
    Telegram,
    Kafka,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub sink: NotificationSinkKind,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub telegram_api_base: Option<String>,
    pub kafka_brokers: Option<String>,
    pub kafka_topic: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_scheduler_enabled")]
    pub enabled: bool,
    #[serde(default = "default_overdue_check_time")]
    pub overdue_check_time: NaiveTime,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: default_scheduler_enabled(),
            overdue_check_time: default_overdue_check_time(),
        }
    }
}

fn default_scheduler_enabled() -> bool { true }

fn default_overdue_check_time() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN)
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // per-environment overrides, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // untracked developer overrides
            .add_source(config::File::with_name("config/local").required(false))
            // e.g. `CARSHARE_DATABASE__URL=postgres://...`
            .add_source(config::Environment::with_prefix("CARSHARE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_optional_sections() {
        let source = r#"
            [server]
            port = 8080

            [database]
            url = "postgres://localhost/carshare"

            [auth]
            jwt_secret = "secret"

            [payments]
            provider = "mock"
            success_url = "http://localhost:8080/payments/success?rental_id="
            cancel_url = "http://localhost:8080/payments/cancel?rental_id="
        "#;

        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(source, config::FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.payments.provider, PaymentProviderKind::Mock);
        assert_eq!(config.payments.currency, "usd");
        assert_eq!(config.notifications.sink, NotificationSinkKind::Log);
        assert!(config.scheduler.enabled);
        assert_eq!(
            config.scheduler.overdue_check_time,
            NaiveTime::from_hms_opt(9, 0, 0).unwrap()
        );
    }
}
