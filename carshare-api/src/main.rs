use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use carshare_api::{app, worker, AppState, AuthConfig};
use carshare_core::notification::{LogNotifier, NotificationSink};
use carshare_core::payment::PaymentProvider;
use carshare_rental::{CheckoutSettings, MockPaymentProvider, OverdueSweep, PaymentService, RentalService};
use carshare_store::app_config::{
    Config, NotificationSinkKind, NotificationsConfig, PaymentProviderKind, PaymentsConfig,
};
use carshare_store::{
    DbClient, StoreCarRepository, StorePaymentRepository, StoreRentalRepository,
    StoreUserRepository, StripeClient, TelegramNotifier,
};

const NOTIFICATION_TIMEOUT: Duration = Duration::from_secs(10);

fn build_notifier(config: &NotificationsConfig) -> anyhow::Result<Arc<dyn NotificationSink>> {
    match config.sink {
        NotificationSinkKind::Log => Ok(Arc::new(LogNotifier)),
        NotificationSinkKind::Telegram => {
            let token = config
                .telegram_bot_token
                .as_deref()
                .context("notifications.telegram_bot_token is required for the telegram sink")?;
            let chat_id = config
                .telegram_chat_id
                .as_deref()
                .context("notifications.telegram_chat_id is required for the telegram sink")?;
            let notifier = TelegramNotifier::new(
                config.telegram_api_base.as_deref(),
                token,
                chat_id,
                NOTIFICATION_TIMEOUT,
            )?;
            Ok(Arc::new(notifier))
        }
        #[cfg(feature = "kafka")]
        NotificationSinkKind::Kafka => {
            let brokers = config
                .kafka_brokers
                .as_deref()
                .context("notifications.kafka_brokers is required for the kafka sink")?;
            let topic = config.kafka_topic.as_deref().unwrap_or("carshare.notifications");
            Ok(Arc::new(carshare_store::KafkaNotifier::new(brokers, topic)?))
        }
        #[cfg(not(feature = "kafka"))]
        NotificationSinkKind::Kafka => bail!("kafka sink requires building with the `kafka` feature"),
    }
}

fn build_provider(config: &PaymentsConfig) -> anyhow::Result<Arc<dyn PaymentProvider>> {
    match config.provider {
        PaymentProviderKind::Stripe => {
            let Some(key) = config.stripe_secret_key.as_deref() else {
                bail!("payments.stripe_secret_key is required for the stripe provider");
            };
            let client = StripeClient::new(
                &config.stripe_api_base,
                key,
                Duration::from_secs(config.timeout_seconds),
            )?;
            Ok(Arc::new(client))
        }
        PaymentProviderKind::Mock => {
            tracing::warn!("Using mock payment provider; sessions complete immediately");
            Ok(Arc::new(MockPaymentProvider::auto_completing()))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "carshare_api=debug,carshare_rental=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting Carshare API on port {}", config.server.port);

    let db = DbClient::new(&config.database)
        .await
        .context("Failed to connect to Postgres")?;
    db.migrate().await.context("Failed to run migrations")?;

    let users = Arc::new(StoreUserRepository::new(db.pool.clone()));
    let cars = Arc::new(StoreCarRepository::new(db.pool.clone()));
    let rentals = Arc::new(StoreRentalRepository::new(db.pool.clone()));
    let payments = Arc::new(StorePaymentRepository::new(db.pool.clone()));

    let notifier = build_notifier(&config.notifications)?;
    let provider = build_provider(&config.payments)?;

    let rental_service = Arc::new(RentalService::new(
        users.clone(),
        cars.clone(),
        rentals.clone(),
        notifier.clone(),
    ));
    let payment_service = Arc::new(PaymentService::new(
        users,
        cars,
        rentals,
        payments,
        provider,
        notifier.clone(),
        CheckoutSettings {
            success_url: config.payments.success_url.clone(),
            cancel_url: config.payments.cancel_url.clone(),
            currency: config.payments.currency.clone(),
            provider_timeout: Duration::from_secs(config.payments.timeout_seconds),
        },
    ));

    if config.scheduler.enabled {
        let sweep = Arc::new(OverdueSweep::new(rental_service.clone(), notifier));
        tokio::spawn(worker::start_overdue_worker(sweep, config.scheduler.overdue_check_time));
    }

    let app_state = AppState {
        rentals: rental_service,
        payments: payment_service,
        auth: AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    };

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
