pub mod app_config;
pub mod database;
pub mod user_repo;
pub mod car_repo;
pub mod rental_repo;
pub mod payment_repo;
pub mod memory;
pub mod stripe;
pub mod telegram;
#[cfg(feature = "kafka")]
pub mod events;

pub use app_config::Config;
pub use database::DbClient;
pub use user_repo::StoreUserRepository;
pub use car_repo::StoreCarRepository;
pub use rental_repo::StoreRentalRepository;
pub use payment_repo::StorePaymentRepository;
pub use memory::InMemoryStore;
pub use stripe::StripeClient;
pub use telegram::TelegramNotifier;
#[cfg(feature = "kafka")]
pub use events::KafkaNotifier;
