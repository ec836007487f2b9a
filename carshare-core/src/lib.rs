pub mod models;
pub mod repository;
pub mod search;
pub mod payment;
pub mod notification;

pub use models::{Car, CarType, NewPayment, NewRental, Payment, PaymentStatus, PaymentType, Rental, User};

pub type UserId = i64;
pub type CarId = i64;
pub type RentalId = i64;
pub type PaymentId = i64;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    EntityNotFound(String),
    #[error("{0}")]
    NoAvailableCars(String),
    #[error("{0}")]
    RentalReturn(String),
    #[error("{0}")]
    Payment(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Payment provider error: {0}")]
    Provider(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

pub type CoreResult<T> = Result<T, CoreError>;

impl CoreError {
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    pub fn provider(err: impl std::fmt::Display) -> Self {
        Self::Provider(err.to_string())
    }

    pub fn no_available_cars(car_id: CarId) -> Self {
        Self::NoAvailableCars(format!("There are no available cars with car ID: {}", car_id))
    }
}
