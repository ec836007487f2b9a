use async_trait::async_trait;
use chrono::NaiveDate;

use crate::models::{Car, NewPayment, NewRental, Payment, Rental, User};
use crate::search::RentalFilter;
use crate::{CarId, CoreResult, PaymentId, RentalId, UserId};

/// Repository trait for registered users
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_user(&self, id: UserId) -> CoreResult<Option<User>>;
}

/// Repository trait for the car catalog (read side only)
#[async_trait]
pub trait CarRepository: Send + Sync {
    async fn find_car(&self, id: CarId) -> CoreResult<Option<Car>>;
}

/// Repository trait for rentals.
///
/// The two checkout methods are the only writers of `cars.inventory`. Each
/// must apply the inventory change and the rental change as one unit.
#[async_trait]
pub trait RentalRepository: Send + Sync {
    /// Locks the car, takes one unit of inventory and inserts the rental.
    ///
    /// Fails with `NoAvailableCars` when the locked row shows no inventory,
    /// leaving both tables untouched. Returns the rental together with the
    /// car as it stands after the decrement.
    async fn create_rental(&self, rental: NewRental) -> CoreResult<(Rental, Car)>;

    /// Stamps the actual return date and puts the unit back into inventory.
    ///
    /// Fails with `RentalReturn` if the rental was already closed.
    async fn close_rental(&self, id: RentalId, actual_return_date: NaiveDate) -> CoreResult<Rental>;

    async fn find_rental(&self, id: RentalId) -> CoreResult<Option<Rental>>;

    /// Most relevant rental of `car_id` by `user_id`: the active one if any,
    /// otherwise the latest returned one.
    async fn find_by_user_and_car(&self, user_id: UserId, car_id: CarId) -> CoreResult<Option<Rental>>;

    async fn find_all_by_user(&self, user_id: UserId) -> CoreResult<Vec<Rental>>;

    async fn search(&self, filter: &RentalFilter) -> CoreResult<Vec<Rental>>;

    /// Active rentals whose planned return date is on or before `today`
    async fn find_overdue(&self, today: NaiveDate) -> CoreResult<Vec<Rental>>;
}

/// Repository trait for payment sessions
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Persists a new PENDING payment.
    ///
    /// A rental holds at most one live payment; fails with `Payment` when
    /// one already exists.
    async fn save_payment(&self, payment: NewPayment) -> CoreResult<Payment>;

    /// Latest payment recorded for the rental
    async fn find_by_rental(&self, rental_id: RentalId) -> CoreResult<Option<Payment>>;

    async fn find_all_by_rentals(&self, rental_ids: &[RentalId]) -> CoreResult<Vec<Payment>>;

    /// PENDING → PAID. Returns `None` when the payment was not PENDING, so
    /// concurrent confirmations observe exactly one transition.
    async fn mark_paid(&self, id: PaymentId) -> CoreResult<Option<Payment>>;

    /// Soft-deletes the PENDING payment `old_id` and persists `payment` in its
    /// place as one unit. Fails with `Payment`, changing nothing, when `old_id`
    /// is no longer PENDING or the insert is rejected.
    async fn replace_pending(&self, old_id: PaymentId, payment: NewPayment) -> CoreResult<Payment>;
}
