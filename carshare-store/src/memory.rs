use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use carshare_core::repository::{
    CarRepository, PaymentRepository, RentalRepository, UserRepository,
};
use carshare_core::search::RentalFilter;
use carshare_core::{
    Car, CarId, CoreError, CoreResult, NewPayment, NewRental, Payment, PaymentId, PaymentStatus,
    Rental, RentalId, User, UserId,
};

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    cars: BTreeMap<CarId, Car>,
    rentals: BTreeMap<RentalId, Rental>,
    payments: BTreeMap<PaymentId, Payment>,
    next_rental_id: RentalId,
    next_payment_id: PaymentId,
}

impl State {
    fn next_rental_id(&mut self) -> RentalId {
        self.next_rental_id += 1;
        self.next_rental_id
    }

    fn next_payment_id(&mut self) -> PaymentId {
        self.next_payment_id += 1;
        self.next_payment_id
    }

    /// Mirrors `idx_payments_live_rental`: one live payment per rental
    fn ensure_no_live_payment(&self, rental_id: RentalId, ignoring: Option<PaymentId>) -> CoreResult<()> {
        let taken = self
            .payments
            .values()
            .any(|p| p.rental_id == rental_id && Some(p.id) != ignoring);
        if taken {
            return Err(CoreError::Payment(format!(
                "Rental with ID: {} already has a payment session",
                rental_id
            )));
        }
        Ok(())
    }

    fn insert_pending(&mut self, payment: NewPayment) -> Payment {
        let payment = Payment {
            id: self.next_payment_id(),
            status: PaymentStatus::Pending,
            payment_type: payment.payment_type,
            rental_id: payment.rental_id,
            session_id: payment.session_id,
            session_url: payment.session_url,
            amount: payment.amount,
        };
        self.payments.insert(payment.id, payment.clone());
        payment
    }
}

/// Thread-safe in-memory implementation of every repository.
///
/// All tables sit behind one async mutex, so each call observes and
/// leaves a consistent snapshot. Clones share the same state.
#[derive(Default, Clone)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_user(&self, user: User) {
        self.state.lock().await.users.insert(user.id, user);
    }

    pub async fn insert_car(&self, car: Car) {
        self.state.lock().await.cars.insert(car.id, car);
    }

    pub async fn car(&self, id: CarId) -> Option<Car> {
        self.state.lock().await.cars.get(&id).cloned()
    }

    /// Seeds a rental directly, bypassing inventory bookkeeping
    pub async fn insert_rental(&self, rental: NewRental, actual_return_date: Option<NaiveDate>) -> Rental {
        let mut state = self.state.lock().await;
        let rental = Rental {
            id: state.next_rental_id(),
            rental_date: rental.rental_date,
            return_date: rental.return_date,
            actual_return_date,
            user_id: rental.user_id,
            car_id: rental.car_id,
        };
        state.rentals.insert(rental.id, rental.clone());
        rental
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_user(&self, id: UserId) -> CoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }
}

#[async_trait]
impl CarRepository for InMemoryStore {
    async fn find_car(&self, id: CarId) -> CoreResult<Option<Car>> {
        Ok(self.car(id).await)
    }
}

#[async_trait]
impl RentalRepository for InMemoryStore {
    async fn create_rental(&self, rental: NewRental) -> CoreResult<(Rental, Car)> {
        let mut state = self.state.lock().await;

        let car = state.cars.get_mut(&rental.car_id).ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find car with id: {}", rental.car_id))
        })?;
        if car.inventory < 1 {
            return Err(CoreError::no_available_cars(rental.car_id));
        }
        car.inventory -= 1;
        let car = car.clone();

        let rental = Rental {
            id: state.next_rental_id(),
            rental_date: rental.rental_date,
            return_date: rental.return_date,
            actual_return_date: None,
            user_id: rental.user_id,
            car_id: rental.car_id,
        };
        state.rentals.insert(rental.id, rental.clone());

        Ok((rental, car))
    }

    async fn close_rental(&self, id: RentalId, actual_return_date: NaiveDate) -> CoreResult<Rental> {
        let mut state = self.state.lock().await;

        let rental = state
            .rentals
            .get_mut(&id)
            .ok_or_else(|| CoreError::EntityNotFound(format!("Can't find rental with id: {}", id)))?;
        if !rental.is_active() {
            return Err(CoreError::RentalReturn("Rental cannot be returned twice".to_string()));
        }
        rental.actual_return_date = Some(actual_return_date);
        let rental = rental.clone();

        if let Some(car) = state.cars.get_mut(&rental.car_id) {
            car.inventory += 1;
        }

        Ok(rental)
    }

    async fn find_rental(&self, id: RentalId) -> CoreResult<Option<Rental>> {
        Ok(self.state.lock().await.rentals.get(&id).cloned())
    }

    async fn find_by_user_and_car(&self, user_id: UserId, car_id: CarId) -> CoreResult<Option<Rental>> {
        let state = self.state.lock().await;
        let mut candidates = state
            .rentals
            .values()
            .filter(|r| r.user_id == user_id && r.car_id == car_id);

        // ids ascend, so the last match is the latest
        let found = candidates
            .clone()
            .find(|r| r.is_active())
            .or_else(|| candidates.next_back());
        Ok(found.cloned())
    }

    async fn find_all_by_user(&self, user_id: UserId) -> CoreResult<Vec<Rental>> {
        let state = self.state.lock().await;
        Ok(state
            .rentals
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn search(&self, filter: &RentalFilter) -> CoreResult<Vec<Rental>> {
        let state = self.state.lock().await;
        Ok(state
            .rentals
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect())
    }

    async fn find_overdue(&self, today: NaiveDate) -> CoreResult<Vec<Rental>> {
        let state = self.state.lock().await;
        let mut overdue: Vec<Rental> = state
            .rentals
            .values()
            .filter(|r| r.is_overdue(today))
            .cloned()
            .collect();
        overdue.sort_by_key(|r| (r.return_date, r.id));
        Ok(overdue)
    }
}

#[async_trait]
impl PaymentRepository for InMemoryStore {
    async fn save_payment(&self, payment: NewPayment) -> CoreResult<Payment> {
        let mut state = self.state.lock().await;
        state.ensure_no_live_payment(payment.rental_id, None)?;
        Ok(state.insert_pending(payment))
    }

    async fn find_by_rental(&self, rental_id: RentalId) -> CoreResult<Option<Payment>> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .filter(|p| p.rental_id == rental_id)
            .next_back()
            .cloned())
    }

    async fn find_all_by_rentals(&self, rental_ids: &[RentalId]) -> CoreResult<Vec<Payment>> {
        let state = self.state.lock().await;
        Ok(state
            .payments
            .values()
            .filter(|p| rental_ids.contains(&p.rental_id))
            .cloned()
            .collect())
    }

    async fn mark_paid(&self, id: PaymentId) -> CoreResult<Option<Payment>> {
        let mut state = self.state.lock().await;
        match state.payments.get_mut(&id) {
            Some(payment) if payment.status == PaymentStatus::Pending => {
                payment.status = PaymentStatus::Paid;
                Ok(Some(payment.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn replace_pending(&self, old_id: PaymentId, payment: NewPayment) -> CoreResult<Payment> {
        let mut state = self.state.lock().await;

        let still_pending = state
            .payments
            .get(&old_id)
            .is_some_and(|p| p.status == PaymentStatus::Pending);
        if !still_pending {
            return Err(CoreError::Payment(format!(
                "Payment with ID: {} is no longer pending",
                old_id
            )));
        }
        state.ensure_no_live_payment(payment.rental_id, Some(old_id))?;

        state.payments.remove(&old_id);
        Ok(state.insert_pending(payment))
    }
}
