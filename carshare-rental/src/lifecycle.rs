use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use carshare_core::notification::NotificationSink;
use carshare_core::repository::{CarRepository, RentalRepository, UserRepository};
use carshare_core::search::{RentalFilter, RentalSearchParameters};
use carshare_core::{Car, CarId, CoreError, CoreResult, NewRental, RentalId, User, UserId};

use crate::messages::{rental_message, RentalDetails, NEW_RENTAL_BOOKED};
use crate::models::{CreateRentalRequest, RentalResponse, ReturnRentalRequest};
use crate::notify::send_best_effort;

/// Books and returns cars, keeping inventory in step with active rentals
pub struct RentalService {
    users: Arc<dyn UserRepository>,
    cars: Arc<dyn CarRepository>,
    rentals: Arc<dyn RentalRepository>,
    notifier: Arc<dyn NotificationSink>,
}

impl RentalService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cars: Arc<dyn CarRepository>,
        rentals: Arc<dyn RentalRepository>,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            users,
            cars,
            rentals,
            notifier,
        }
    }

    /// Takes one unit of the car and records the booking.
    ///
    /// The notification is sent after the booking is committed; its failure
    /// is logged and does not affect the result.
    #[tracing::instrument(skip(self, request), fields(car_id = request.car_id))]
    pub async fn add_rental(
        &self,
        user_id: UserId,
        request: CreateRentalRequest,
    ) -> CoreResult<RentalResponse> {
        if request.return_date < request.rental_date {
            return Err(CoreError::Validation(
                "Return date can't be earlier than rental date".to_string(),
            ));
        }

        let user = self.find_user(user_id).await?;
        let car = self.find_car(request.car_id).await?;

        if !car.is_available() {
            return Err(CoreError::no_available_cars(car.id));
        }

        let (rental, car) = self
            .rentals
            .create_rental(NewRental {
                rental_date: request.rental_date,
                return_date: request.return_date,
                user_id: user.id,
                car_id: car.id,
            })
            .await?;

        info!(
            "Rental {} booked by user {}, {} unit(s) of car {} left",
            rental.id, user.id, car.inventory, car.id
        );

        let details = RentalDetails {
            rental,
            user: Some(user),
            car: Some(car),
        };
        send_best_effort(
            self.notifier.as_ref(),
            &rental_message(NEW_RENTAL_BOOKED, &details),
        )
        .await;

        Ok(RentalResponse::from(&details.rental))
    }

    /// Closes the customer's rental of the car and restocks one unit
    #[tracing::instrument(skip(self, request), fields(car_id = request.car_id))]
    pub async fn set_actual_return_date(
        &self,
        user_id: UserId,
        request: ReturnRentalRequest,
    ) -> CoreResult<RentalResponse> {
        let rental = self
            .rentals
            .find_by_user_and_car(user_id, request.car_id)
            .await?
            .ok_or_else(|| {
                CoreError::EntityNotFound(format!(
                    "Can't find rental with user id: {} and car id: {}",
                    user_id, request.car_id
                ))
            })?;

        if rental.actual_return_date.is_some() {
            return Err(CoreError::RentalReturn(
                "Rental cannot be returned twice".to_string(),
            ));
        }

        if request.actual_return_date < rental.rental_date {
            return Err(CoreError::Validation(
                "Actual return date can't be earlier than rental date".to_string(),
            ));
        }

        let rental = self
            .rentals
            .close_rental(rental.id, request.actual_return_date)
            .await?;

        info!("Rental {} returned on {}", rental.id, request.actual_return_date);
        Ok(RentalResponse::from(&rental))
    }

    pub async fn get_customer_rentals(&self, user_id: UserId) -> CoreResult<Vec<RentalResponse>> {
        let rentals = self.rentals.find_all_by_user(user_id).await?;
        Ok(rentals.iter().map(RentalResponse::from).collect())
    }

    pub async fn get_rental(&self, rental_id: RentalId) -> CoreResult<RentalResponse> {
        self.rentals
            .find_rental(rental_id)
            .await?
            .map(|r| RentalResponse::from(&r))
            .ok_or_else(|| {
                CoreError::EntityNotFound(format!("Can't find rental with id: {}", rental_id))
            })
    }

    pub async fn search_rentals(
        &self,
        params: &RentalSearchParameters,
    ) -> CoreResult<Vec<RentalResponse>> {
        let filter = RentalFilter::build(params);
        let rentals = self.rentals.search(&filter).await?;
        Ok(rentals.iter().map(RentalResponse::from).collect())
    }

    /// Overdue rentals with their customer and car, where those still resolve.
    ///
    /// Read-only. Every overdue rental is returned; a customer or car that
    /// can no longer be found is left as `None`.
    pub async fn overdue_rentals(&self, today: NaiveDate) -> CoreResult<Vec<RentalDetails>> {
        let overdue = self.rentals.find_overdue(today).await?;
        let mut details = Vec::with_capacity(overdue.len());

        for rental in overdue {
            let user = self.users.find_user(rental.user_id).await?;
            let car = self.cars.find_car(rental.car_id).await?;
            if user.is_none() || car.is_none() {
                warn!(
                    "Overdue rental {} references a missing user or car",
                    rental.id
                );
            }
            details.push(RentalDetails { rental, user, car });
        }

        Ok(details)
    }

    async fn find_user(&self, user_id: UserId) -> CoreResult<User> {
        self.users.find_user(user_id).await?.ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find user with id: {}", user_id))
        })
    }

    async fn find_car(&self, car_id: CarId) -> CoreResult<Car> {
        self.cars.find_car(car_id).await?.ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find car with id: {}", car_id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::RecordingNotifier;
    use carshare_core::CarType;
    use carshare_store::InMemoryStore;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    async fn seeded(inventory: i32) -> InMemoryStore {
        let store = InMemoryStore::new();
        store
            .insert_user(User {
                id: 1,
                email: "alice@example.com".to_string(),
                first_name: "Alice".to_string(),
                last_name: "Moss".to_string(),
            })
            .await;
        store
            .insert_user(User {
                id: 2,
                email: "bob@example.com".to_string(),
                first_name: "Bob".to_string(),
                last_name: "Stone".to_string(),
            })
            .await;
        store
            .insert_car(Car {
                id: 10,
                model: "Corolla".to_string(),
                brand: "Toyota".to_string(),
                car_type: CarType::Sedan,
                inventory,
                daily_fee: dec!(20),
            })
            .await;
        store
    }

    fn service(store: &InMemoryStore, notifier: Arc<RecordingNotifier>) -> RentalService {
        let store = Arc::new(store.clone());
        RentalService::new(store.clone(), store.clone(), store, notifier)
    }

    fn booking(car_id: CarId) -> CreateRentalRequest {
        CreateRentalRequest {
            rental_date: date(2024, 4, 5),
            return_date: date(2024, 4, 8),
            car_id,
        }
    }

    fn giving_back(car_id: CarId, day: u32) -> ReturnRentalRequest {
        ReturnRentalRequest {
            car_id,
            actual_return_date: date(2024, 4, day),
        }
    }

    #[tokio::test]
    async fn test_add_rental_takes_inventory_and_notifies() {
        let store = seeded(2).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let rentals = service(&store, notifier.clone());

        let response = rentals.add_rental(1, booking(10)).await.unwrap();

        assert_eq!(response.user_id, 1);
        assert_eq!(response.car_id, 10);
        assert_eq!(response.actual_return_date, None);
        assert_eq!(store.car(10).await.unwrap().inventory, 1);

        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("New rental booked:"));
        assert!(messages[0].contains("inventory left: 1"));
    }

    #[tokio::test]
    async fn test_add_rental_without_inventory() {
        let store = seeded(0).await;
        let notifier = Arc::new(RecordingNotifier::new());
        let rentals = service(&store, notifier.clone());

        let result = rentals.add_rental(1, booking(10)).await;

        assert!(matches!(result, Err(CoreError::NoAvailableCars(_))));
        assert_eq!(store.car(10).await.unwrap().inventory, 0);
        assert!(rentals.get_customer_rentals(1).await.unwrap().is_empty());
        assert!(notifier.messages().is_empty());
    }

    #[tokio::test]
    async fn test_add_rental_unknown_references() {
        let store = seeded(1).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        let missing_car = rentals.add_rental(1, booking(99)).await;
        assert!(matches!(missing_car, Err(CoreError::EntityNotFound(_))));

        let missing_user = rentals.add_rental(42, booking(10)).await;
        assert!(matches!(missing_user, Err(CoreError::EntityNotFound(_))));

        assert_eq!(store.car(10).await.unwrap().inventory, 1);
    }

    #[tokio::test]
    async fn test_add_rental_rejects_inverted_period() {
        let store = seeded(1).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        let request = CreateRentalRequest {
            rental_date: date(2024, 4, 8),
            return_date: date(2024, 4, 5),
            car_id: 10,
        };
        let result = rentals.add_rental(1, request).await;

        assert!(matches!(result, Err(CoreError::Validation(_))));
        assert_eq!(store.car(10).await.unwrap().inventory, 1);
    }

    #[tokio::test]
    async fn test_notification_failure_keeps_rental() {
        let store = seeded(1).await;
        let notifier = Arc::new(RecordingNotifier::failing());
        let rentals = service(&store, notifier.clone());

        let response = rentals.add_rental(1, booking(10)).await.unwrap();

        assert_eq!(notifier.messages().len(), 1);
        assert_eq!(store.car(10).await.unwrap().inventory, 0);
        assert_eq!(rentals.get_rental(response.rental_id).await.unwrap(), response);
    }

    #[tokio::test]
    async fn test_return_restocks_once() {
        let store = seeded(1).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        let booked = rentals.add_rental(1, booking(10)).await.unwrap();
        assert_eq!(store.car(10).await.unwrap().inventory, 0);

        let returned = rentals.set_actual_return_date(1, giving_back(10, 9)).await.unwrap();
        assert_eq!(returned.rental_id, booked.rental_id);
        assert_eq!(returned.actual_return_date, Some(date(2024, 4, 9)));
        assert_eq!(store.car(10).await.unwrap().inventory, 1);

        let again = rentals.set_actual_return_date(1, giving_back(10, 12)).await;
        assert!(matches!(again, Err(CoreError::RentalReturn(_))));

        let stored = rentals.get_rental(booked.rental_id).await.unwrap();
        assert_eq!(stored.actual_return_date, Some(date(2024, 4, 9)));
        assert_eq!(store.car(10).await.unwrap().inventory, 1);
    }

    #[tokio::test]
    async fn test_return_without_rental() {
        let store = seeded(1).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        let result = rentals.set_actual_return_date(1, giving_back(10, 9)).await;
        assert!(matches!(result, Err(CoreError::EntityNotFound(_))));

        rentals.add_rental(1, booking(10)).await.unwrap();
        let other_customer = rentals.set_actual_return_date(2, giving_back(10, 9)).await;
        assert!(matches!(other_customer, Err(CoreError::EntityNotFound(_))));
        assert_eq!(store.car(10).await.unwrap().inventory, 0);
    }

    #[tokio::test]
    async fn test_inventory_stays_within_capacity() {
        let capacity = 2;
        let store = seeded(capacity).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        for round in 0..3u32 {
            for user in [1, 2] {
                rentals.add_rental(user, booking(10)).await.unwrap();
                let inventory = store.car(10).await.unwrap().inventory;
                assert!((0..=capacity).contains(&inventory));
            }

            let exhausted = rentals.add_rental(1, booking(10)).await;
            assert!(matches!(exhausted, Err(CoreError::NoAvailableCars(_))));
            assert_eq!(store.car(10).await.unwrap().inventory, 0);

            for user in [1, 2] {
                rentals
                    .set_actual_return_date(user, giving_back(10, 10 + round))
                    .await
                    .unwrap();
                let inventory = store.car(10).await.unwrap().inventory;
                assert!((0..=capacity).contains(&inventory));
            }
            assert_eq!(store.car(10).await.unwrap().inventory, capacity);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_bookings_for_last_unit() {
        let store = seeded(1).await;
        let rentals = Arc::new(service(&store, Arc::new(RecordingNotifier::new())));

        let first = tokio::spawn({
            let rentals = rentals.clone();
            async move { rentals.add_rental(1, booking(10)).await }
        });
        let second = tokio::spawn({
            let rentals = rentals.clone();
            async move { rentals.add_rental(2, booking(10)).await }
        });

        let results = [first.await.unwrap(), second.await.unwrap()];
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let sold_out = results
            .iter()
            .filter(|r| matches!(r, Err(CoreError::NoAvailableCars(_))))
            .count();

        assert_eq!(successes, 1);
        assert_eq!(sold_out, 1);
        assert_eq!(store.car(10).await.unwrap().inventory, 0);
    }

    #[tokio::test]
    async fn test_search_composition() {
        let store = seeded(5).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        rentals.add_rental(1, booking(10)).await.unwrap();
        rentals.add_rental(2, booking(10)).await.unwrap();
        rentals.set_actual_return_date(2, giving_back(10, 8)).await.unwrap();
        rentals.add_rental(2, booking(10)).await.unwrap();

        let all = rentals
            .search_rentals(&RentalSearchParameters::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let active_of_bob = rentals
            .search_rentals(&RentalSearchParameters {
                user_ids: vec![2],
                is_active: Some(true),
            })
            .await
            .unwrap();
        assert_eq!(active_of_bob.len(), 1);
        assert!(active_of_bob.iter().all(|r| r.user_id == 2 && r.actual_return_date.is_none()));

        let returned = rentals
            .search_rentals(&RentalSearchParameters {
                user_ids: vec![],
                is_active: Some(false),
            })
            .await
            .unwrap();
        assert_eq!(returned.len(), 1);
        assert_eq!(returned[0].user_id, 2);
    }

    #[tokio::test]
    async fn test_get_rental_not_found() {
        let store = seeded(1).await;
        let rentals = service(&store, Arc::new(RecordingNotifier::new()));

        let result = rentals.get_rental(404).await;
        assert!(matches!(result, Err(CoreError::EntityNotFound(_))));
    }
}
