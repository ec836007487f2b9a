use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use carshare_core::notification::NotificationSink;
use carshare_core::payment::{CheckoutSession, PaymentProvider, SessionRequest, SessionStatus};
use carshare_core::repository::{
    CarRepository, PaymentRepository, RentalRepository, UserRepository,
};
use carshare_core::{CoreError, CoreResult, NewPayment, Payment, RentalId, User, UserId};

use crate::fees::{calculate_amount, to_minor_units};
use crate::messages::payment_message;
use crate::models::{CancelPaymentResponse, CreatePaymentSessionRequest, PaymentResponse};
use crate::notify::send_best_effort;

pub const PRODUCT_NAME: &str = "Car rental";
pub const PRODUCT_DESCRIPTION: &str = "Payment for rental of the car";
pub const CANCEL_MESSAGE: &str =
    "Payment was cancelled, but it can be made later (Session is available for 24 hours)";

/// Redirect targets and limits for provider checkout sessions
#[derive(Debug, Clone)]
pub struct CheckoutSettings {
    /// Rental id is appended, e.g. `http://host/payments/success?rental_id=`
    pub success_url: String,
    pub cancel_url: String,
    pub currency: String,
    pub provider_timeout: Duration,
}

impl CheckoutSettings {
    pub fn success_url_for(&self, rental_id: RentalId) -> String {
        format!("{}{}", self.success_url, rental_id)
    }

    pub fn cancel_url_for(&self, rental_id: RentalId) -> String {
        format!("{}{}", self.cancel_url, rental_id)
    }
}

/// Prices rentals and drives checkout sessions with the payment provider
pub struct PaymentService {
    users: Arc<dyn UserRepository>,
    cars: Arc<dyn CarRepository>,
    rentals: Arc<dyn RentalRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    notifier: Arc<dyn NotificationSink>,
    settings: CheckoutSettings,
}

impl PaymentService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        cars: Arc<dyn CarRepository>,
        rentals: Arc<dyn RentalRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        notifier: Arc<dyn NotificationSink>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            users,
            cars,
            rentals,
            payments,
            provider,
            notifier,
            settings,
        }
    }

    /// Opens a checkout session for the amount due and records it as PENDING.
    ///
    /// Nothing is persisted unless the provider issued a session. Of two
    /// concurrent requests for one rental only the first to persist succeeds;
    /// the other fails with `Payment`.
    #[tracing::instrument(skip(self))]
    pub async fn create_payment_session(
        &self,
        request: CreatePaymentSessionRequest,
    ) -> CoreResult<PaymentResponse> {
        let rental_id = request.rental_id;
        let lapsed = self.ensure_payable(rental_id).await?;

        let rental = self.rentals.find_rental(rental_id).await?.ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find rental with ID: {}", rental_id))
        })?;
        let car = self.cars.find_car(rental.car_id).await?.ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find car with id: {}", rental.car_id))
        })?;

        let amount = calculate_amount(
            rental.rental_date,
            rental.return_date,
            rental.actual_return_date,
            car.daily_fee,
            request.payment_type,
        )?;

        let session_request = SessionRequest {
            amount_minor_units: to_minor_units(amount)?,
            currency: self.settings.currency.clone(),
            product_name: PRODUCT_NAME.to_string(),
            product_description: PRODUCT_DESCRIPTION.to_string(),
            success_url: self.settings.success_url_for(rental_id),
            cancel_url: self.settings.cancel_url_for(rental_id),
        };
        let session = self
            .call_provider(self.provider.create_session(&session_request))
            .await?;

        let new_payment = NewPayment {
            payment_type: request.payment_type,
            rental_id,
            session_id: session.id,
            session_url: session.url,
            amount,
        };
        let payment = match lapsed {
            Some(previous) => self.payments.replace_pending(previous.id, new_payment).await?,
            None => self.payments.save_payment(new_payment).await?,
        };

        info!(
            "Payment session {} opened for rental {}: {} {}",
            payment.session_id, rental_id, payment.amount, request.payment_type
        );
        Ok(PaymentResponse::from(&payment))
    }

    /// Marks the rental's payment PAID once the provider reports the session
    /// complete. An already PAID payment is returned as is.
    #[tracing::instrument(skip(self))]
    pub async fn check_successful_payment(&self, rental_id: RentalId) -> CoreResult<PaymentResponse> {
        let payment = self.find_payment(rental_id).await?;

        if payment.is_paid() {
            return Ok(PaymentResponse::from(&payment));
        }

        let status = self
            .call_provider(self.provider.session_status(&payment.session_id))
            .await?;
        if status != SessionStatus::Complete {
            return Err(CoreError::Payment("Payment is not completed".to_string()));
        }

        match self.payments.mark_paid(payment.id).await? {
            Some(paid) => {
                info!("Payment {} for rental {} is PAID", paid.id, rental_id);
                let payer = self.payer_of(rental_id).await;
                send_best_effort(
                    self.notifier.as_ref(),
                    &payment_message(&paid, payer.as_ref(), Utc::now().naive_utc()),
                )
                .await;
                Ok(PaymentResponse::from(&paid))
            }
            None => {
                // confirmed concurrently
                let current = self.find_payment(rental_id).await?;
                Ok(PaymentResponse::from(&current))
            }
        }
    }

    /// The provider keeps a cancelled session usable for a while; nothing to
    /// change on our side.
    pub async fn cancel_payment(&self, rental_id: RentalId) -> CancelPaymentResponse {
        info!("Checkout cancelled for rental {}", rental_id);
        CancelPaymentResponse {
            message: CANCEL_MESSAGE.to_string(),
        }
    }

    pub async fn get_payments(&self, user_id: UserId) -> CoreResult<Vec<PaymentResponse>> {
        let rental_ids: Vec<RentalId> = self
            .rentals
            .find_all_by_user(user_id)
            .await?
            .iter()
            .map(|r| r.id)
            .collect();

        if rental_ids.is_empty() {
            return Ok(Vec::new());
        }

        let payments = self.payments.find_all_by_rentals(&rental_ids).await?;
        Ok(payments.iter().map(PaymentResponse::from).collect())
    }

    /// Rejects rentals that are paid or have a live session. Returns the
    /// PENDING payment to replace when its session has expired.
    async fn ensure_payable(&self, rental_id: RentalId) -> CoreResult<Option<Payment>> {
        let Some(existing) = self.payments.find_by_rental(rental_id).await? else {
            return Ok(None);
        };

        if existing.is_paid() {
            return Err(CoreError::Payment(format!(
                "Rental with ID: {} is already paid",
                rental_id
            )));
        }

        let status = self
            .call_provider(self.provider.session_status(&existing.session_id))
            .await?;
        match status {
            SessionStatus::Expired => Ok(Some(existing)),
            SessionStatus::Open | SessionStatus::Complete => Err(CoreError::Payment(format!(
                "Rental with ID: {} already has a payment session: {}",
                rental_id, existing.session_url
            ))),
        }
    }

    async fn find_payment(&self, rental_id: RentalId) -> CoreResult<Payment> {
        self.payments.find_by_rental(rental_id).await?.ok_or_else(|| {
            CoreError::EntityNotFound(format!("Can't find payment with rental ID: {}", rental_id))
        })
    }

    async fn payer_of(&self, rental_id: RentalId) -> Option<User> {
        match self.find_payer(rental_id).await {
            Ok(user) => user,
            Err(e) => {
                warn!("Can't resolve payer of rental {}: {}", rental_id, e);
                None
            }
        }
    }

    async fn find_payer(&self, rental_id: RentalId) -> CoreResult<Option<User>> {
        match self.rentals.find_rental(rental_id).await? {
            Some(rental) => self.users.find_user(rental.user_id).await,
            None => Ok(None),
        }
    }

    async fn call_provider<T>(&self, call: impl Future<Output = CoreResult<T>>) -> CoreResult<T> {
        match tokio::time::timeout(self.settings.provider_timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Payment provider call failed: {}", e);
                Err(e)
            }
            Err(_) => {
                error!(
                    "Payment provider call timed out after {:?}",
                    self.settings.provider_timeout
                );
                Err(CoreError::Provider("Payment provider timed out".to_string()))
            }
        }
    }
}

/// In-process provider for local runs and tests.
///
/// Sessions start `Open` unless built with [`MockPaymentProvider::auto_completing`].
#[derive(Debug, Default)]
pub struct MockPaymentProvider {
    sessions: Mutex<HashMap<String, SessionStatus>>,
    requests: Mutex<Vec<SessionRequest>>,
    next_id: AtomicU64,
    failing: AtomicBool,
    auto_complete: bool,
    latency: Option<Duration>,
}

impl MockPaymentProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every session reports `Complete` as soon as it is created
    pub fn auto_completing() -> Self {
        Self {
            auto_complete: true,
            ..Self::default()
        }
    }

    /// Every call sleeps for `latency` before answering
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::default()
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn complete(&self, session_id: &str) {
        self.set_status(session_id, SessionStatus::Complete);
    }

    pub fn expire(&self, session_id: &str) {
        self.set_status(session_id, SessionStatus::Expired);
    }

    pub fn requests(&self) -> Vec<SessionRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn set_status(&self, session_id: &str, status: SessionStatus) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(session_id.to_string(), status);
        }
    }

    async fn answer(&self) -> CoreResult<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(CoreError::Provider("Simulated payment provider failure".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<CheckoutSession> {
        self.answer().await?;

        let id = format!("cs_mock_{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        let status = if self.auto_complete {
            SessionStatus::Complete
        } else {
            SessionStatus::Open
        };
        self.set_status(&id, status);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        Ok(CheckoutSession {
            url: format!("https://checkout.mock/pay/{}", id),
            id,
        })
    }

    async fn session_status(&self, session_id: &str) -> CoreResult<SessionStatus> {
        self.answer().await?;

        self.sessions
            .lock()
            .ok()
            .and_then(|s| s.get(session_id).copied())
            .ok_or_else(|| CoreError::Provider(format!("No such checkout session: {}", session_id)))
    }
}
