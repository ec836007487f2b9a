use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use carshare_core::{CarId, Payment, PaymentStatus, PaymentType, Rental, RentalId, UserId};

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateRentalRequest {
    pub rental_date: NaiveDate,
    pub return_date: NaiveDate,
    pub car_id: CarId,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReturnRentalRequest {
    pub car_id: CarId,
    pub actual_return_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreatePaymentSessionRequest {
    pub rental_id: RentalId,
    pub payment_type: PaymentType,
}

// ============================================================================
// Projections
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalResponse {
    pub rental_id: RentalId,
    pub rental_date: NaiveDate,
    pub return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub car_id: CarId,
    pub user_id: UserId,
}

impl From<&Rental> for RentalResponse {
    fn from(rental: &Rental) -> Self {
        Self {
            rental_id: rental.id,
            rental_date: rental.rental_date,
            return_date: rental.return_date,
            actual_return_date: rental.actual_return_date,
            car_id: rental.car_id,
            user_id: rental.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PaymentResponse {
    pub status: PaymentStatus,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub rental_id: RentalId,
    pub session_url: String,
    pub session_id: String,
    pub amount: Decimal,
}

impl From<&Payment> for PaymentResponse {
    fn from(payment: &Payment) -> Self {
        Self {
            status: payment.status,
            payment_type: payment.payment_type,
            rental_id: payment.rental_id,
            session_url: payment.session_url.clone(),
            session_id: payment.session_id.clone(),
            amount: payment.amount,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CancelPaymentResponse {
    pub message: String,
}
