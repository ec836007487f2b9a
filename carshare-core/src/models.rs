use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CarId, CoreError, PaymentId, RentalId, UserId};

/// Body style of a car model
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CarType {
    Sedan,
    Suv,
    Hatchback,
    Universal,
}

impl CarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CarType::Sedan => "SEDAN",
            CarType::Suv => "SUV",
            CarType::Hatchback => "HATCHBACK",
            CarType::Universal => "UNIVERSAL",
        }
    }
}

impl FromStr for CarType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEDAN" => Ok(CarType::Sedan),
            "SUV" => Ok(CarType::Suv),
            "HATCHBACK" => Ok(CarType::Hatchback),
            "UNIVERSAL" => Ok(CarType::Universal),
            other => Err(CoreError::Storage(format!("Unknown car type: {}", other))),
        }
    }
}

/// A car model with the number of units currently available to rent
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Car {
    pub id: CarId,
    pub model: String,
    pub brand: String,
    #[serde(rename = "type")]
    pub car_type: CarType,
    pub inventory: i32,
    pub daily_fee: Decimal,
}

impl Car {
    pub fn is_available(&self) -> bool {
        self.inventory >= 1
    }
}

/// Registered customer or manager, as seen by the rental core
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// A booking window for one unit of a car.
///
/// `actual_return_date == None` means the car is still out. Once set it is
/// never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Rental {
    pub id: RentalId,
    pub rental_date: NaiveDate,
    pub return_date: NaiveDate,
    pub actual_return_date: Option<NaiveDate>,
    pub user_id: UserId,
    pub car_id: CarId,
}

impl Rental {
    pub fn is_active(&self) -> bool {
        self.actual_return_date.is_none()
    }

    /// Planned return date reached without the car coming back
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.is_active() && self.return_date <= today
    }
}

/// Insert payload for a rental; the store assigns the id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRental {
    pub rental_date: NaiveDate,
    pub return_date: NaiveDate,
    pub user_id: UserId,
    pub car_id: CarId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "PAID" => Ok(PaymentStatus::Paid),
            other => Err(CoreError::Storage(format!("Unknown payment status: {}", other))),
        }
    }
}

/// Ordinary rental fee or overdue fine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    Payment,
    Fine,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Payment => "PAYMENT",
            PaymentType::Fine => "FINE",
        }
    }
}

impl FromStr for PaymentType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYMENT" => Ok(PaymentType::Payment),
            "FINE" => Ok(PaymentType::Fine),
            other => Err(CoreError::Storage(format!("Unknown payment type: {}", other))),
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checkout session issued for one rental
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub id: PaymentId,
    pub status: PaymentStatus,
    pub payment_type: PaymentType,
    pub rental_id: RentalId,
    pub session_id: String,
    pub session_url: String,
    pub amount: Decimal,
}

impl Payment {
    pub fn is_paid(&self) -> bool {
        self.status == PaymentStatus::Paid
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPayment {
    pub payment_type: PaymentType,
    pub rental_id: RentalId,
    pub session_id: String,
    pub session_url: String,
    pub amount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rental_overdue_window() {
        let mut rental = Rental {
            id: 1,
            rental_date: date(2024, 4, 5),
            return_date: date(2024, 4, 8),
            actual_return_date: None,
            user_id: 1,
            car_id: 2,
        };

        assert!(!rental.is_overdue(date(2024, 4, 7)));
        assert!(rental.is_overdue(date(2024, 4, 8)));
        assert!(rental.is_overdue(date(2024, 4, 20)));

        rental.actual_return_date = Some(date(2024, 4, 10));
        assert!(!rental.is_active());
        assert!(!rental.is_overdue(date(2024, 4, 20)));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&CarType::Hatchback).unwrap(), "\"HATCHBACK\"");
        assert_eq!(serde_json::to_string(&PaymentType::Fine).unwrap(), "\"FINE\"");
        assert_eq!("PAID".parse::<PaymentStatus>().unwrap(), PaymentStatus::Paid);
        assert_eq!("UNIVERSAL".parse::<CarType>().unwrap(), CarType::Universal);
        assert!("REFUNDED".parse::<PaymentStatus>().is_err());
    }
}
