use std::fmt::Write;

use chrono::NaiveDateTime;

use carshare_core::{Car, Payment, Rental, User};

pub const NEW_RENTAL_BOOKED: &str = "New rental booked:";
pub const OVERDUE_RENTAL: &str = "Overdue rental:";
pub const NO_OVERDUE_RENTALS: &str = "No rentals overdue today!";
pub const PAYMENT_SUCCESSFUL: &str = "Payment Successful!";

/// Rental with the customer and car it references, as rendered in messages.
///
/// Rentals outlive their customer and car; a reference that no longer
/// resolves is `None` and rendered from the rental's own ids.
#[derive(Debug, Clone)]
pub struct RentalDetails {
    pub rental: Rental,
    pub user: Option<User>,
    pub car: Option<Car>,
}

const INDENT: &str = "         ";

pub fn rental_message(header: &str, details: &RentalDetails) -> String {
    let RentalDetails { rental, user, car } = details;
    let mut message = format!("{header}\n{INDENT}id: {}\n", rental.id);

    message.push_str("\n 1. Customer:");
    match user {
        Some(user) => {
            let _ = write!(
                message,
                "\n{INDENT}id: {}\n{INDENT}name: {}\n{INDENT}email: {}",
                user.id,
                user.full_name(),
                user.email
            );
        }
        None => {
            let _ = write!(message, "\n{INDENT}id: {}\n{INDENT}(no longer available)", rental.user_id);
        }
    }

    message.push_str("\n\n 2. Car:");
    match car {
        Some(car) => {
            let _ = write!(
                message,
                "\n{INDENT}id: {}\n{INDENT}brand: {}\n{INDENT}model: {}\n{INDENT}daily fee: {}\n{INDENT}inventory left: {}",
                car.id, car.brand, car.model, car.daily_fee, car.inventory
            );
        }
        None => {
            let _ = write!(message, "\n{INDENT}id: {}\n{INDENT}(no longer available)", rental.car_id);
        }
    }

    let _ = write!(
        message,
        "\n\n 3. Period:\n{INDENT}rental date: {}\n{INDENT}return date: {}\n",
        rental.rental_date, rental.return_date
    );
    message
}

pub fn payment_message(payment: &Payment, payer: Option<&User>, at: NaiveDateTime) -> String {
    let mut message = format!(
        "{PAYMENT_SUCCESSFUL}\n\nAmount: ${}\nDate: {}\nPayment ID: {}",
        payment.amount,
        at.format("%Y-%m-%d %H:%M:%S"),
        payment.id,
    );
    if let Some(user) = payer {
        message.push_str(&format!(
            "\nCustomer ID: {}\nCustomer Name: {}",
            user.id,
            user.full_name()
        ));
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use carshare_core::{CarType, PaymentStatus, PaymentType};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn details() -> RentalDetails {
        let day = |d| NaiveDate::from_ymd_opt(2024, 4, d).unwrap();
        RentalDetails {
            rental: Rental {
                id: 9,
                rental_date: day(5),
                return_date: day(8),
                actual_return_date: None,
                user_id: 3,
                car_id: 2,
            },
            user: Some(User {
                id: 3,
                email: "bob@example.com".to_string(),
                first_name: "Bob".to_string(),
                last_name: "Stone".to_string(),
            }),
            car: Some(Car {
                id: 2,
                model: "Model S".to_string(),
                brand: "Tesla".to_string(),
                car_type: CarType::Sedan,
                inventory: 4,
                daily_fee: dec!(20),
            }),
        }
    }

    #[test]
    fn test_rental_message_lists_customer_car_and_period() {
        let message = rental_message(NEW_RENTAL_BOOKED, &details());

        assert!(message.starts_with("New rental booked:\n         id: 9\n"));
        assert!(message.contains("name: Bob Stone"));
        assert!(message.contains("email: bob@example.com"));
        assert!(message.contains("brand: Tesla"));
        assert!(message.contains("inventory left: 4"));
        assert!(message.contains("rental date: 2024-04-05"));
        assert!(message.contains("return date: 2024-04-08"));
    }

    #[test]
    fn test_rental_message_for_unresolved_references() {
        let mut details = details();
        details.user = None;
        details.car = None;

        let message = rental_message(OVERDUE_RENTAL, &details);

        assert!(message.starts_with("Overdue rental:\n         id: 9\n"));
        assert!(message.contains(" 1. Customer:\n         id: 3\n         (no longer available)"));
        assert!(message.contains(" 2. Car:\n         id: 2\n         (no longer available)"));
        assert!(message.contains("return date: 2024-04-08"));
    }

    #[test]
    fn test_payment_message() {
        let payment = Payment {
            id: 5,
            status: PaymentStatus::Paid,
            payment_type: PaymentType::Payment,
            rental_id: 9,
            session_id: "cs_1".to_string(),
            session_url: "https://pay/cs_1".to_string(),
            amount: dec!(60),
        };
        let at = NaiveDate::from_ymd_opt(2024, 4, 9)
            .unwrap()
            .and_hms_opt(10, 30, 0)
            .unwrap();
        let user = details().user.unwrap();

        let message = payment_message(&payment, Some(&user), at);
        assert_eq!(
            message,
            "Payment Successful!\n\nAmount: $60\nDate: 2024-04-09 10:30:00\nPayment ID: 5\nCustomer ID: 3\nCustomer Name: Bob Stone"
        );

        let anonymous = payment_message(&payment, None, at);
        assert!(!anonymous.contains("Customer"));
    }
}
