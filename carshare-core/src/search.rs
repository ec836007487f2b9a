use serde::{Deserialize, Serialize};

use crate::models::Rental;
use crate::UserId;

/// Loose set of optional filters accepted by rental search
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RentalSearchParameters {
    #[serde(default)]
    pub user_ids: Vec<UserId>,
    pub is_active: Option<bool>,
}

/// One restriction on the rentals table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RentalCondition {
    UserIdIn(Vec<UserId>),
    /// `actual_return_date IS NULL`
    Active,
    /// `actual_return_date IS NOT NULL`
    Returned,
}

impl RentalCondition {
    pub fn matches(&self, rental: &Rental) -> bool {
        match self {
            RentalCondition::UserIdIn(ids) => ids.contains(&rental.user_id),
            RentalCondition::Active => rental.is_active(),
            RentalCondition::Returned => !rental.is_active(),
        }
    }
}

/// Conjunction of zero or more conditions. Empty matches every rental.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RentalFilter {
    conditions: Vec<RentalCondition>,
}

impl RentalFilter {
    pub fn build(params: &RentalSearchParameters) -> Self {
        let mut conditions = Vec::new();

        if !params.user_ids.is_empty() {
            conditions.push(RentalCondition::UserIdIn(params.user_ids.clone()));
        }

        match params.is_active {
            Some(true) => conditions.push(RentalCondition::Active),
            Some(false) => conditions.push(RentalCondition::Returned),
            None => {}
        }

        Self { conditions }
    }

    pub fn conditions(&self) -> &[RentalCondition] {
        &self.conditions
    }

    pub fn is_unrestricted(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn matches(&self, rental: &Rental) -> bool {
        self.conditions.iter().all(|c| c.matches(rental))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn rental(id: i64, user_id: UserId, returned: bool) -> Rental {
        let day = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        Rental {
            id,
            rental_date: day,
            return_date: day,
            actual_return_date: returned.then_some(day),
            user_id,
            car_id: 1,
        }
    }

    #[test]
    fn test_empty_parameters_match_everything() {
        let filter = RentalFilter::build(&RentalSearchParameters::default());
        assert!(filter.is_unrestricted());
        assert!(filter.matches(&rental(1, 1, false)));
        assert!(filter.matches(&rental(2, 7, true)));
    }

    #[test]
    fn test_user_and_activity_combine() {
        let filter = RentalFilter::build(&RentalSearchParameters {
            user_ids: vec![1, 3],
            is_active: Some(true),
        });

        assert_eq!(
            filter.conditions(),
            &[RentalCondition::UserIdIn(vec![1, 3]), RentalCondition::Active]
        );
        assert!(filter.matches(&rental(1, 1, false)));
        assert!(!filter.matches(&rental(2, 1, true)));
        assert!(!filter.matches(&rental(3, 2, false)));
    }

    #[test]
    fn test_inactive_only() {
        let filter = RentalFilter::build(&RentalSearchParameters {
            user_ids: vec![],
            is_active: Some(false),
        });

        assert_eq!(filter.conditions(), &[RentalCondition::Returned]);
        assert!(filter.matches(&rental(1, 4, true)));
        assert!(!filter.matches(&rental(2, 4, false)));
    }
}
