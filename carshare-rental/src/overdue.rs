use std::sync::Arc;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use tracing::info;

use carshare_core::notification::NotificationSink;
use carshare_core::CoreResult;

use crate::lifecycle::RentalService;
use crate::messages::{rental_message, NO_OVERDUE_RENTALS, OVERDUE_RENTAL};
use crate::notify::send_best_effort;

/// Outcome of one overdue check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub overdue: usize,
}

/// Daily check that reports every rental past its planned return date
pub struct OverdueSweep {
    rentals: Arc<RentalService>,
    notifier: Arc<dyn NotificationSink>,
}

impl OverdueSweep {
    pub fn new(rentals: Arc<RentalService>, notifier: Arc<dyn NotificationSink>) -> Self {
        Self { rentals, notifier }
    }

    /// Sends one message per overdue rental, or a single all-clear message.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, today: NaiveDate) -> CoreResult<SweepReport> {
        let overdue = self.rentals.overdue_rentals(today).await?;

        if overdue.is_empty() {
            send_best_effort(self.notifier.as_ref(), NO_OVERDUE_RENTALS).await;
        }
        for details in &overdue {
            send_best_effort(self.notifier.as_ref(), &rental_message(OVERDUE_RENTAL, details)).await;
        }

        info!("Overdue check for {}: {} rental(s)", today, overdue.len());
        Ok(SweepReport {
            overdue: overdue.len(),
        })
    }
}

/// First moment strictly after `now` whose wall-clock time is `at`
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}
