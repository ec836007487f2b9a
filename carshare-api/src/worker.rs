use std::sync::Arc;

use chrono::{Local, NaiveTime};
use tokio::time::{sleep, Duration};
use tracing::{error, info};

use carshare_rental::{next_run_after, OverdueSweep};

/// Runs the overdue sweep every day at `at` local time. Never returns.
pub async fn start_overdue_worker(sweep: Arc<OverdueSweep>, at: NaiveTime) {
    info!("Overdue worker started, checking daily at {}", at);

    loop {
        let now = Local::now().naive_local();
        let next = next_run_after(now, at);
        let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
        sleep(wait).await;

        let today = Local::now().date_naive();
        match sweep.run(today).await {
            Ok(report) => info!("Overdue sweep finished: {} overdue rental(s)", report.overdue),
            Err(e) => error!("Overdue sweep failed: {}", e),
        }
    }
}
