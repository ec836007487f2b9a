use std::sync::Arc;

use carshare_rental::{PaymentService, RentalService};

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub rentals: Arc<RentalService>,
    pub payments: Arc<PaymentService>,
    pub auth: AuthConfig,
}
