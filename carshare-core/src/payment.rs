use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::CoreResult;

/// Everything the provider needs to open a hosted checkout page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    /// Amount in minor currency units (cents)
    pub amount_minor_units: i64,
    pub currency: String,
    pub product_name: String,
    pub product_description: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Open,
    Complete,
    Expired,
}

/// Opaque session-creation/retrieval API of a payment provider.
///
/// Every error returned here is fatal for the calling operation.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<CheckoutSession>;

    async fn session_status(&self, session_id: &str) -> CoreResult<SessionStatus>;
}
