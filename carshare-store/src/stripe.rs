use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error};

use carshare_core::payment::{CheckoutSession, PaymentProvider, SessionRequest, SessionStatus};
use carshare_core::{CoreError, CoreResult};

/// Stripe Checkout client speaking the form-encoded REST API
#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionObject {
    id: String,
    url: Option<String>,
    status: Option<SessionStatus>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

impl StripeClient {
    pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            secret_key: secret_key.to_string(),
        })
    }

    async fn read_session(&self, response: reqwest::Response) -> CoreResult<SessionObject> {
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or_else(|| status.to_string());
            error!("Stripe rejected the request ({}): {}", status, message);
            return Err(CoreError::Provider(message));
        }
        response.json::<SessionObject>().await.map_err(CoreError::provider)
    }
}

/// Form fields for a one-item card checkout
fn session_form(request: &SessionRequest) -> Vec<(&'static str, String)> {
    vec![
        ("mode", "payment".to_string()),
        ("payment_method_types[0]", "card".to_string()),
        ("success_url", request.success_url.clone()),
        ("cancel_url", request.cancel_url.clone()),
        ("line_items[0][quantity]", "1".to_string()),
        ("line_items[0][price_data][currency]", request.currency.clone()),
        (
            "line_items[0][price_data][unit_amount]",
            request.amount_minor_units.to_string(),
        ),
        (
            "line_items[0][price_data][product_data][name]",
            request.product_name.clone(),
        ),
        (
            "line_items[0][price_data][product_data][description]",
            request.product_description.clone(),
        ),
    ]
}

#[async_trait]
impl PaymentProvider for StripeClient {
    async fn create_session(&self, request: &SessionRequest) -> CoreResult<CheckoutSession> {
        let response = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&session_form(request))
            .send()
            .await
            .map_err(CoreError::provider)?;

        let session = self.read_session(response).await?;
        let url = session
            .url
            .ok_or_else(|| CoreError::Provider(format!("Session {} has no checkout url", session.id)))?;

        debug!("Stripe session {} created", session.id);
        Ok(CheckoutSession { id: session.id, url })
    }

    async fn session_status(&self, session_id: &str) -> CoreResult<SessionStatus> {
        let response = self
            .http
            .get(format!("{}/v1/checkout/sessions/{}", self.api_base, session_id))
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(CoreError::provider)?;

        let session = self.read_session(response).await?;
        session
            .status
            .ok_or_else(|| CoreError::Provider(format!("Session {} has no status", session.id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_form() {
        let request = SessionRequest {
            amount_minor_units: 11200,
            currency: "usd".to_string(),
            product_name: "Car rental".to_string(),
            product_description: "Payment for rental of the car".to_string(),
            success_url: "http://localhost/payments/success?rental_id=3".to_string(),
            cancel_url: "http://localhost/payments/cancel?rental_id=3".to_string(),
        };

        let form = session_form(&request);
        let field = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(field("mode"), Some("payment"));
        assert_eq!(field("payment_method_types[0]"), Some("card"));
        assert_eq!(field("line_items[0][quantity]"), Some("1"));
        assert_eq!(field("line_items[0][price_data][unit_amount]"), Some("11200"));
        assert_eq!(field("line_items[0][price_data][currency]"), Some("usd"));
        assert_eq!(
            field("success_url"),
            Some("http://localhost/payments/success?rental_id=3")
        );
    }

    #[test]
    fn test_session_object_status() {
        let json = r#"{"id":"cs_test_1","url":null,"status":"expired","object":"checkout.session"}"#;
        let session: SessionObject = serde_json::from_str(json).unwrap();
        assert_eq!(session.status, Some(SessionStatus::Expired));
        assert!(session.url.is_none());
    }
}
