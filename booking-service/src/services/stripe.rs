//! Stripe payment provider client.
//!
//! Implements the Payment Intents API for charge authorization and webhook
//! signature verification for event authenticity. The client performs no
//! retries; callers decide.

use crate::config::StripeConfig;
use crate::error::PaymentError;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::collections::HashMap;
use std::time::Duration;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Stripe client for the subset of the API this service uses.
#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    config: StripeConfig,
}

/// Snapshot of a provider-owned payment intent. Created here, mutated only
/// by the gateway, read-only afterwards.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentIntent {
    pub id: String,
    /// Settlement amount in minor units (cents).
    pub amount: u64,
    /// Settlement currency code.
    pub currency: String,
    /// Provider-side status string, passed through untouched.
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// Stripe API error envelope.
#[derive(Debug, Deserialize)]
struct StripeErrorEnvelope {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    error_type: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// Webhook event as delivered by Stripe.
#[derive(Debug, Deserialize, Clone)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
    pub created: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WebhookEventData {
    pub object: PaymentIntent,
}

impl StripeClient {
    pub fn new(config: StripeConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    /// Check if Stripe is configured (credentials are set).
    pub fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
            && !self.config.webhook_secret.expose_secret().is_empty()
    }

    pub fn publishable_key(&self) -> &str {
        &self.config.publishable_key
    }

    fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_seconds)
    }

    /// Create a payment intent for a settlement-currency charge.
    ///
    /// Metadata rides along on the intent and comes back verbatim on every
    /// webhook event for it.
    pub async fn create_payment_intent(
        &self,
        amount: u64,
        currency: &str,
        metadata: &HashMap<String, String>,
    ) -> Result<PaymentIntent, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::Gateway(
                "Stripe credentials not configured".to_string(),
            ));
        }

        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), amount.to_string()),
            ("currency".to_string(), currency.to_string()),
            ("payment_method_types[]".to_string(), "card".to_string()),
        ];
        for (key, value) in metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        let url = format!("{}/payment_intents", self.config.api_base_url);

        let response = self
            .client
            .post(&url)
            .timeout(self.request_timeout())
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        tracing::debug!(status = %status, "Stripe create_payment_intent response");

        if status.is_success() {
            let intent: PaymentIntent = serde_json::from_str(&body)
                .map_err(|e| PaymentError::Gateway(format!("unreadable intent response: {}", e)))?;
            tracing::info!(
                intent_id = %intent.id,
                amount = intent.amount,
                currency = %intent.currency,
                "Payment intent created"
            );
            Ok(intent)
        } else {
            let message = error_message(&body);
            tracing::error!(status = %status, error = %message, "Payment intent creation failed");
            Err(PaymentError::Gateway(message))
        }
    }

    /// Fetch an intent snapshot by id. Provider-side 404 maps to
    /// `IntentNotFound` so callers can distinguish it from other failures.
    pub async fn get_payment_intent(&self, intent_id: &str) -> Result<PaymentIntent, PaymentError> {
        if !self.is_configured() {
            return Err(PaymentError::Gateway(
                "Stripe credentials not configured".to_string(),
            ));
        }

        let url = format!("{}/payment_intents/{}", self.config.api_base_url, intent_id);

        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout())
            .bearer_auth(self.config.secret_key.expose_secret())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::IntentNotFound);
        }
        if !status.is_success() {
            return Err(PaymentError::Gateway(error_message(&body)));
        }

        serde_json::from_str(&body)
            .map_err(|e| PaymentError::Gateway(format!("unreadable intent response: {}", e)))
    }

    /// Verify a webhook signature header of the form `t=<unix>,v1=<hex>`.
    ///
    /// The HMAC is computed over the raw request bytes; parsing the payload
    /// happens only after verification succeeds. The `t=` timestamp must be
    /// within the configured tolerance window of server time.
    pub fn verify_webhook_signature(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<(), PaymentError> {
        let (timestamp, signature) = parse_signature_header(signature_header)?;

        let now = chrono::Utc::now().timestamp();
        if (now - timestamp).abs() > self.config.webhook_tolerance_seconds {
            return Err(PaymentError::SignatureVerification(
                "timestamp outside tolerance window".to_string(),
            ));
        }

        let expected = self.compute_webhook_signature(payload, timestamp)?;
        let expected_bytes = expected.as_bytes();
        let signature_bytes = signature.as_bytes();

        if expected_bytes.len() != signature_bytes.len()
            || !bool::from(expected_bytes.ct_eq(signature_bytes))
        {
            return Err(PaymentError::SignatureVerification(
                "signature mismatch".to_string(),
            ));
        }

        Ok(())
    }

    /// Parse a verified webhook payload.
    pub fn parse_webhook_event(&self, payload: &[u8]) -> Result<WebhookEvent, PaymentError> {
        Ok(serde_json::from_slice(payload)?)
    }

    fn compute_webhook_signature(
        &self,
        payload: &[u8],
        timestamp: i64,
    ) -> Result<String, PaymentError> {
        let mut mac =
            HmacSha256::new_from_slice(self.config.webhook_secret.expose_secret().as_bytes())
                .map_err(|_| {
                    PaymentError::SignatureVerification("invalid webhook secret".to_string())
                })?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

fn error_message(body: &str) -> String {
    match serde_json::from_str::<StripeErrorEnvelope>(body) {
        Ok(envelope) => {
            let detail = envelope.error;
            detail.message.unwrap_or_else(|| {
                format!(
                    "{} ({})",
                    detail.error_type.unwrap_or_else(|| "unknown".to_string()),
                    detail.code.unwrap_or_else(|| "-".to_string()),
                )
            })
        }
        Err(_) => body.to_string(),
    }
}

fn parse_signature_header(header: &str) -> Result<(i64, String), PaymentError> {
    let mut timestamp = None;
    let mut signature = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
            Some(("v1", value)) => signature = Some(value.to_string()),
            _ => {}
        }
    }

    match (timestamp, signature) {
        (Some(timestamp), Some(signature)) => Ok((timestamp, signature)),
        _ => Err(PaymentError::SignatureVerification(
            "malformed signature header".to_string(),
        )),
    }
}
