//! Payment intent and webhook handlers.
//!
//! Intent creation normalizes the display amount into the settlement
//! currency and stashes the originals in intent metadata. The webhook
//! endpoint authenticates deliveries by signature, routes them through the
//! dispatcher, and bifurcates failures: structural metadata faults are
//! acknowledged (redelivery can never fix them), store faults are not (the
//! provider redelivers).

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};

use crate::{
    dtos::{
        CreatePaymentIntentRequest, CreatePaymentIntentResponse, PublishableKeyResponse,
        WebhookAck,
    },
    error::PaymentError,
    middleware::AuthUser,
    models::ItemType,
    services::currency::DisplayCurrency,
    services::stripe::PaymentIntent,
    AppState,
};

pub async fn create_payment_intent(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<(StatusCode, Json<CreatePaymentIntentResponse>), PaymentError> {
    let amount = payload
        .amount
        .ok_or_else(|| PaymentError::Validation("Amount is required".to_string()))?;
    if amount <= 0.0 {
        return Err(PaymentError::Validation(
            "Amount must be positive".to_string(),
        ));
    }

    let currency: DisplayCurrency = payload
        .currency
        .parse()
        .map_err(|_| PaymentError::Validation(format!("Unsupported currency `{}`", payload.currency)))?;

    let item_type = payload
        .metadata
        .get("itemType")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::Validation("itemType is required in metadata".to_string()))?;
    item_type.parse::<ItemType>().map_err(|_| {
        PaymentError::Validation(format!("Unknown itemType `{}`", item_type))
    })?;
    payload
        .metadata
        .get("itemId")
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PaymentError::Validation("itemId is required in metadata".to_string()))?;

    let normalized = state.currency.normalize(amount, currency)?;

    // Stash the display-currency values and the caller identity so a
    // webhook can rebuild the booking without trusting the client again.
    let mut metadata = payload.metadata.clone();
    metadata.insert("userId".to_string(), claims.sub.clone());
    metadata.insert(
        "originalAmount".to_string(),
        normalized.original_amount.to_string(),
    );
    metadata.insert(
        "originalCurrency".to_string(),
        normalized.original_currency.to_string(),
    );

    tracing::info!(
        user_id = %claims.sub,
        amount = normalized.original_amount,
        currency = %normalized.original_currency,
        settlement_amount = normalized.settlement_amount_minor,
        "Creating payment intent"
    );

    let intent = state
        .stripe
        .create_payment_intent(
            normalized.settlement_amount_minor,
            normalized.settlement_currency,
            &metadata,
        )
        .await?;

    let client_secret = intent.client_secret.clone().ok_or_else(|| {
        PaymentError::Gateway("intent response missing client_secret".to_string())
    })?;

    Ok((
        StatusCode::CREATED,
        Json(CreatePaymentIntentResponse {
            client_secret,
            payment_intent_id: intent.id,
            original_amount: normalized.original_amount,
            original_currency: normalized.original_currency.to_string(),
            settlement_amount: normalized.settlement_amount_minor,
            settlement_currency: normalized.settlement_currency.to_string(),
        }),
    ))
}

/// Retrieve a payment intent snapshot from the gateway.
pub async fn get_payment_intent(
    State(state): State<AppState>,
    AuthUser(_claims): AuthUser,
    Path(intent_id): Path<String>,
) -> Result<Json<PaymentIntent>, PaymentError> {
    let intent = state.stripe.get_payment_intent(&intent_id).await?;
    Ok(Json(intent))
}

/// Gateway public key for client-side checkout initialization.
pub async fn publishable_key(State(state): State<AppState>) -> Json<PublishableKeyResponse> {
    Json(PublishableKeyResponse {
        publishable_key: state.stripe.publishable_key().to_string(),
    })
}

/// Webhook endpoint for asynchronous payment events.
///
/// Deliveries are at-least-once and unordered; authenticity comes from the
/// signature over the raw body, never from bearer auth.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, PaymentError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Missing Stripe-Signature header");
            PaymentError::SignatureVerification("missing Stripe-Signature header".to_string())
        })?;

    // Verification runs over the raw request bytes; parsing happens after.
    if let Err(err) = state.stripe.verify_webhook_signature(&body, signature) {
        tracing::warn!(error = %err, "Rejected webhook with invalid signature");
        return Err(err);
    }

    let event = state.stripe.parse_webhook_event(&body)?;

    tracing::info!(
        event_id = %event.id,
        event_type = %event.event_type,
        "Processing webhook event"
    );

    match state.dispatcher.dispatch(&event).await {
        Ok(_) => Ok(Json(WebhookAck { received: true })),
        // Structurally broken metadata can never be fixed by redelivery:
        // acknowledge so the provider stops retrying, keep the fault in logs.
        Err(PaymentError::MissingMetadata(detail)) => {
            tracing::error!(
                event_id = %event.id,
                detail = %detail,
                "Discarding event with unusable metadata"
            );
            Ok(Json(WebhookAck { received: true }))
        }
        Err(err) => Err(err),
    }
}
