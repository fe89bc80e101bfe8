//! Booking materialization from terminal payment events.

use crate::error::PaymentError;
use crate::models::{Booking, BookingDetails, BookingStatus, ItemType};
use crate::services::repository::BookingRepository;
use crate::services::stripe::PaymentIntent;
use mongodb::bson::DateTime;
use uuid::Uuid;

#[derive(Clone)]
pub struct BookingReconciler {
    repository: BookingRepository,
}

impl BookingReconciler {
    pub fn new(repository: BookingRepository) -> Self {
        Self { repository }
    }

    /// Turn a terminal payment event into a booking, idempotently keyed by
    /// the payment intent id. Processing the same event any number of times
    /// leaves the same stored state as processing it once.
    ///
    /// Metadata faults are data-integrity errors from intent-creation time,
    /// not transient ones; they surface as `MissingMetadata` and can never
    /// be fixed by redelivery.
    pub async fn reconcile(
        &self,
        intent: &PaymentIntent,
        status: BookingStatus,
    ) -> Result<Booking, PaymentError> {
        let user_id = require_metadata(intent, "userId")?;
        let item_type_raw = require_metadata(intent, "itemType")?;
        let item_type: ItemType = item_type_raw.parse().map_err(|_| {
            PaymentError::MissingMetadata(format!(
                "intent {} carries unknown itemType `{}`",
                intent.id, item_type_raw
            ))
        })?;
        let item_id = require_metadata(intent, "itemId")?;

        // The display-currency values were stashed in metadata at intent
        // creation; the event itself only carries the settlement charge.
        let (amount, currency) = match (
            intent
                .metadata
                .get("originalAmount")
                .and_then(|v| v.parse::<f64>().ok()),
            intent.metadata.get("originalCurrency"),
        ) {
            (Some(amount), Some(currency)) => (amount, currency.clone()),
            _ => {
                tracing::warn!(
                    intent_id = %intent.id,
                    "original amount metadata absent, falling back to settlement charge"
                );
                (intent.amount as f64 / 100.0, intent.currency.clone())
            }
        };

        let booking_details = BookingDetails::from_metadata(item_type, &intent.metadata);

        let now = DateTime::now();
        let booking = Booking {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            item_type,
            item_id: item_id.to_string(),
            payment_intent_id: intent.id.clone(),
            amount,
            currency,
            status,
            booking_details,
            created_at: now,
            updated_at: now,
        };

        let stored = self.repository.upsert_by_payment_intent(booking).await?;

        tracing::info!(
            booking_id = %stored.id,
            payment_intent_id = %intent.id,
            status = %stored.status,
            "Booking reconciled"
        );

        Ok(stored)
    }
}

fn require_metadata<'a>(intent: &'a PaymentIntent, key: &str) -> Result<&'a str, PaymentError> {
    intent
        .metadata
        .get(key)
        .map(String::as_str)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            PaymentError::MissingMetadata(format!(
                "intent {} missing metadata field `{}`",
                intent.id, key
            ))
        })
}
