//! Routing of verified webhook events.

use crate::error::PaymentError;
use crate::models::BookingStatus;
use crate::services::reconciler::BookingReconciler;
use crate::services::stripe::WebhookEvent;

/// Outcome of routing a verified event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A terminal payment event was reconciled into a booking.
    Reconciled,
    /// The event type carries no local side effect.
    Ignored,
}

#[derive(Clone)]
pub struct EventDispatcher {
    reconciler: BookingReconciler,
}

impl EventDispatcher {
    pub fn new(reconciler: BookingReconciler) -> Self {
        Self { reconciler }
    }

    /// Route an authenticated event by its declared type.
    ///
    /// Routing is total: unrecognized types are acknowledged without side
    /// effect so the provider does not retry-storm events this service does
    /// not handle.
    pub async fn dispatch(&self, event: &WebhookEvent) -> Result<DispatchOutcome, PaymentError> {
        match event.event_type.as_str() {
            "payment_intent.succeeded" => {
                tracing::info!(
                    event_id = %event.id,
                    intent_id = %event.data.object.id,
                    "Payment succeeded webhook received"
                );
                self.reconciler
                    .reconcile(&event.data.object, BookingStatus::Completed)
                    .await?;
                Ok(DispatchOutcome::Reconciled)
            }
            "payment_intent.payment_failed" => {
                tracing::info!(
                    event_id = %event.id,
                    intent_id = %event.data.object.id,
                    "Payment failed webhook received"
                );
                self.reconciler
                    .reconcile(&event.data.object, BookingStatus::Failed)
                    .await?;
                Ok(DispatchOutcome::Reconciled)
            }
            other => {
                tracing::debug!(event_type = %other, "Unhandled webhook event type");
                Ok(DispatchOutcome::Ignored)
            }
        }
    }
}
