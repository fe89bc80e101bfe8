use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use validator::Validate;

use crate::models::{Booking, BookingDetails, BookingStatus, ItemType};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<f64>,
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Must carry `itemType` and `itemId`; item-specific attributes ride
    /// along and come back on the webhook.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

fn default_currency() -> String {
    "rwf".to_string()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub original_amount: f64,
    pub original_currency: String,
    pub settlement_amount: u64,
    pub settlement_currency: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishableKeyResponse {
    pub publishable_key: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Explicit booking creation, used when a client records a `pending`
/// booking ahead of payment confirmation.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub item_type: ItemType,
    #[validate(length(min = 1))]
    pub item_id: String,
    #[validate(length(min = 1))]
    pub payment_intent_id: String,
    #[validate(range(min = 0.01))]
    pub amount: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub booking_details: BookingDetailsInput,
}

/// Flat, all-optional detail fields as clients submit them; narrowed into
/// the typed union by the declared item type.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingDetailsInput {
    pub guests: Option<u32>,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub room_type: Option<String>,
    pub trip_date: Option<DateTime<Utc>>,
    pub number_of_guests: Option<u32>,
}

impl BookingDetailsInput {
    pub fn into_details(self, item_type: ItemType) -> BookingDetails {
        match item_type {
            ItemType::Event => BookingDetails::Event {
                guests: self.guests,
            },
            ItemType::Trip => BookingDetails::Trip {
                trip_date: self.trip_date,
                number_of_guests: self.number_of_guests,
            },
            ItemType::Hotel => BookingDetails::Hotel {
                check_in: self.check_in,
                check_out: self.check_out,
                room_type: self.room_type,
                guests: self.guests,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: String,
    pub user_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    pub payment_intent_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: BookingStatus,
    pub booking_details: BookingDetails,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Booking> for BookingResponse {
    fn from(booking: Booking) -> Self {
        Self {
            id: booking.id,
            user_id: booking.user_id,
            item_type: booking.item_type,
            item_id: booking.item_id,
            payment_intent_id: booking.payment_intent_id,
            amount: booking.amount,
            currency: booking.currency,
            status: booking.status,
            booking_details: booking.booking_details,
            created_at: booking
                .created_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
            updated_at: booking
                .updated_at
                .try_to_rfc3339_string()
                .unwrap_or_default(),
        }
    }
}
