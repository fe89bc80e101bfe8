use chrono::{DateTime as ChronoDateTime, NaiveDate, Utc};
use mongodb::bson::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// A booking owned by this system, keyed one-to-one to a payment intent.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Booking {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub item_type: ItemType,
    pub item_id: String,
    /// Gateway intent id. At most one booking exists per intent id; the
    /// store enforces this with a unique index plus upsert-on-conflict.
    pub payment_intent_id: String,
    /// Original display-currency value, not the settlement-currency charge.
    pub amount: f64,
    pub currency: String,
    pub status: BookingStatus,
    pub booking_details: BookingDetails,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

/// The closed set of bookable catalog entities.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Event,
    Trip,
    Hotel,
}

impl ItemType {
    /// Catalog collection holding entities of this type.
    pub fn collection_name(&self) -> &'static str {
        match self {
            ItemType::Event => "events",
            ItemType::Trip => "trips",
            ItemType::Hotel => "hotels",
        }
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "event" => Ok(ItemType::Event),
            "trip" => Ok(ItemType::Trip),
            "hotel" => Ok(ItemType::Hotel),
            other => Err(format!("unknown item type `{}`", other)),
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ItemType::Event => "event",
            ItemType::Trip => "trip",
            ItemType::Hotel => "hotel",
        };
        f.write_str(name)
    }
}

/// Booking lifecycle. `Pending` is the only non-terminal state.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Completed,
    Cancelled,
    Failed,
}

impl BookingStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    /// Transitions are only allowed out of `Pending`. `Cancelled` is only
    /// reachable through the explicit status-update route; webhooks drive
    /// `Completed` and `Failed`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(self, BookingStatus::Pending) && next != BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Item-specific booking attributes, keyed by the item type rather than a
/// flat bag of optional fields.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "itemType", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum BookingDetails {
    Event {
        #[serde(skip_serializing_if = "Option::is_none")]
        guests: Option<u32>,
    },
    Trip {
        #[serde(skip_serializing_if = "Option::is_none")]
        trip_date: Option<ChronoDateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        number_of_guests: Option<u32>,
    },
    Hotel {
        #[serde(skip_serializing_if = "Option::is_none")]
        check_in: Option<ChronoDateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        check_out: Option<ChronoDateTime<Utc>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        room_type: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        guests: Option<u32>,
    },
}

impl BookingDetails {
    /// Coerce string-encoded intent metadata back into typed detail fields.
    /// Absent fields stay absent; unparsable values are logged and dropped.
    pub fn from_metadata(item_type: ItemType, metadata: &HashMap<String, String>) -> Self {
        match item_type {
            ItemType::Event => BookingDetails::Event {
                guests: meta_u32(metadata, "guests"),
            },
            ItemType::Trip => BookingDetails::Trip {
                trip_date: meta_date(metadata, "tripDate"),
                number_of_guests: meta_u32(metadata, "numberOfGuests"),
            },
            ItemType::Hotel => BookingDetails::Hotel {
                check_in: meta_date(metadata, "checkIn"),
                check_out: meta_date(metadata, "checkOut"),
                room_type: metadata.get("roomType").cloned(),
                guests: meta_u32(metadata, "guests"),
            },
        }
    }
}

fn meta_u32(metadata: &HashMap<String, String>, key: &str) -> Option<u32> {
    let raw = metadata.get(key)?;
    match raw.parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(field = key, value = %raw, "unparsable integer in intent metadata");
            None
        }
    }
}

/// Accepts RFC 3339 timestamps and bare `YYYY-MM-DD` dates (midnight UTC).
fn meta_date(metadata: &HashMap<String, String>, key: &str) -> Option<ChronoDateTime<Utc>> {
    let raw = metadata.get(key)?;
    if let Ok(dt) = ChronoDateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date.and_hms_opt(0, 0, 0)?;
        return Some(ChronoDateTime::from_naive_utc_and_offset(midnight, Utc));
    }
    tracing::warn!(field = key, value = %raw, "unparsable date in intent metadata");
    None
}
