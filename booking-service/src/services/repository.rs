use crate::models::{Booking, BookingStatus, ItemType};
use futures::TryStreamExt;
use mongodb::bson::{doc, oid::ObjectId, to_bson, to_document, Bson, DateTime, Document};
use mongodb::error::{Error, ErrorKind, WriteFailure};
use mongodb::options::{FindOptions, IndexOptions, UpdateOptions};
use mongodb::{Collection, Database, IndexModel};

#[derive(Clone)]
pub struct BookingRepository {
    booking_collection: Collection<Booking>,
    db: Database,
}

impl BookingRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            booking_collection: db.collection("bookings"),
            db: db.clone(),
        }
    }

    /// Initialize database indexes.
    ///
    /// The unique index on `payment_intent_id` is what makes the store the
    /// sole authority for the one-booking-per-intent invariant; the event
    /// source is at-least-once and redelivers.
    pub async fn init_indexes(&self) -> Result<(), Error> {
        let intent_index = IndexModel::builder()
            .keys(doc! { "payment_intent_id": 1 })
            .options(
                IndexOptions::builder()
                    .name("unique_payment_intent_idx".to_string())
                    .unique(true)
                    .build(),
            )
            .build();

        let user_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "created_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_bookings_idx".to_string())
                    .build(),
            )
            .build();

        self.booking_collection
            .create_indexes([intent_index, user_index], None)
            .await?;

        tracing::info!("Booking service indexes initialized");
        Ok(())
    }

    /// Atomic upsert keyed by payment intent id.
    ///
    /// Redelivered events find the row already present and leave it
    /// untouched; a `Pending` row created through the explicit booking path
    /// is promoted to the event's terminal status. Terminal rows are never
    /// rewritten, so the terminal state is sticky under any delivery order.
    pub async fn upsert_by_payment_intent(&self, booking: Booking) -> Result<Booking, Error> {
        let filter = doc! { "payment_intent_id": &booking.payment_intent_id };
        let mut insert_doc = to_document(&booking)?;
        // The filter's equality value supplies payment_intent_id on insert.
        insert_doc.remove("payment_intent_id");
        let options = UpdateOptions::builder().upsert(true).build();

        match self
            .booking_collection
            .update_one(filter.clone(), doc! { "$setOnInsert": insert_doc }, options)
            .await
        {
            Ok(_) => {}
            // Two concurrent deliveries can both attempt the insert; the
            // loser hits the unique index and the row it wanted now exists.
            Err(err) if is_duplicate_key_error(&err) => {
                tracing::debug!(
                    payment_intent_id = %booking.payment_intent_id,
                    "concurrent delivery already materialized this booking"
                );
            }
            Err(err) => return Err(err),
        }

        if booking.status.is_terminal() {
            let promote = doc! {
                "$set": {
                    "status": to_bson(&booking.status)?,
                    "updated_at": DateTime::now(),
                }
            };
            self.booking_collection
                .update_one(
                    doc! {
                        "payment_intent_id": &booking.payment_intent_id,
                        "status": to_bson(&BookingStatus::Pending)?,
                    },
                    promote,
                    None,
                )
                .await?;
        }

        match self.find_by_payment_intent(&booking.payment_intent_id).await? {
            Some(stored) => Ok(stored),
            // Unreachable: the upsert above guarantees the row exists.
            None => Ok(booking),
        }
    }

    /// Insert for the explicit booking-creation path. Duplicate intent ids
    /// surface as a duplicate-key error for the caller to map to a conflict.
    pub async fn insert(&self, booking: Booking) -> Result<(), Error> {
        self.booking_collection.insert_one(booking, None).await?;
        Ok(())
    }

    pub async fn find_by_payment_intent(&self, intent_id: &str) -> Result<Option<Booking>, Error> {
        self.booking_collection
            .find_one(doc! { "payment_intent_id": intent_id }, None)
            .await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, Error> {
        self.booking_collection
            .find_one(doc! { "_id": id }, None)
            .await
    }

    /// All bookings for a user, newest first.
    pub async fn find_by_user(&self, user_id: &str) -> Result<Vec<Booking>, Error> {
        let options = FindOptions::builder()
            .sort(doc! { "created_at": -1 })
            .build();

        let cursor = self
            .booking_collection
            .find(doc! { "user_id": user_id }, options)
            .await?;

        cursor.try_collect().await
    }

    pub async fn update_status(&self, id: &str, status: BookingStatus) -> Result<(), Error> {
        let update = doc! {
            "$set": {
                "status": to_bson(&status)?,
                "updated_at": DateTime::now(),
            }
        };
        self.booking_collection
            .update_one(doc! { "_id": id }, update, None)
            .await?;
        Ok(())
    }

    /// Existence probe against the catalog collection for the item type.
    /// Catalog ids may be ObjectIds or plain strings; no foreign key is
    /// enforced beyond this check.
    pub async fn item_exists(&self, item_type: ItemType, item_id: &str) -> Result<bool, Error> {
        let id_value: Bson = match ObjectId::parse_str(item_id) {
            Ok(oid) => oid.into(),
            Err(_) => item_id.into(),
        };

        let count = self
            .db
            .collection::<Document>(item_type.collection_name())
            .count_documents(doc! { "_id": id_value }, None)
            .await?;

        Ok(count > 0)
    }
}

pub fn is_duplicate_key_error(err: &Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => write_error.code == 11000,
        ErrorKind::Command(command_error) => command_error.code == 11000,
        _ => false,
    }
}
