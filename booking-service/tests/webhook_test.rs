mod common;

use common::{TestApp, TEST_USER_ID};
use mongodb::bson::doc;
use serde_json::json;

fn payment_event(event_type: &str, intent_id: &str, metadata: serde_json::Value) -> String {
    json!({
        "id": format!("evt_{}", intent_id),
        "object": "event",
        "type": event_type,
        "created": chrono::Utc::now().timestamp(),
        "data": {
            "object": {
                "id": intent_id,
                "object": "payment_intent",
                "amount": 1000,
                "currency": "usd",
                "status": "succeeded",
                "metadata": metadata
            }
        }
    })
    .to_string()
}

fn hotel_metadata() -> serde_json::Value {
    json!({
        "userId": TEST_USER_ID,
        "itemType": "hotel",
        "itemId": "hotel-1",
        "originalAmount": "13000",
        "originalCurrency": "rwf",
        "checkIn": "2026-09-01",
        "checkOut": "2026-09-05",
        "roomType": "deluxe",
        "guests": "2"
    })
}

async fn post_webhook(app: &TestApp, body: &str, signature: &str) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("{}/payments/webhook", app.address))
        .header("Stripe-Signature", signature)
        .header("Content-Type", "application/json")
        .body(body.to_string())
        .send()
        .await
        .expect("Failed to execute request")
}

async fn booking_count(app: &TestApp) -> u64 {
    app.db
        .collection::<mongodb::bson::Document>("bookings")
        .count_documents(None, None)
        .await
        .expect("Failed to count bookings")
}

async fn booking_for_intent(app: &TestApp, intent_id: &str) -> Option<mongodb::bson::Document> {
    app.db
        .collection::<mongodb::bson::Document>("bookings")
        .find_one(doc! { "payment_intent_id": intent_id }, None)
        .await
        .expect("Failed to query bookings")
}

#[tokio::test]
async fn succeeded_event_materializes_completed_booking() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_ok", hotel_metadata());
    let response = post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    assert_eq!(response.status(), 200);
    let ack: serde_json::Value = response.json().await.expect("Invalid JSON body");
    assert_eq!(ack["received"], true);

    let booking = booking_for_intent(&app, "pi_ok")
        .await
        .expect("booking was not materialized");
    assert_eq!(booking.get_str("status").unwrap(), "completed");
    assert_eq!(booking.get_str("user_id").unwrap(), TEST_USER_ID);
    assert_eq!(booking.get_str("item_type").unwrap(), "hotel");
    assert_eq!(booking.get_str("item_id").unwrap(), "hotel-1");

    app.cleanup().await;
}

#[tokio::test]
async fn failed_event_materializes_failed_booking() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.payment_failed", "pi_fail", hotel_metadata());
    let response = post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    assert_eq!(response.status(), 200);

    let booking = booking_for_intent(&app, "pi_fail")
        .await
        .expect("booking was not materialized");
    assert_eq!(booking.get_str("status").unwrap(), "failed");

    app.cleanup().await;
}

#[tokio::test]
async fn redelivered_event_is_idempotent() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_dup", hotel_metadata());
    let signature = app.sign_webhook(&body);

    let first = post_webhook(&app, &body, &signature).await;
    let second = post_webhook(&app, &body, &signature).await;

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);
    assert_eq!(booking_count(&app).await, 1);

    let booking = booking_for_intent(&app, "pi_dup").await.unwrap();
    assert_eq!(booking.get_str("status").unwrap(), "completed");

    app.cleanup().await;
}

#[tokio::test]
async fn concurrent_duplicate_deliveries_leave_one_booking() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_race", hotel_metadata());
    let signature = app.sign_webhook(&body);

    let (first, second) = tokio::join!(
        post_webhook(&app, &body, &signature),
        post_webhook(&app, &body, &signature),
    );

    assert_eq!(first.status(), 200);
    assert_eq!(second.status(), 200);
    assert_eq!(booking_count(&app).await, 1);

    let booking = booking_for_intent(&app, "pi_race").await.unwrap();
    assert_eq!(booking.get_str("status").unwrap(), "completed");

    app.cleanup().await;
}

#[tokio::test]
async fn original_amount_round_trips_exactly() {
    let app = TestApp::spawn().await;

    // The event carries the settlement charge (1 000 cents); the booking
    // must record the display-currency value stashed at intent creation.
    let body = payment_event("payment_intent.succeeded", "pi_round", hotel_metadata());
    post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    let booking = booking_for_intent(&app, "pi_round").await.unwrap();
    assert_eq!(booking.get_f64("amount").unwrap(), 13000.0);
    assert_eq!(booking.get_str("currency").unwrap(), "rwf");

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_signature_creates_no_booking() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_bad_sig", hotel_metadata());
    let forged = app.sign_webhook_with(&body, chrono::Utc::now().timestamp(), "wrong_secret");

    let response = post_webhook(&app, &body, &forged).await;

    assert_eq!(response.status(), 400);
    assert_eq!(booking_count(&app).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_signature_header_is_rejected() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_no_sig", hotel_metadata());
    let response = reqwest::Client::new()
        .post(format!("{}/payments/webhook", app.address))
        .header("Content-Type", "application/json")
        .body(body)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 400);
    assert_eq!(booking_count(&app).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn stale_timestamp_is_rejected() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_stale", hotel_metadata());
    // 10 minutes old, beyond the 5 minute tolerance window.
    let stale = app.sign_webhook_with(
        &body,
        chrono::Utc::now().timestamp() - 600,
        common::TEST_WEBHOOK_SECRET,
    );

    let response = post_webhook(&app, &body, &stale).await;

    assert_eq!(response.status(), 400);
    assert_eq!(booking_count(&app).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn unknown_event_type_is_acknowledged_without_side_effect() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.created", "pi_ignore", hotel_metadata());
    let response = post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    assert_eq!(response.status(), 200);
    let ack: serde_json::Value = response.json().await.expect("Invalid JSON body");
    assert_eq!(ack["received"], true);
    assert_eq!(booking_count(&app).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn missing_metadata_is_acknowledged_without_booking() {
    let app = TestApp::spawn().await;

    // No itemType: a data-integrity fault redelivery can never fix.
    let body = payment_event(
        "payment_intent.succeeded",
        "pi_broken",
        json!({ "userId": TEST_USER_ID, "itemId": "hotel-1" }),
    );
    let response = post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    assert_eq!(response.status(), 200);
    let ack: serde_json::Value = response.json().await.expect("Invalid JSON body");
    assert_eq!(ack["received"], true);
    assert_eq!(booking_count(&app).await, 0);

    app.cleanup().await;
}

#[tokio::test]
async fn invalid_signature_does_not_alter_existing_booking() {
    let app = TestApp::spawn().await;

    let body = payment_event("payment_intent.succeeded", "pi_keep", hotel_metadata());
    post_webhook(&app, &body, &app.sign_webhook(&body)).await;
    assert_eq!(booking_count(&app).await, 1);

    let tampered = payment_event("payment_intent.payment_failed", "pi_keep", hotel_metadata());
    let forged = app.sign_webhook_with(&tampered, chrono::Utc::now().timestamp(), "wrong_secret");
    let response = post_webhook(&app, &tampered, &forged).await;

    assert_eq!(response.status(), 400);
    let booking = booking_for_intent(&app, "pi_keep").await.unwrap();
    assert_eq!(booking.get_str("status").unwrap(), "completed");

    app.cleanup().await;
}

#[tokio::test]
async fn succeeded_event_promotes_pending_booking() {
    let app = TestApp::spawn().await;

    // Client records a pending booking ahead of payment confirmation.
    app.db
        .collection::<mongodb::bson::Document>("hotels")
        .insert_one(doc! { "_id": "hotel-1", "name": "Test Hotel" }, None)
        .await
        .expect("Failed to seed catalog");

    let create = reqwest::Client::new()
        .post(format!("{}/bookings", app.address))
        .header("Authorization", app.auth_header(TEST_USER_ID))
        .json(&json!({
            "itemType": "hotel",
            "itemId": "hotel-1",
            "paymentIntentId": "pi_pending",
            "amount": 13000.0,
            "currency": "rwf",
            "bookingDetails": { "roomType": "deluxe", "guests": 2 }
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(create.status(), 201);

    let body = payment_event("payment_intent.succeeded", "pi_pending", hotel_metadata());
    let response = post_webhook(&app, &body, &app.sign_webhook(&body)).await;

    assert_eq!(response.status(), 200);
    assert_eq!(booking_count(&app).await, 1);

    let booking = booking_for_intent(&app, "pi_pending").await.unwrap();
    assert_eq!(booking.get_str("status").unwrap(), "completed");

    app.cleanup().await;
}
