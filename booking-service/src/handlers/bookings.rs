//! Booking handlers: listing, retrieval, explicit creation, status updates.
//!
//! Reconciled bookings normally arrive through the webhook path; the
//! explicit create endpoint records a `pending` booking ahead of payment
//! confirmation. All routes are scoped to the authenticated caller.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use mongodb::bson::DateTime;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{BookingResponse, CreateBookingRequest, UpdateBookingStatusRequest},
    middleware::AuthUser,
    models::{Booking, BookingStatus},
    services::repository::is_duplicate_key_error,
    AppState,
};

/// All bookings for the authenticated user, newest first.
pub async fn list_bookings(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> Result<Json<Vec<BookingResponse>>, AppError> {
    let bookings = state.repository.find_by_user(&claims.sub).await?;

    tracing::debug!(user_id = %claims.sub, count = bookings.len(), "Fetched user bookings");

    Ok(Json(
        bookings.into_iter().map(BookingResponse::from).collect(),
    ))
}

pub async fn get_booking(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(booking_id): Path<String>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .repository
        .find_by_id(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    if booking.user_id != claims.sub {
        return Err(AppError::Forbidden(anyhow::anyhow!("Not authorized")));
    }

    Ok(Json(booking.into()))
}

pub async fn create_booking(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<BookingResponse>), AppError> {
    payload.validate()?;

    if !state
        .repository
        .item_exists(payload.item_type, &payload.item_id)
        .await?
    {
        return Err(AppError::NotFound(anyhow::anyhow!(
            "{} not found",
            payload.item_type
        )));
    }

    let now = DateTime::now();
    let booking = Booking {
        id: Uuid::new_v4().to_string(),
        user_id: claims.sub.clone(),
        item_type: payload.item_type,
        item_id: payload.item_id,
        payment_intent_id: payload.payment_intent_id,
        amount: payload.amount,
        currency: payload.currency,
        status: BookingStatus::Pending,
        booking_details: payload.booking_details.into_details(payload.item_type),
        created_at: now,
        updated_at: now,
    };

    match state.repository.insert(booking.clone()).await {
        Ok(()) => {}
        Err(err) if is_duplicate_key_error(&err) => {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "A booking already exists for this payment intent"
            )));
        }
        Err(err) => return Err(err.into()),
    }

    tracing::info!(
        booking_id = %booking.id,
        user_id = %claims.sub,
        item_type = %booking.item_type,
        "Booking created"
    );

    Ok((StatusCode::CREATED, Json(booking.into())))
}

/// Explicit status-update path; the only route to `cancelled`. Terminal
/// states never transition again.
pub async fn update_booking_status(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Path(booking_id): Path<String>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<BookingResponse>, AppError> {
    let booking = state
        .repository
        .find_by_id(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    if booking.user_id != claims.sub {
        return Err(AppError::Forbidden(anyhow::anyhow!("Not authorized")));
    }

    if !booking.status.can_transition_to(payload.status) {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Cannot move a {} booking to {}",
            booking.status,
            payload.status
        )));
    }

    state
        .repository
        .update_status(&booking_id, payload.status)
        .await?;

    let updated = state
        .repository
        .find_by_id(&booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Booking not found")))?;

    tracing::info!(
        booking_id = %booking_id,
        status = %payload.status,
        "Booking status updated"
    );

    Ok(Json(updated.into()))
}
