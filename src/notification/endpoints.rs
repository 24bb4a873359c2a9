//! Route handlers for the customer notification feed.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    app_state::lock_connection,
    customer::{CustomerId, get_customer},
    notification::{
        AppNotification, NotificationId, NotificationKind, count_unread_notifications,
        create_notification, delete_notification, list_notifications,
        mark_all_notifications_read, mark_notification_read,
    },
};

/// The state needed to manage notifications.
#[derive(Debug, Clone)]
pub struct NotificationState {
    /// The database connection for managing notifications.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for NotificationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters for listing a customer's notifications.
#[derive(Debug, Default, Deserialize)]
pub struct NotificationFilter {
    /// Only include notifications that have not been read.
    #[serde(default)]
    pub unread_only: bool,
}

/// The body for sending a message to a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralNotificationForm {
    /// The customer to notify.
    pub customer_id: CustomerId,
    /// The headline of the message.
    pub title: String,
    /// The body of the message.
    pub message: String,
}

/// The number of unread notifications.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnreadCount {
    /// The number of unread notifications.
    pub unread: i64,
}

/// The number of notifications changed by a bulk update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkedRead {
    /// How many notifications were marked as read.
    pub updated: usize,
}

/// A route handler for staff to send a general notification to a customer.
pub async fn create_notification_endpoint(
    State(state): State<NotificationState>,
    Json(form): Json<GeneralNotificationForm>,
) -> Result<(StatusCode, Json<AppNotification>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let notification = create_notification(
        form.customer_id,
        NotificationKind::General,
        &form.title,
        &form.message,
        &connection,
    )?;
    tracing::info!("Sent notification {} to customer {}", notification.id, form.customer_id);

    Ok((StatusCode::CREATED, Json(notification)))
}

/// A route handler for a customer's notifications, newest first.
pub async fn list_customer_notifications_endpoint(
    State(state): State<NotificationState>,
    Path(customer_id): Path<CustomerId>,
    Query(filter): Query<NotificationFilter>,
) -> Result<Json<Vec<AppNotification>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_customer(customer_id, &connection)?;
    list_notifications(customer_id, filter.unread_only, &connection).map(Json)
}

/// A route handler for the number of unread notifications of a customer.
pub async fn unread_count_endpoint(
    State(state): State<NotificationState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<UnreadCount>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_customer(customer_id, &connection)?;
    let unread = count_unread_notifications(customer_id, &connection)?;

    Ok(Json(UnreadCount { unread }))
}

/// A route handler for marking all of a customer's notifications as read.
pub async fn mark_all_read_endpoint(
    State(state): State<NotificationState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<MarkedRead>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_customer(customer_id, &connection)?;
    let updated = mark_all_notifications_read(customer_id, &connection)?;

    Ok(Json(MarkedRead { updated }))
}

/// A route handler for marking one notification as read.
pub async fn mark_read_endpoint(
    State(state): State<NotificationState>,
    Path(notification_id): Path<NotificationId>,
) -> Result<Json<AppNotification>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    mark_notification_read(notification_id, &connection).map(Json)
}

/// A route handler for deleting a notification, responds with 204 No Content on success.
pub async fn delete_notification_endpoint(
    State(state): State<NotificationState>,
    Path(notification_id): Path<NotificationId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_notification(notification_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
