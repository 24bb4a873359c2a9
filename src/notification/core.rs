use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, customer::CustomerId, database_id::DatabaseId, db::sql_text_enum};

pub type NotificationId = DatabaseId;

/// What a notification is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// Money moved in or out of one of the customer's accounts.
    Transaction,
    /// A loan request was decided or a loan was repaid.
    Loan,
    /// A loan installment is due soon.
    PaymentReminder,
    /// A loan installment is past its due date.
    PaymentOverdue,
    /// Anything else, e.g. account status changes or messages from staff.
    General,
}

sql_text_enum!(NotificationKind {
    Transaction => "transaction",
    Loan => "loan",
    PaymentReminder => "payment_reminder",
    PaymentOverdue => "payment_overdue",
    General => "general",
});

/// A message shown to a customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppNotification {
    pub id: NotificationId,
    pub customer_id: CustomerId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

pub fn create_notification_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS notification (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL,
            kind TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT NOT NULL,
            is_read INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            FOREIGN KEY(customer_id) REFERENCES customer(id) ON UPDATE CASCADE ON DELETE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_notification_customer ON notification(customer_id, is_read)",
        (),
    )?;

    Ok(())
}

fn map_row_to_notification(row: &Row) -> Result<AppNotification, rusqlite::Error> {
    Ok(AppNotification {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        kind: row.get(2)?,
        title: row.get(3)?,
        message: row.get(4)?,
        is_read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

const NOTIFICATION_COLUMNS: &str = "id, customer_id, kind, title, message, is_read, created_at";

/// Add an unread notification to a customer's feed.
///
/// # Errors
/// Returns [Error::EmptyField] if `title` is blank, or
/// [Error::InvalidReference] if the customer does not exist.
pub fn create_notification(
    customer_id: CustomerId,
    kind: NotificationKind,
    title: &str,
    message: &str,
    connection: &Connection,
) -> Result<AppNotification, Error> {
    let title = title.trim();
    if title.is_empty() {
        return Err(Error::EmptyField("notification title"));
    }

    connection
        .prepare(&format!(
            "INSERT INTO notification (customer_id, kind, title, message, is_read, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)
             RETURNING {NOTIFICATION_COLUMNS}"
        ))?
        .query_row(
            params![customer_id, kind, title, message, OffsetDateTime::now_utc()],
            map_row_to_notification,
        )
        .map_err(Error::from)
}

/// Get a customer's notifications, newest first.
pub fn list_notifications(
    customer_id: CustomerId,
    unread_only: bool,
    connection: &Connection,
) -> Result<Vec<AppNotification>, Error> {
    connection
        .prepare(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notification
             WHERE customer_id = ?1 AND (?2 = 0 OR is_read = 0)
             ORDER BY id DESC"
        ))?
        .query_map(params![customer_id, unread_only], map_row_to_notification)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// The number of notifications the customer has not read yet.
pub fn count_unread_notifications(
    customer_id: CustomerId,
    connection: &Connection,
) -> Result<i64, Error> {
    connection
        .query_row(
            "SELECT COUNT(*) FROM notification WHERE customer_id = ?1 AND is_read = 0",
            params![customer_id],
            |row| row.get(0),
        )
        .map_err(Error::from)
}

/// Mark a single notification as read and return it.
///
/// # Errors
/// Returns [Error::MissingNotification] if there is no notification with `id`.
pub fn mark_notification_read(
    id: NotificationId,
    connection: &Connection,
) -> Result<AppNotification, Error> {
    connection
        .prepare(&format!(
            "UPDATE notification SET is_read = 1 WHERE id = ?1 RETURNING {NOTIFICATION_COLUMNS}"
        ))?
        .query_row(params![id], map_row_to_notification)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MissingNotification(id),
            error => error.into(),
        })
}

/// Mark all of a customer's notifications as read.
///
/// Returns the number of notifications that changed.
pub fn mark_all_notifications_read(
    customer_id: CustomerId,
    connection: &Connection,
) -> Result<usize, Error> {
    connection
        .execute(
            "UPDATE notification SET is_read = 1 WHERE customer_id = ?1 AND is_read = 0",
            params![customer_id],
        )
        .map_err(Error::from)
}

/// Delete a notification.
///
/// # Errors
/// Returns [Error::MissingNotification] if there is no notification with `id`.
pub fn delete_notification(id: NotificationId, connection: &Connection) -> Result<(), Error> {
    let rows_affected =
        connection.execute("DELETE FROM notification WHERE id = ?1", params![id])?;

    if rows_affected == 0 {
        return Err(Error::MissingNotification(id));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        test_utils::{create_test_customer, get_test_connection},
    };

    use super::{
        NotificationKind, count_unread_notifications, create_notification, delete_notification,
        list_notifications, mark_all_notifications_read, mark_notification_read,
    };

    #[test]
    fn new_notifications_are_unread_and_newest_first() {
        let connection = get_test_connection();
        let customer = create_test_customer(&connection);

        let first =
            create_notification(customer.id, NotificationKind::General, "One", "", &connection)
                .unwrap();
        let second =
            create_notification(customer.id, NotificationKind::Loan, "Two", "", &connection)
                .unwrap();

        assert!(!first.is_read);
        assert_eq!(
            list_notifications(customer.id, false, &connection),
            Ok(vec![second, first])
        );
        assert_eq!(count_unread_notifications(customer.id, &connection), Ok(2));
    }

    #[test]
    fn notification_for_missing_customer_is_invalid_reference() {
        let connection = get_test_connection();

        let result = create_notification(9, NotificationKind::General, "Hi", "", &connection);

        assert!(matches!(result, Err(Error::InvalidReference(_))));
    }

    #[test]
    fn blank_title_is_rejected() {
        let connection = get_test_connection();
        let customer = create_test_customer(&connection);

        let result =
            create_notification(customer.id, NotificationKind::General, "  ", "", &connection);

        assert_eq!(result, Err(Error::EmptyField("notification title")));
    }

    #[test]
    fn mark_read_filters_unread_list() {
        let connection = get_test_connection();
        let customer = create_test_customer(&connection);
        let read =
            create_notification(customer.id, NotificationKind::General, "Read", "", &connection)
                .unwrap();
        let unread =
            create_notification(customer.id, NotificationKind::General, "Unread", "", &connection)
                .unwrap();

        let marked = mark_notification_read(read.id, &connection).unwrap();

        assert!(marked.is_read);
        assert_eq!(
            list_notifications(customer.id, true, &connection),
            Ok(vec![unread])
        );
        assert_eq!(count_unread_notifications(customer.id, &connection), Ok(1));
    }

    #[test]
    fn mark_all_read_counts_changes() {
        let connection = get_test_connection();
        let customer = create_test_customer(&connection);
        for title in ["a", "b", "c"] {
            create_notification(customer.id, NotificationKind::General, title, "", &connection)
                .unwrap();
        }

        assert_eq!(mark_all_notifications_read(customer.id, &connection), Ok(3));
        assert_eq!(mark_all_notifications_read(customer.id, &connection), Ok(0));
        assert_eq!(count_unread_notifications(customer.id, &connection), Ok(0));
    }

    #[test]
    fn missing_notification_errors() {
        let connection = get_test_connection();

        assert_eq!(
            mark_notification_read(4, &connection),
            Err(Error::MissingNotification(4))
        );
        assert_eq!(
            delete_notification(4, &connection),
            Err(Error::MissingNotification(4))
        );
    }

    #[test]
    fn delete_removes_notification() {
        let connection = get_test_connection();
        let customer = create_test_customer(&connection);
        let notification =
            create_notification(customer.id, NotificationKind::General, "Bye", "", &connection)
                .unwrap();

        delete_notification(notification.id, &connection).unwrap();

        assert_eq!(list_notifications(customer.id, false, &connection), Ok(vec![]));
    }
}
