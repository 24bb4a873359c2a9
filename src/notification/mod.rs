//! Messages shown to customers about activity on their accounts and loans.

mod core;
mod endpoints;

pub use core::{
    AppNotification, NotificationId, NotificationKind, count_unread_notifications,
    create_notification, create_notification_table, delete_notification, list_notifications,
    mark_all_notifications_read, mark_notification_read,
};
pub use endpoints::{
    create_notification_endpoint, delete_notification_endpoint,
    list_customer_notifications_endpoint, mark_all_read_endpoint, mark_read_endpoint,
    unread_count_endpoint,
};
