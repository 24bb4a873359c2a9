//! Teller is the back office of a retail bank.
//!
//! This library provides a JSON REST API for opening accounts, moving money
//! between them, originating and repaying loans, administering branches,
//! departments and employees, and feeding notifications back to customers.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod account;
mod app_state;
mod branch;
mod customer;
mod database_id;
mod db;
mod department;
mod employee;
pub mod endpoints;
mod loan;
mod logging;
mod money;
mod notification;
mod pagination;
mod routing;
mod scheduler;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use account::{Account, AccountKind, AccountStatus, OpenAccount, open_account};
pub use app_state::AppState;
pub use branch::{Branch, BranchForm, create_branch};
pub use customer::{Customer, CustomerForm, create_customer};
pub use database_id::DatabaseId;
pub use db::initialize as initialize_db;
pub use department::{Department, DepartmentForm, create_department};
pub use employee::{Employee, EmployeeForm, create_employee};
pub use loan::{LoanRequestForm, approve_loan_request, submit_loan_request};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use money::Money;
pub use pagination::PaginationConfig;
pub use routing::build_router;
pub use scheduler::{SweepReport, spawn_payment_sweeper, sweep};
pub use timezone::{get_local_offset, today_in};
pub use transaction::{deposit, transfer, withdraw};

use crate::{
    account::AccountId, loan::LoanRequestId, loan::PaymentId, notification::NotificationId,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// A monetary amount was zero, negative or had more than two decimal places.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// A required text field was empty.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A request had a value outside of its allowed range or combination.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// An ID in the request does not refer to an existing row, or refers to a
    /// row that cannot be used in this context.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    /// A unique value (e.g., an email address or a name) is already taken.
    #[error("{0} already exists")]
    Duplicate(String),

    /// The row cannot be deleted because other rows still refer to it.
    #[error("the record is still referenced by other records")]
    RecordInUse,

    /// The account does not hold enough money for the debit.
    #[error("insufficient funds: the balance is {available}, but {requested} was requested")]
    InsufficientFunds {
        /// The current balance of the account.
        available: crate::Money,
        /// The amount that was requested.
        requested: crate::Money,
    },

    /// A balance, total or loan amount would exceed what can be represented.
    #[error("arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),

    /// The account is frozen or closed, so its balance cannot change.
    #[error("account {0} is not active")]
    AccountNotActive(AccountId),

    /// The account cannot be closed, e.g. it still holds money.
    #[error("account {0} cannot be closed: {1}")]
    AccountNotClosable(AccountId, String),

    /// The source and destination of a transfer are the same account.
    #[error("cannot transfer money from an account to itself")]
    SameAccountTransfer,

    /// The loan request has already been approved or rejected.
    #[error("loan request {0} has already been decided")]
    LoanRequestAlreadyDecided(LoanRequestId),

    /// The loan payment has already been paid.
    #[error("payment {0} has already been paid")]
    PaymentAlreadySettled(PaymentId),

    /// An earlier installment of the same loan is still unpaid.
    #[error("payment {0} cannot be paid before installment {1}")]
    PaymentOutOfOrder(PaymentId, i64),

    /// The notification does not exist.
    #[error("notification {0} could not be found")]
    MissingNotification(NotificationId),

    /// A canonical timezone string did not match a known timezone.
    #[error("invalid timezone {0}")]
    InvalidTimezone(String),

    /// The CSV writer failed.
    #[error("could not write CSV: {0}")]
    CsvError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ) => Error::InvalidReference("a referenced record does not exist".to_owned()),
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                ref desc,
            ) => Error::Duplicate(
                desc.as_deref()
                    .and_then(|desc| desc.rsplit('.').next())
                    .unwrap_or("value")
                    .to_owned(),
            ),
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<csv::Error> for Error {
    fn from(value: csv::Error) -> Self {
        Error::CsvError(value.to_string())
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound | Error::MissingNotification(_) => StatusCode::NOT_FOUND,
            Error::InvalidAmount(_)
            | Error::EmptyField(_)
            | Error::InvalidRequest(_)
            | Error::InvalidReference(_)
            | Error::SameAccountTransfer => StatusCode::BAD_REQUEST,
            Error::Duplicate(_)
            | Error::RecordInUse
            | Error::InsufficientFunds { .. }
            | Error::ArithmeticOverflow(_)
            | Error::AccountNotActive(_)
            | Error::AccountNotClosable(_, _)
            | Error::LoanRequestAlreadyDecided(_)
            | Error::PaymentAlreadySettled(_)
            | Error::PaymentOutOfOrder(_, _) => StatusCode::CONFLICT,
            Error::InvalidTimezone(_)
            | Error::CsvError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            // Internal errors are not intended to be shown to the client.
            tracing::error!("An unexpected error occurred: {}", self);
            "An unexpected error occurred, check the server logs for more details.".to_owned()
        } else {
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};
    use rusqlite::Connection;

    use crate::{Error, Money};

    #[test]
    fn maps_missing_row_to_not_found() {
        let connection = Connection::open_in_memory().unwrap();

        let error: Error = connection
            .query_row("SELECT 1 WHERE 0", [], |row| row.get::<_, i64>(0))
            .unwrap_err()
            .into();

        assert_eq!(error, Error::NotFound);
    }

    #[test]
    fn maps_unique_violation_to_duplicate_with_column_name() {
        let connection = Connection::open_in_memory().unwrap();
        connection
            .execute("CREATE TABLE person (email TEXT UNIQUE)", ())
            .unwrap();
        connection
            .execute("INSERT INTO person (email) VALUES ('a@b.c')", ())
            .unwrap();

        let error: Error = connection
            .execute("INSERT INTO person (email) VALUES ('a@b.c')", ())
            .unwrap_err()
            .into();

        assert_eq!(error, Error::Duplicate("email".to_owned()));
    }

    #[test]
    fn insufficient_funds_is_a_conflict() {
        let response = Error::InsufficientFunds {
            available: Money::zero(),
            requested: Money::zero(),
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn arithmetic_overflow_is_a_conflict() {
        let response = Error::ArithmeticOverflow("addition").into_response();

        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn lock_error_is_internal() {
        let response = Error::DatabaseLockError.into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
