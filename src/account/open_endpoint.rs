//! Defines the endpoint for opening a new account.
use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, OpenAccount, open_account},
    app_state::lock_connection,
};

/// The state needed to open, view or change an account.
#[derive(Debug, Clone)]
pub struct AccountState {
    /// The database connection for managing accounts.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AccountState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for opening a new account, responds with the account and 201 Created.
pub async fn open_account_endpoint(
    State(state): State<AccountState>,
    Json(form): Json<OpenAccount>,
) -> Result<(StatusCode, Json<Account>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = open_account(&form, &connection).inspect_err(|error| {
        tracing::debug!("Could not open account with {form:?}: {error}");
    })?;
    tracing::info!(
        "Opened account {} for customer {} at branch {}",
        account.id,
        account.customer_id,
        account.branch_id
    );

    Ok((StatusCode::CREATED, Json(account)))
}
