//! Defines the endpoint for freezing and unfreezing accounts.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId, AccountStatus, open_endpoint::AccountState, set_account_status},
    app_state::lock_connection,
};

/// The request body for changing the status of an account.
#[derive(Debug, Serialize, Deserialize)]
pub struct StatusForm {
    /// Either `active` or `frozen`.
    pub status: AccountStatus,
}

/// A route handler for freezing or unfreezing an account.
pub async fn set_account_status_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<StatusForm>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let account = set_account_status(account_id, form.status, &connection)?;
    tracing::info!("Account {account_id} is now {}", account.status);

    Ok(Json(account))
}
