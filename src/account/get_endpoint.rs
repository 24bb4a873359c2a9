//! Defines the endpoints for viewing accounts.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::{
    Error,
    account::{Account, AccountId, get_account, list_accounts, open_endpoint::AccountState},
    app_state::lock_connection,
    customer::CustomerId,
};

/// Query parameters for listing accounts.
#[derive(Debug, Default, Deserialize)]
pub struct AccountFilter {
    /// Only include accounts owned by this customer.
    pub customer_id: Option<CustomerId>,
}

/// A route handler for listing accounts, optionally filtered by customer.
pub async fn list_accounts_endpoint(
    State(state): State<AccountState>,
    Query(filter): Query<AccountFilter>,
) -> Result<Json<Vec<Account>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_accounts(filter.customer_id, &connection).map(Json)
}

/// A route handler for getting a single account.
pub async fn get_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_account(account_id, &connection).map(Json)
}
