//! Route handlers for moving money and reading the ledger.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::header,
    response::IntoResponse,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::AccountId,
    app_state::lock_connection,
    money::Money,
    pagination::{Page, PageQuery, PaginationConfig},
    transaction::{
        LedgerEntry, Receipt, Transaction, TransactionId, TransferReceipt, account_statement_csv,
        deposit, get_transaction, list_account_transactions, transfer, withdraw,
    },
};

/// The state needed to move money and read the ledger.
#[derive(Debug, Clone)]
pub struct TransactionState {
    /// The database connection for managing transactions.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how the ledger is paged.
    pub pagination_config: PaginationConfig,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
        }
    }
}

/// The body of a deposit or withdrawal request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmountForm {
    /// The amount of money to move.
    pub amount: Money,
    /// An optional note for the ledger.
    #[serde(default)]
    pub description: Option<String>,
}

/// The body of a transfer request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferForm {
    /// The account to take the money from.
    pub from_account_id: AccountId,
    /// The account to pay the money into.
    pub to_account_id: AccountId,
    /// The amount of money to move.
    pub amount: Money,
    /// An optional note for the ledger.
    #[serde(default)]
    pub description: Option<String>,
}

/// A route handler for depositing money into an account.
pub async fn deposit_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<AmountForm>,
) -> Result<Json<Receipt>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let receipt = deposit(
        account_id,
        form.amount,
        form.description.as_deref(),
        &connection,
    )
    .inspect_err(|error| {
        tracing::debug!("Could not deposit {} into account {account_id}: {error}", form.amount);
    })?;
    tracing::info!(
        "Deposited {} into account {account_id}, new balance {}",
        form.amount,
        receipt.balance
    );

    Ok(Json(receipt))
}

/// A route handler for withdrawing money from an account.
pub async fn withdraw_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
    Json(form): Json<AmountForm>,
) -> Result<Json<Receipt>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let receipt = withdraw(
        account_id,
        form.amount,
        form.description.as_deref(),
        &connection,
    )
    .inspect_err(|error| {
        tracing::debug!("Could not withdraw {} from account {account_id}: {error}", form.amount);
    })?;
    tracing::info!(
        "Withdrew {} from account {account_id}, new balance {}",
        form.amount,
        receipt.balance
    );

    Ok(Json(receipt))
}

/// A route handler for transferring money between two accounts.
pub async fn transfer_endpoint(
    State(state): State<TransactionState>,
    Json(form): Json<TransferForm>,
) -> Result<Json<TransferReceipt>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let receipt = transfer(
        form.from_account_id,
        form.to_account_id,
        form.amount,
        form.description.as_deref(),
        &connection,
    )
    .inspect_err(|error| tracing::debug!("Could not transfer with {form:?}: {error}"))?;
    tracing::info!(
        "Transferred {} from account {} to account {}",
        form.amount,
        form.from_account_id,
        form.to_account_id
    );

    Ok(Json(receipt))
}

/// A route handler for one page of an account's ledger, newest first.
pub async fn list_account_transactions_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Page<LedgerEntry>>, Error> {
    let (page, per_page) = query.resolve(&state.pagination_config);
    let connection = lock_connection(&state.db_connection)?;

    list_account_transactions(account_id, page, per_page, &connection).map(Json)
}

/// A route handler for getting a single ledger transaction.
pub async fn get_transaction_endpoint(
    State(state): State<TransactionState>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_transaction(transaction_id, &connection).map(Json)
}

/// A route handler for downloading an account statement as a CSV file.
pub async fn account_statement_endpoint(
    State(state): State<TransactionState>,
    Path(account_id): Path<AccountId>,
) -> Result<impl IntoResponse, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let csv = account_statement_csv(account_id, &connection)?;

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"account-{account_id}-statement.csv\""),
            ),
        ],
        csv,
    ))
}
