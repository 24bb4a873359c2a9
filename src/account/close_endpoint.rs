//! Defines the endpoint for closing an account.

use axum::{
    Json,
    extract::{Path, State},
};

use crate::{
    Error,
    account::{Account, AccountId, close_account, open_endpoint::AccountState},
    app_state::lock_connection,
};

/// A route handler for closing an account, responds with the closed account.
///
/// Accounts are never removed from the database because the ledger refers to them.
pub async fn close_account_endpoint(
    State(state): State<AccountState>,
    Path(account_id): Path<AccountId>,
) -> Result<Json<Account>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    match close_account(account_id, &connection) {
        Ok(account) => {
            tracing::info!("Closed account {account_id}");
            Ok(Json(account))
        }
        Err(error) => {
            tracing::debug!("Could not close account {account_id}: {error}");
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use rust_decimal_macros::dec;

    use crate::{
        account::{Account, AccountStatus},
        endpoints::{self, format_endpoint},
        test_utils::{
            create_test_account, create_test_branch, create_test_customer, fund_account,
            get_test_server_with_state, get_test_state,
        },
    };

    #[tokio::test]
    async fn close_empty_account() {
        let state = get_test_state();
        let account = {
            let connection = state.db_connection.lock().unwrap();
            let branch = create_test_branch(&connection);
            let customer = create_test_customer(&connection);
            create_test_account(customer.id, branch.id, &connection)
        };
        let server = get_test_server_with_state(state);

        let closed: Account = server
            .delete(&format_endpoint(endpoints::ACCOUNT, account.id))
            .await
            .json();

        assert_eq!(closed.status, AccountStatus::Closed);
    }

    #[tokio::test]
    async fn close_funded_account_is_conflict() {
        let state = get_test_state();
        let account = {
            let connection = state.db_connection.lock().unwrap();
            let branch = create_test_branch(&connection);
            let customer = create_test_customer(&connection);
            let account = create_test_account(customer.id, branch.id, &connection);
            fund_account(account.id, dec!(1), &connection)
        };
        let server = get_test_server_with_state(state);

        server
            .delete(&format_endpoint(endpoints::ACCOUNT, account.id))
            .await
            .assert_status(StatusCode::CONFLICT);
    }
}
