use rusqlite::Connection;
use rust_decimal::Decimal;

use crate::{
    account::{Account, AccountId, AccountKind, OpenAccount, get_account, open_account},
    branch::{Branch, BranchForm, BranchId, create_branch},
    customer::{Customer, CustomerForm, CustomerId, create_customer},
    db::initialize,
    money::Money,
    transaction::deposit,
};

pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");
    connection
}

#[track_caller]
pub(crate) fn create_test_branch(connection: &Connection) -> Branch {
    let count: i64 = connection
        .query_row("SELECT COUNT(*) FROM branch", [], |row| row.get(0))
        .expect("Could not count branches");

    create_branch(
        &BranchForm {
            name: format!("Branch {}", count + 1),
            address: "1 Test Street".to_owned(),
        },
        connection,
    )
    .expect("Could not create test branch")
}

#[track_caller]
pub(crate) fn create_test_customer(connection: &Connection) -> Customer {
    let count: i64 = connection
        .query_row("SELECT COUNT(*) FROM customer", [], |row| row.get(0))
        .expect("Could not count customers");

    create_customer(
        &CustomerForm {
            name: format!("Customer {}", count + 1),
            email: format!("customer{}@example.com", count + 1),
            phone: None,
        },
        connection,
    )
    .expect("Could not create test customer")
}

#[track_caller]
pub(crate) fn create_test_account(
    customer_id: CustomerId,
    branch_id: BranchId,
    connection: &Connection,
) -> Account {
    open_account(
        &OpenAccount {
            customer_id,
            branch_id,
            kind: AccountKind::Checking,
            initial_deposit: None,
        },
        connection,
    )
    .expect("Could not open test account")
}

/// Deposit `amount` into the account and return the updated account.
#[track_caller]
pub(crate) fn fund_account(account_id: AccountId, amount: Decimal, connection: &Connection) -> Account {
    deposit(account_id, Money::new(amount), None, connection).expect("Could not fund account");

    get_account(account_id, connection).expect("Could not get funded account")
}
