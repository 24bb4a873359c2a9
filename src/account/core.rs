use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    branch::{BranchId, get_branch},
    customer::{CustomerId, get_customer},
    database_id::DatabaseId,
    db::sql_text_enum,
    money::Money,
    notification::{NotificationKind, create_notification},
    transaction::apply_deposit,
};

pub type AccountId = DatabaseId;

/// The product an account was opened as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountKind {
    Savings,
    Checking,
}

sql_text_enum!(AccountKind {
    Savings => "savings",
    Checking => "checking",
});

/// Whether money can move in or out of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    /// The account can be credited and debited.
    Active,
    /// The account has been frozen by staff and its balance cannot change.
    Frozen,
    /// The account has been closed. Closed accounts are kept for their ledger history.
    Closed,
}

sql_text_enum!(AccountStatus {
    Active => "active",
    Frozen => "frozen",
    Closed => "closed",
});

/// A customer's balance held at a branch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The customer who owns the account.
    pub customer_id: CustomerId,
    /// The branch the account is held at.
    pub branch_id: BranchId,
    /// The kind of account.
    pub kind: AccountKind,
    /// The balance.
    pub balance: Money,
    /// Whether the account can be used.
    pub status: AccountStatus,
    /// When the account was opened.
    #[serde(with = "time::serde::rfc3339")]
    pub opened_at: OffsetDateTime,
}

/// The data needed to open an account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAccount {
    /// The customer who will own the account.
    pub customer_id: CustomerId,
    /// The branch the account will be held at.
    pub branch_id: BranchId,
    /// The kind of account.
    pub kind: AccountKind,
    /// An optional amount to deposit as soon as the account is opened.
    #[serde(default)]
    pub initial_deposit: Option<Money>,
}

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL,
            branch_id INTEGER NOT NULL,
            kind TEXT NOT NULL CHECK (kind IN ('savings', 'checking')),
            balance TEXT NOT NULL,
            status TEXT NOT NULL CHECK (status IN ('active', 'frozen', 'closed')),
            opened_at TEXT NOT NULL,
            FOREIGN KEY(customer_id) REFERENCES customer(id) ON UPDATE CASCADE,
            FOREIGN KEY(branch_id) REFERENCES branch(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        branch_id: row.get(2)?,
        kind: row.get(3)?,
        balance: row.get(4)?,
        status: row.get(5)?,
        opened_at: row.get(6)?,
    })
}

/// Open a new account for an existing customer at an existing branch.
///
/// If `form.initial_deposit` is set, the deposit is made as part of opening
/// the account: either both happen or neither does.
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if the initial deposit is not a valid amount,
/// - [Error::InvalidReference] if the customer or branch does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn open_account(form: &OpenAccount, connection: &Connection) -> Result<Account, Error> {
    let initial_deposit = form
        .initial_deposit
        .map(Money::validate_amount)
        .transpose()?;

    get_customer(form.customer_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::InvalidReference(format!("customer {} does not exist", form.customer_id))
        }
        error => error,
    })?;
    get_branch(form.branch_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::InvalidReference(format!("branch {} does not exist", form.branch_id))
        }
        error => error,
    })?;

    let transaction = connection.unchecked_transaction()?;

    let account_id: AccountId = transaction.query_row(
        "INSERT INTO account (customer_id, branch_id, kind, balance, status, opened_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         RETURNING id",
        params![
            form.customer_id,
            form.branch_id,
            form.kind,
            Money::zero(),
            AccountStatus::Active,
            OffsetDateTime::now_utc()
        ],
        |row| row.get(0),
    )?;

    create_notification(
        form.customer_id,
        NotificationKind::General,
        "Account opened",
        &format!("Your {} account #{account_id} is now open.", form.kind),
        &transaction,
    )?;

    if let Some(amount) = initial_deposit {
        apply_deposit(account_id, amount, Some("Initial deposit"), &transaction)?;
    }

    let account = get_account(account_id, &transaction)?;
    transaction.commit()?;

    Ok(account)
}

/// Get an account by its ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account with `id`.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .query_row(
            "SELECT id, customer_id, branch_id, kind, balance, status, opened_at
             FROM account WHERE id = ?1",
            params![id],
            map_row_to_account,
        )
        .map_err(Error::from)
}

/// Get an account that can be credited or debited.
///
/// # Errors
/// Returns [Error::NotFound] if there is no account with `id`, or
/// [Error::AccountNotActive] if the account is frozen or closed.
pub fn get_active_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = get_account(id, connection)?;

    if account.status != AccountStatus::Active {
        return Err(Error::AccountNotActive(id));
    }

    Ok(account)
}

/// List accounts, optionally only those owned by one customer.
pub fn list_accounts(
    customer_id: Option<CustomerId>,
    connection: &Connection,
) -> Result<Vec<Account>, Error> {
    connection
        .prepare(
            "SELECT id, customer_id, branch_id, kind, balance, status, opened_at
             FROM account
             WHERE ?1 IS NULL OR customer_id = ?1
             ORDER BY id",
        )?
        .query_map(params![customer_id], map_row_to_account)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Overwrite the balance of an account.
///
/// Only the balance-mutation operations should call this, after checking the
/// account is active and has enough money.
pub fn set_account_balance(
    id: AccountId,
    balance: Money,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE account SET balance = ?1 WHERE id = ?2",
        params![balance, id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Freeze or unfreeze an account.
///
/// # Errors
/// Returns [Error::InvalidRequest] if `status` is [AccountStatus::Closed] (use
/// [close_account] instead), or [Error::AccountNotActive] if the account has
/// already been closed.
pub fn set_account_status(
    id: AccountId,
    status: AccountStatus,
    connection: &Connection,
) -> Result<Account, Error> {
    if status == AccountStatus::Closed {
        return Err(Error::InvalidRequest(
            "accounts must be closed with the close operation".to_owned(),
        ));
    }

    let account = get_account(id, connection)?;

    if account.status == AccountStatus::Closed {
        return Err(Error::AccountNotActive(id));
    }

    if account.status == status {
        return Ok(account);
    }

    let transaction = connection.unchecked_transaction()?;

    transaction.execute(
        "UPDATE account SET status = ?1 WHERE id = ?2",
        params![status, id],
    )?;

    let (title, message) = match status {
        AccountStatus::Frozen => (
            "Account frozen",
            format!("Your account #{id} has been frozen. Contact your branch for details."),
        ),
        _ => (
            "Account reactivated",
            format!("Your account #{id} is active again."),
        ),
    };
    create_notification(
        account.customer_id,
        NotificationKind::General,
        title,
        &message,
        &transaction,
    )?;

    transaction.commit()?;

    Ok(Account { status, ..account })
}

/// Close an account.
///
/// The account must be empty and must not be tied to a pending loan request
/// or to a loan with unpaid installments.
///
/// # Errors
/// Returns [Error::AccountNotActive] if the account is already closed, or
/// [Error::AccountNotClosable] if one of the conditions above is not met.
pub fn close_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    let account = get_account(id, connection)?;

    if account.status == AccountStatus::Closed {
        return Err(Error::AccountNotActive(id));
    }

    if !account.balance.is_zero() {
        return Err(Error::AccountNotClosable(
            id,
            format!("the balance is {}", account.balance),
        ));
    }

    let unpaid_installments: i64 = connection.query_row(
        "SELECT COUNT(*) FROM payment
         INNER JOIN loan ON payment.loan_id = loan.id
         WHERE loan.account_id = ?1 AND payment.status != 'paid'",
        params![id],
        |row| row.get(0),
    )?;

    if unpaid_installments > 0 {
        return Err(Error::AccountNotClosable(
            id,
            format!("{unpaid_installments} loan installments are unpaid"),
        ));
    }

    let pending_requests: i64 = connection.query_row(
        "SELECT COUNT(*) FROM loan_request WHERE account_id = ?1 AND status = 'pending'",
        params![id],
        |row| row.get(0),
    )?;

    if pending_requests > 0 {
        return Err(Error::AccountNotClosable(
            id,
            "a loan request for the account is pending".to_owned(),
        ));
    }

    let transaction = connection.unchecked_transaction()?;

    transaction.execute(
        "UPDATE account SET status = ?1 WHERE id = ?2",
        params![AccountStatus::Closed, id],
    )?;
    create_notification(
        account.customer_id,
        NotificationKind::General,
        "Account closed",
        &format!("Your account #{id} has been closed."),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(Account {
        status: AccountStatus::Closed,
        ..account
    })
}


#[cfg(test)]
mod open_account_tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        branch::get_branch,
        money::Money,
        notification::list_notifications,
        test_utils::{create_test_branch, create_test_customer, get_test_connection},
        transaction::list_account_transactions,
    };

    use super::{AccountKind, AccountStatus, OpenAccount, get_account, list_accounts, open_account};

    #[test]
    fn opens_empty_active_account() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);

        let account = open_account(
            &OpenAccount {
                customer_id: customer.id,
                branch_id: branch.id,
                kind: AccountKind::Savings,
                initial_deposit: None,
            },
            &connection,
        )
        .unwrap();

        assert_eq!(account.balance, Money::zero());
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.kind, AccountKind::Savings);
        assert_eq!(get_account(account.id, &connection), Ok(account.clone()));
        assert_eq!(
            list_accounts(Some(customer.id), &connection),
            Ok(vec![account])
        );
        assert_eq!(
            list_notifications(customer.id, false, &connection)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn initial_deposit_is_recorded() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);

        let account = open_account(
            &OpenAccount {
                customer_id: customer.id,
                branch_id: branch.id,
                kind: AccountKind::Checking,
                initial_deposit: Some(Money::new(dec!(250.00))),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(account.balance, Money::new(dec!(250)));
        assert_eq!(
            get_branch(branch.id, &connection).unwrap().total_deposits,
            Money::new(dec!(250))
        );
        let ledger = list_account_transactions(account.id, 1, 10, &connection).unwrap();
        assert_eq!(ledger.total_items, 1);
    }

    #[test]
    fn invalid_initial_deposit_opens_nothing() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);

        let result = open_account(
            &OpenAccount {
                customer_id: customer.id,
                branch_id: branch.id,
                kind: AccountKind::Checking,
                initial_deposit: Some(Money::new(dec!(-5))),
            },
            &connection,
        );

        assert!(matches!(result, Err(Error::InvalidAmount(_))));
        assert_eq!(list_accounts(None, &connection), Ok(vec![]));
    }

    #[test]
    fn missing_customer_is_invalid_reference() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);

        let result = open_account(
            &OpenAccount {
                customer_id: 77,
                branch_id: branch.id,
                kind: AccountKind::Checking,
                initial_deposit: None,
            },
            &connection,
        );

        assert_eq!(
            result,
            Err(Error::InvalidReference("customer 77 does not exist".to_owned()))
        );
    }
}
