//! Defines the ledger model and the queries for reading it.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::{AccountId, get_account},
    database_id::DatabaseId,
    db::sql_text_enum,
    loan::LoanId,
    money::Money,
    pagination::Page,
};

pub type TransactionId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

/// What caused money to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    Transfer,
    LoanDisbursement,
    LoanPayment,
}

sql_text_enum!(TransactionKind {
    Deposit => "deposit",
    Withdrawal => "withdrawal",
    Transfer => "transfer",
    LoanDisbursement => "loan_disbursement",
    LoanPayment => "loan_payment",
});

/// A ledger entry for one balance-affecting operation.
///
/// Money leaves `from_account_id` and arrives in `to_account_id`. Deposits and
/// loan disbursements only have a destination, withdrawals and loan payments
/// only have a source, transfers have both.
///
/// To create a new `Transaction`, use [Transaction::build].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// What kind of operation moved the money.
    pub kind: TransactionKind,
    /// The amount of money moved. Always positive.
    pub amount: Money,
    /// The account the money was taken from.
    pub from_account_id: Option<AccountId>,
    /// The account the money was paid into.
    pub to_account_id: Option<AccountId>,
    /// The loan the money was lent or repaid against.
    pub loan_id: Option<LoanId>,
    /// A text description of what the transaction was for.
    pub description: String,
    /// When the transaction happened.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Create a new transaction.
    ///
    /// Shortcut for [TransactionBuilder] for discoverability.
    pub fn build(kind: TransactionKind, amount: Money, description: &str) -> TransactionBuilder {
        TransactionBuilder {
            kind,
            amount,
            description: description.to_owned(),
            from_account_id: None,
            to_account_id: None,
            loan_id: None,
        }
    }
}

/// A builder for ledger entries, see [Transaction::build].
#[derive(Debug, PartialEq, Clone)]
pub struct TransactionBuilder {
    pub kind: TransactionKind,
    pub amount: Money,
    pub description: String,
    pub from_account_id: Option<AccountId>,
    pub to_account_id: Option<AccountId>,
    pub loan_id: Option<LoanId>,
}

impl TransactionBuilder {
    /// Set the account the money is taken from.
    pub fn from_account(mut self, account_id: AccountId) -> Self {
        self.from_account_id = Some(account_id);
        self
    }

    /// Set the account the money is paid into.
    pub fn to_account(mut self, account_id: AccountId) -> Self {
        self.to_account_id = Some(account_id);
        self
    }

    /// Set the loan the transaction belongs to.
    pub fn loan(mut self, loan_id: LoanId) -> Self {
        self.loan_id = Some(loan_id);
        self
    }
}

/// A transaction seen from one account: debits are negative, credits positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub transaction_id: TransactionId,
    pub kind: TransactionKind,
    /// The signed change to the account's balance.
    pub amount: Money,
    /// The other account involved in a transfer.
    pub counterparty_account_id: Option<AccountId>,
    pub loan_id: Option<LoanId>,
    pub description: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl LedgerEntry {
    /// View `transaction` from the point of view of `account_id`.
    pub fn for_account(transaction: Transaction, account_id: AccountId) -> Self {
        let is_debit = transaction.from_account_id == Some(account_id);

        let (amount, counterparty_account_id) = if is_debit {
            (-transaction.amount, transaction.to_account_id)
        } else {
            (transaction.amount, transaction.from_account_id)
        };

        Self {
            transaction_id: transaction.id,
            kind: transaction.kind,
            amount,
            counterparty_account_id,
            loan_id: transaction.loan_id,
            description: transaction.description,
            created_at: transaction.created_at,
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            kind TEXT NOT NULL,
            amount TEXT NOT NULL,
            from_account_id INTEGER,
            to_account_id INTEGER,
            loan_id INTEGER,
            description TEXT NOT NULL,
            created_at TEXT NOT NULL,
            CHECK (from_account_id IS NOT NULL OR to_account_id IS NOT NULL),
            FOREIGN KEY(from_account_id) REFERENCES account(id) ON UPDATE CASCADE,
            FOREIGN KEY(to_account_id) REFERENCES account(id) ON UPDATE CASCADE,
            FOREIGN KEY(loan_id) REFERENCES loan(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_from_account ON \"transaction\"(from_account_id)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_transaction_to_account ON \"transaction\"(to_account_id)",
        (),
    )?;

    Ok(())
}

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        kind: row.get(1)?,
        amount: row.get(2)?,
        from_account_id: row.get(3)?,
        to_account_id: row.get(4)?,
        loan_id: row.get(5)?,
        description: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const TRANSACTION_COLUMNS: &str =
    "id, kind, amount, from_account_id, to_account_id, loan_id, description, created_at";

/// Write a ledger entry.
///
/// The caller is responsible for changing the balances the entry describes
/// within the same database transaction.
pub fn insert_transaction(
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\"
             (kind, amount, from_account_id, to_account_id, loan_id, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                builder.kind,
                builder.amount,
                builder.from_account_id,
                builder.to_account_id,
                builder.loan_id,
                builder.description,
                OffsetDateTime::now_utc()
            ],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Retrieve a transaction in the database by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .query_row(
            &format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1"),
            params![id],
            map_transaction_row,
        )
        .map_err(Error::from)
}

/// Get one page of the transactions that touched an account, newest first.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist.
pub fn list_account_transactions(
    account_id: AccountId,
    page: u64,
    per_page: u64,
    connection: &Connection,
) -> Result<Page<LedgerEntry>, Error> {
    get_account(account_id, connection)?;

    let total_items: i64 = connection.query_row(
        "SELECT COUNT(*) FROM \"transaction\" WHERE from_account_id = ?1 OR to_account_id = ?1",
        params![account_id],
        |row| row.get(0),
    )?;

    let limit = i64::try_from(per_page).unwrap_or(i64::MAX);
    let offset = i64::try_from(page.saturating_sub(1).saturating_mul(per_page)).unwrap_or(i64::MAX);
    let items = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE from_account_id = ?1 OR to_account_id = ?1
             ORDER BY id DESC
             LIMIT ?2 OFFSET ?3"
        ))?
        .query_map(params![account_id, limit, offset], map_transaction_row)?
        .map(|row| {
            row.map(|transaction| LedgerEntry::for_account(transaction, account_id))
                .map_err(Error::from)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, page, per_page, total_items as u64))
}

/// Get every transaction that touched an account, oldest first.
pub fn all_account_transactions(
    account_id: AccountId,
    connection: &Connection,
) -> Result<Vec<LedgerEntry>, Error> {
    get_account(account_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE from_account_id = ?1 OR to_account_id = ?1
             ORDER BY id ASC"
        ))?
        .query_map(params![account_id], map_transaction_row)?
        .map(|row| {
            row.map(|transaction| LedgerEntry::for_account(transaction, account_id))
                .map_err(Error::from)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        money::Money,
        test_utils::{
            create_test_account, create_test_branch, create_test_customer, fund_account,
            get_test_connection,
        },
        transaction::{transfer, withdraw},
    };

    use super::{
        Transaction, TransactionKind, get_transaction, insert_transaction,
        list_account_transactions,
    };

    #[test]
    fn insert_and_get_transaction() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let account = create_test_account(customer.id, branch.id, &connection);

        let transaction = insert_transaction(
            Transaction::build(TransactionKind::Deposit, Money::new(dec!(5)), "Cash")
                .to_account(account.id),
            &connection,
        )
        .unwrap();

        assert_eq!(transaction.to_account_id, Some(account.id));
        assert_eq!(transaction.from_account_id, None);
        assert_eq!(get_transaction(transaction.id, &connection), Ok(transaction));
    }

    #[test]
    fn transaction_needs_an_account() {
        let connection = get_test_connection();

        let result = insert_transaction(
            Transaction::build(TransactionKind::Deposit, Money::new(dec!(5)), "Cash"),
            &connection,
        );

        assert!(matches!(result, Err(Error::SqlError(_))));
    }

    #[test]
    fn ledger_is_signed_from_account_point_of_view() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let source = create_test_account(customer.id, branch.id, &connection);
        let destination = create_test_account(customer.id, branch.id, &connection);
        fund_account(source.id, dec!(100), &connection);
        transfer(source.id, destination.id, Money::new(dec!(40)), None, &connection).unwrap();
        withdraw(source.id, Money::new(dec!(10)), None, &connection).unwrap();

        let page = list_account_transactions(source.id, 1, 10, &connection).unwrap();

        let amounts: Vec<Money> = page.items.iter().map(|entry| entry.amount).collect();
        assert_eq!(
            amounts,
            [
                Money::new(dec!(-10)),
                Money::new(dec!(-40)),
                Money::new(dec!(100))
            ]
        );
        assert_eq!(page.items[1].counterparty_account_id, Some(destination.id));
        assert_eq!(page.items[1].kind, TransactionKind::Transfer);

        let destination_page =
            list_account_transactions(destination.id, 1, 10, &connection).unwrap();
        assert_eq!(destination_page.items[0].amount, Money::new(dec!(40)));
        assert_eq!(
            destination_page.items[0].counterparty_account_id,
            Some(source.id)
        );
    }

    #[test]
    fn pages_through_ledger() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let account = create_test_account(customer.id, branch.id, &connection);
        for _ in 0..5 {
            fund_account(account.id, dec!(1), &connection);
        }

        let page = list_account_transactions(account.id, 2, 2, &connection).unwrap();

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_items, 5);
        assert_eq!(page.total_pages, 3);
    }

    #[test]
    fn ledger_of_missing_account_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            list_account_transactions(9, 1, 10, &connection),
            Err(Error::NotFound)
        );
    }
}
