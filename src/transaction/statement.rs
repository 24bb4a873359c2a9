//! Account statements in CSV format.

use rusqlite::Connection;
use serde::Serialize;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    account::AccountId,
    money::Money,
    transaction::{TransactionId, all_account_transactions},
};

#[derive(Debug, Serialize)]
struct StatementRow {
    date: String,
    transaction_id: TransactionId,
    kind: &'static str,
    description: String,
    amount: String,
    balance: String,
}

/// Render every transaction of an account as CSV, oldest first, with the
/// running balance after each one.
///
/// # Errors
/// Returns [Error::NotFound] if the account does not exist.
pub fn account_statement_csv(account_id: AccountId, connection: &Connection) -> Result<String, Error> {
    let entries = all_account_transactions(account_id, connection)?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut balance = Money::zero();

    // The header row is otherwise only written along with the first record.
    if entries.is_empty() {
        writer.write_record(["date", "transaction_id", "kind", "description", "amount", "balance"])?;
    }

    for entry in entries {
        balance = balance.checked_add(entry.amount)?;

        writer.serialize(StatementRow {
            date: format_timestamp(entry.created_at),
            transaction_id: entry.transaction_id,
            kind: entry.kind.as_str(),
            description: entry.description,
            amount: entry.amount.to_string(),
            balance: balance.to_string(),
        })?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))?;

    String::from_utf8(bytes).map_err(|error| Error::CsvError(error.to_string()))
}

fn format_timestamp(timestamp: OffsetDateTime) -> String {
    timestamp
        .format(&Rfc3339)
        .unwrap_or_else(|_| timestamp.unix_timestamp().to_string())
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
        transaction::withdraw,
    };

    use super::account_statement_csv;

    #[test]
    fn statement_has_running_balance() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let account = create_test_account(customer.id, branch.id, &connection);
        fund_account(account.id, dec!(50), &connection);
        withdraw(account.id, Money::new(dec!(20)), Some("Groceries"), &connection).unwrap();

        let csv = account_statement_csv(account.id, &connection).unwrap();

        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "date,transaction_id,kind,description,amount,balance"
        );
        assert!(lines[1].ends_with(",deposit,Deposit,50.00,50.00"), "{}", lines[1]);
        assert!(
            lines[2].ends_with(",withdrawal,Groceries,-20.00,30.00"),
            "{}",
            lines[2]
        );
    }

    #[test]
    fn empty_statement_only_has_headers() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let account = create_test_account(customer.id, branch.id, &connection);

        let csv = account_statement_csv(account.id, &connection).unwrap();

        assert_eq!(csv, "date,transaction_id,kind,description,amount,balance\n");
    }

    #[test]
    fn statement_for_missing_account_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(account_statement_csv(42, &connection), Err(Error::NotFound));
    }
}
