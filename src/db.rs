//! Database initialization and helpers shared by the domain modules.

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};

use crate::{
    Error,
    account::create_account_table,
    branch::create_branch_table,
    customer::create_customer_table,
    department::create_department_table,
    employee::create_employee_table,
    loan::{create_loan_request_table, create_loan_table, create_payment_table},
    notification::create_notification_table,
    transaction::create_transaction_table,
};

/// Create all of the application's tables if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, since SQLite
/// leaves it off by default.
///
/// # Errors
/// Returns an error if any table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_branch_table(&transaction)?;
    create_department_table(&transaction)?;
    create_employee_table(&transaction)?;
    create_customer_table(&transaction)?;
    create_account_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_loan_request_table(&transaction)?;
    create_loan_table(&transaction)?;
    create_payment_table(&transaction)?;
    create_notification_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}

/// Implement `as_str`, `ToSql` and `FromSql` for a fieldless enum stored as TEXT.
///
/// The text values should match the enum's serde representation so that the
/// API and the database agree on names.
macro_rules! sql_text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// The text used to store this value in the database.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                match value.as_str()? {
                    $($text => Ok(Self::$variant),)+
                    other => Err(rusqlite::types::FromSqlError::Other(
                        format!("unknown {} \"{other}\"", stringify!($name)).into(),
                    )),
                }
            }
        }
    };
}

pub(crate) use sql_text_enum;
