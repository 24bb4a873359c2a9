//! Defines the branch model, its table and the queries that keep its aggregates up to date.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId, money::Money};

pub type BranchId = DatabaseId;

/// An organizational unit of the bank that holds accounts and employees.
///
/// The `total_*` fields are running totals of the money that has moved
/// through the branch's accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    /// The id of the branch.
    pub id: BranchId,
    /// The unique name of the branch.
    pub name: String,
    /// The street address of the branch.
    pub address: String,
    /// The sum of all deposits into the branch's accounts, including incoming transfers.
    pub total_deposits: Money,
    /// The sum of all withdrawals from the branch's accounts, including outgoing transfers.
    pub total_withdrawals: Money,
    /// The sum of all loan principal paid out through the branch.
    pub total_loans_disbursed: Money,
    /// The sum of all loan installments repaid to the branch.
    pub total_loan_repayments: Money,
    /// When the branch was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to create or update a branch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchForm {
    /// The unique name of the branch.
    pub name: String,
    /// The street address of the branch.
    pub address: String,
}

/// One of the running totals kept on a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAggregate {
    Deposits,
    Withdrawals,
    LoansDisbursed,
    LoanRepayments,
}

impl BranchAggregate {
    fn column(&self) -> &'static str {
        match self {
            BranchAggregate::Deposits => "total_deposits",
            BranchAggregate::Withdrawals => "total_withdrawals",
            BranchAggregate::LoansDisbursed => "total_loans_disbursed",
            BranchAggregate::LoanRepayments => "total_loan_repayments",
        }
    }
}

pub fn create_branch_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS branch (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            address TEXT NOT NULL,
            total_deposits TEXT NOT NULL DEFAULT '0',
            total_withdrawals TEXT NOT NULL DEFAULT '0',
            total_loans_disbursed TEXT NOT NULL DEFAULT '0',
            total_loan_repayments TEXT NOT NULL DEFAULT '0',
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_branch(row: &Row) -> Result<Branch, rusqlite::Error> {
    Ok(Branch {
        id: row.get(0)?,
        name: row.get(1)?,
        address: row.get(2)?,
        total_deposits: row.get(3)?,
        total_withdrawals: row.get(4)?,
        total_loans_disbursed: row.get(5)?,
        total_loan_repayments: row.get(6)?,
        created_at: row.get(7)?,
    })
}

const BRANCH_COLUMNS: &str = "id, name, address, total_deposits, total_withdrawals, \
    total_loans_disbursed, total_loan_repayments, created_at";

fn validate_form(form: &BranchForm) -> Result<(), Error> {
    if form.name.trim().is_empty() {
        return Err(Error::EmptyField("branch name"));
    }

    if form.address.trim().is_empty() {
        return Err(Error::EmptyField("branch address"));
    }

    Ok(())
}

/// Create a new branch with all of its totals at zero.
///
/// # Errors
/// Returns an [Error::EmptyField] if the name or address is blank, or
/// [Error::Duplicate] if a branch with the same name exists.
pub fn create_branch(form: &BranchForm, connection: &Connection) -> Result<Branch, Error> {
    validate_form(form)?;

    let branch = connection
        .prepare(&format!(
            "INSERT INTO branch (name, address, created_at) VALUES (?1, ?2, ?3)
             RETURNING {BRANCH_COLUMNS}"
        ))?
        .query_row(
            params![
                form.name.trim(),
                form.address.trim(),
                OffsetDateTime::now_utc()
            ],
            map_row_to_branch,
        )?;

    Ok(branch)
}

/// Get a branch by its ID.
///
/// # Errors
/// Returns [Error::NotFound] if there is no branch with `id`.
pub fn get_branch(id: BranchId, connection: &Connection) -> Result<Branch, Error> {
    connection
        .query_row(
            &format!("SELECT {BRANCH_COLUMNS} FROM branch WHERE id = ?1"),
            params![id],
            map_row_to_branch,
        )
        .map_err(Error::from)
}

/// Get all branches ordered by name.
pub fn list_branches(connection: &Connection) -> Result<Vec<Branch>, Error> {
    connection
        .prepare(&format!("SELECT {BRANCH_COLUMNS} FROM branch ORDER BY name"))?
        .query_map([], map_row_to_branch)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Change the name and address of a branch.
///
/// # Errors
/// Returns [Error::NotFound] if there is no branch with `id`.
pub fn update_branch(
    id: BranchId,
    form: &BranchForm,
    connection: &Connection,
) -> Result<Branch, Error> {
    validate_form(form)?;

    let rows_affected = connection.execute(
        "UPDATE branch SET name = ?1, address = ?2 WHERE id = ?3",
        params![form.name.trim(), form.address.trim(), id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_branch(id, connection)
}

/// Delete a branch that no account, department or employee refers to.
///
/// # Errors
/// Returns [Error::NotFound] if there is no branch with `id`, or
/// [Error::RecordInUse] if the branch still has accounts, departments or employees.
pub fn delete_branch(id: BranchId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM branch WHERE id = ?1", params![id])
        .map_err(|error| match Error::from(error) {
            Error::InvalidReference(_) => Error::RecordInUse,
            error => error,
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Add `amount` to one of the running totals of a branch.
///
/// The caller is expected to run this inside the same database transaction
/// as the balance change it is recording.
///
/// # Errors
/// Returns [Error::NotFound] if there is no branch with `branch_id`, or
/// [Error::ArithmeticOverflow] if the total cannot be represented.
pub fn add_to_branch_total(
    branch_id: BranchId,
    aggregate: BranchAggregate,
    amount: Money,
    connection: &Connection,
) -> Result<Money, Error> {
    let column = aggregate.column();

    let current: Money = connection.query_row(
        &format!("SELECT {column} FROM branch WHERE id = ?1"),
        params![branch_id],
        |row| row.get(0),
    )?;
    let total = current.checked_add(amount)?;

    connection.execute(
        &format!("UPDATE branch SET {column} = ?1 WHERE id = ?2"),
        params![total, branch_id],
    )?;

    Ok(total)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        money::Money,
        test_utils::{create_test_account, create_test_customer, get_test_connection},
    };

    use super::{
        BranchAggregate, BranchForm, add_to_branch_total, create_branch, delete_branch,
        get_branch, list_branches, update_branch,
    };

    fn form(name: &str) -> BranchForm {
        BranchForm {
            name: name.to_owned(),
            address: "1 Queen Street".to_owned(),
        }
    }

    #[test]
    fn create_branch_starts_with_zero_totals() {
        let connection = get_test_connection();

        let branch = create_branch(&form("Downtown"), &connection).unwrap();

        assert_eq!(branch.name, "Downtown");
        assert_eq!(branch.total_deposits, Money::zero());
        assert_eq!(branch.total_withdrawals, Money::zero());
        assert_eq!(branch.total_loans_disbursed, Money::zero());
        assert_eq!(branch.total_loan_repayments, Money::zero());
        assert_eq!(get_branch(branch.id, &connection), Ok(branch));
    }

    #[test]
    fn create_branch_rejects_blank_name() {
        let connection = get_test_connection();

        let result = create_branch(&form("   "), &connection);

        assert_eq!(result, Err(Error::EmptyField("branch name")));
    }

    #[test]
    fn create_branch_rejects_duplicate_name() {
        let connection = get_test_connection();
        create_branch(&form("Downtown"), &connection).unwrap();

        let result = create_branch(&form("Downtown"), &connection);

        assert_eq!(result, Err(Error::Duplicate("name".to_owned())));
    }

    #[test]
    fn list_branches_orders_by_name() {
        let connection = get_test_connection();
        create_branch(&form("Uptown"), &connection).unwrap();
        create_branch(&form("Airport"), &connection).unwrap();

        let names: Vec<String> = list_branches(&connection)
            .unwrap()
            .into_iter()
            .map(|branch| branch.name)
            .collect();

        assert_eq!(names, ["Airport", "Uptown"]);
    }

    #[test]
    fn update_branch_changes_name_and_address() {
        let connection = get_test_connection();
        let branch = create_branch(&form("Downtown"), &connection).unwrap();

        let updated = update_branch(
            branch.id,
            &BranchForm {
                name: "Midtown".to_owned(),
                address: "2 King Street".to_owned(),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Midtown");
        assert_eq!(updated.address, "2 King Street");
        assert_eq!(updated.created_at, branch.created_at);
    }

    #[test]
    fn update_missing_branch_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(
            update_branch(42, &form("Nowhere"), &connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn delete_branch_with_accounts_is_rejected() {
        let connection = get_test_connection();
        let branch = create_branch(&form("Downtown"), &connection).unwrap();
        let customer = create_test_customer(&connection);
        create_test_account(customer.id, branch.id, &connection);

        assert_eq!(delete_branch(branch.id, &connection), Err(Error::RecordInUse));
    }

    #[test]
    fn delete_empty_branch_succeeds() {
        let connection = get_test_connection();
        let branch = create_branch(&form("Downtown"), &connection).unwrap();

        assert_eq!(delete_branch(branch.id, &connection), Ok(()));
        assert_eq!(get_branch(branch.id, &connection), Err(Error::NotFound));
        assert_eq!(delete_branch(branch.id, &connection), Err(Error::NotFound));
    }

    #[test]
    fn add_to_branch_total_accumulates() {
        let connection = get_test_connection();
        let branch = create_branch(&form("Downtown"), &connection).unwrap();

        add_to_branch_total(
            branch.id,
            BranchAggregate::Deposits,
            Money::new(dec!(10.50)),
            &connection,
        )
        .unwrap();
        let total = add_to_branch_total(
            branch.id,
            BranchAggregate::Deposits,
            Money::new(dec!(0.25)),
            &connection,
        )
        .unwrap();

        assert_eq!(total, Money::new(dec!(10.75)));
        let branch = get_branch(branch.id, &connection).unwrap();
        assert_eq!(branch.total_deposits, Money::new(dec!(10.75)));
        assert_eq!(branch.total_withdrawals, Money::zero());
    }

    #[test]
    fn add_to_missing_branch_is_not_found() {
        let connection = get_test_connection();

        let result = add_to_branch_total(
            7,
            BranchAggregate::Withdrawals,
            Money::new(dec!(1)),
            &connection,
        );

        assert_eq!(result, Err(Error::NotFound));
    }
}
