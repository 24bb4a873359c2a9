//! Roll-up figures for a single branch.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    branch::{Branch, BranchId, get_branch},
    money::Money,
};

/// A branch together with figures derived from its accounts and loans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchSummary {
    /// The branch and its running totals.
    pub branch: Branch,
    /// The number of accounts that have not been closed.
    pub open_account_count: u64,
    /// The sum of the balances of all accounts at the branch.
    pub total_balance: Money,
    /// The number of loans that are not yet paid off.
    pub open_loan_count: u64,
    /// The sum of the outstanding balances of those loans.
    pub outstanding_loans: Money,
}

/// Compute the summary for a branch.
///
/// # Errors
/// Returns [Error::NotFound] if there is no branch with `branch_id`.
pub fn get_branch_summary(
    branch_id: BranchId,
    connection: &Connection,
) -> Result<BranchSummary, Error> {
    let branch = get_branch(branch_id, connection)?;

    let balances = connection
        .prepare("SELECT balance FROM account WHERE branch_id = ?1 AND status != 'closed'")?
        .query_map(params![branch_id], |row| row.get::<_, Money>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let outstanding = connection
        .prepare("SELECT outstanding FROM loan WHERE branch_id = ?1 AND status != 'paid_off'")?
        .query_map(params![branch_id], |row| row.get::<_, Money>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BranchSummary {
        branch,
        open_account_count: balances.len() as u64,
        total_balance: balances
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)?,
        open_loan_count: outstanding.len() as u64,
        outstanding_loans: outstanding
            .into_iter()
            .try_fold(Money::zero(), Money::checked_add)?,
    })
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::{
        Error,
        money::Money,
        test_utils::{
            create_test_account, create_test_branch, create_test_customer, get_test_connection,
        },
        transaction::{deposit, withdraw},
    };

    use super::get_branch_summary;

    #[test]
    fn summarizes_accounts_and_totals() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_test_customer(&connection);
        let first = create_test_account(customer.id, branch.id, &connection);
        let second = create_test_account(customer.id, branch.id, &connection);
        deposit(first.id, Money::new(dec!(100)), None, &connection).unwrap();
        deposit(second.id, Money::new(dec!(50)), None, &connection).unwrap();
        withdraw(first.id, Money::new(dec!(30)), None, &connection).unwrap();

        let summary = get_branch_summary(branch.id, &connection).unwrap();

        assert_eq!(summary.open_account_count, 2);
        assert_eq!(summary.total_balance, Money::new(dec!(120)));
        assert_eq!(summary.branch.total_deposits, Money::new(dec!(150)));
        assert_eq!(summary.branch.total_withdrawals, Money::new(dec!(30)));
        assert_eq!(summary.open_loan_count, 0);
        assert_eq!(summary.outstanding_loans, Money::zero());
    }

    #[test]
    fn missing_branch_is_not_found() {
        let connection = get_test_connection();

        assert_eq!(get_branch_summary(1, &connection), Err(Error::NotFound));
    }
}
