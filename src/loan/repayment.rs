//! Paying loan installments.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{
    Error,
    account::{AccountId, get_account},
    branch::{BranchAggregate, add_to_branch_total},
    loan::{
        Loan, LoanStatus, Payment, PaymentId, PaymentStatus,
        core::{LOAN_COLUMNS, PAYMENT_COLUMNS, map_row_to_loan, map_row_to_payment},
        get_loan, get_payment,
    },
    money::Money,
    notification::{NotificationKind, create_notification},
    transaction::{Transaction, TransactionKind, debit_account, insert_transaction},
};

/// The result of paying an installment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentReceipt {
    /// The installment, now paid.
    pub payment: Payment,
    /// The loan after the payment.
    pub loan: Loan,
    /// The ledger entry for the payment.
    pub transaction: Transaction,
    /// The balance of the paying account after the payment.
    pub balance: Money,
}

/// Pay an installment from one of the borrower's accounts.
///
/// Installments must be paid in order. Once the last unpaid installment is
/// paid the loan is paid off. A delinquent loan becomes active again once it
/// has no overdue installments left.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if the payment or account does not exist,
/// - [Error::PaymentAlreadySettled] if the payment has been paid,
/// - [Error::PaymentOutOfOrder] if an earlier installment is unpaid,
/// - [Error::InvalidReference] if the account does not belong to the borrower,
/// - [Error::AccountNotActive] if the account is frozen or closed,
/// - [Error::InsufficientFunds] if the account cannot cover the installment.
pub fn confirm_payment(
    payment_id: PaymentId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<PaymentReceipt, Error> {
    let transaction = connection.unchecked_transaction()?;
    let receipt = apply_payment(payment_id, account_id, &transaction)?;
    transaction.commit()?;

    Ok(receipt)
}

fn apply_payment(
    payment_id: PaymentId,
    account_id: AccountId,
    connection: &Connection,
) -> Result<PaymentReceipt, Error> {
    let payment = get_payment(payment_id, connection)?;

    if payment.status == PaymentStatus::Paid {
        return Err(Error::PaymentAlreadySettled(payment_id));
    }

    let earliest_unpaid: i64 = connection.query_row(
        "SELECT MIN(installment) FROM payment WHERE loan_id = ?1 AND status != 'paid'",
        params![payment.loan_id],
        |row| row.get(0),
    )?;

    if payment.installment != earliest_unpaid {
        return Err(Error::PaymentOutOfOrder(payment_id, earliest_unpaid));
    }

    let loan = get_loan(payment.loan_id, connection)?;

    let account = get_account(account_id, connection)?;
    if account.customer_id != loan.customer_id {
        return Err(Error::InvalidReference(format!(
            "account {account_id} does not belong to the borrower of loan {}",
            loan.id
        )));
    }

    let account = debit_account(account_id, payment.amount, connection)?;

    let payment = connection
        .prepare(&format!(
            "UPDATE payment SET status = ?1, paid_at = ?2, paid_from_account_id = ?3
             WHERE id = ?4
             RETURNING {PAYMENT_COLUMNS}"
        ))?
        .query_row(
            params![
                PaymentStatus::Paid,
                OffsetDateTime::now_utc(),
                account_id,
                payment_id
            ],
            map_row_to_payment,
        )?;

    let (unpaid, overdue): (i64, i64) = connection.query_row(
        "SELECT
            COUNT(CASE WHEN status != 'paid' THEN 1 END),
            COUNT(CASE WHEN status = 'overdue' THEN 1 END)
         FROM payment WHERE loan_id = ?1",
        params![loan.id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let status = if unpaid == 0 {
        LoanStatus::PaidOff
    } else if overdue == 0 {
        LoanStatus::Active
    } else {
        loan.status
    };

    let outstanding = loan.outstanding.checked_sub(payment.amount)?;
    let loan = connection
        .prepare(&format!(
            "UPDATE loan SET outstanding = ?1, status = ?2 WHERE id = ?3 RETURNING {LOAN_COLUMNS}"
        ))?
        .query_row(
            params![outstanding, status, loan.id],
            map_row_to_loan,
        )?;

    add_to_branch_total(
        loan.branch_id,
        BranchAggregate::LoanRepayments,
        payment.amount,
        connection,
    )?;

    let transaction = insert_transaction(
        Transaction::build(
            TransactionKind::LoanPayment,
            payment.amount,
            &format!("Loan #{} installment {}", loan.id, payment.installment),
        )
        .from_account(account_id)
        .loan(loan.id),
        connection,
    )?;

    let (title, message) = if loan.status == LoanStatus::PaidOff {
        (
            "Loan paid off",
            format!(
                "Installment {} of {} was paid from account #{account_id}. Loan #{} is now fully repaid.",
                payment.installment, payment.amount, loan.id
            ),
        )
    } else {
        (
            "Loan payment received",
            format!(
                "Installment {} of {} was paid from account #{account_id}. {} is still outstanding on loan #{}.",
                payment.installment, payment.amount, loan.outstanding, loan.id
            ),
        )
    };
    create_notification(
        loan.customer_id,
        NotificationKind::Loan,
        title,
        &message,
        connection,
    )?;

    Ok(PaymentReceipt {
        payment,
        loan,
        transaction,
        balance: account.balance,
    })
}
