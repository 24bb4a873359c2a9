//! Submitting, approving and rejecting loan requests.

use rusqlite::{Connection, params};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::{AccountId, AccountStatus, get_account},
    branch::{BranchAggregate, add_to_branch_total},
    customer::{CustomerId, get_customer},
    loan::{
        Loan, LoanRequest, LoanRequestId, LoanRequestStatus, LoanStatus, Payment, PaymentStatus,
        core::{
            LOAN_COLUMNS, LOAN_REQUEST_COLUMNS, PAYMENT_COLUMNS, map_row_to_loan,
            map_row_to_loan_request, map_row_to_payment,
        },
        get_loan_request,
        schedule::{build_schedule, flat_interest_total},
    },
    money::Money,
    notification::{NotificationKind, create_notification},
    transaction::{Transaction, TransactionKind, credit_account, insert_transaction},
};

/// The longest loan term that can be requested.
pub const MAX_TERM_MONTHS: i64 = 360;

/// The highest yearly interest rate staff may approve a loan at, in basis points.
pub const MAX_INTEREST_RATE_BPS: i64 = 10_000;

/// The data needed to apply for a loan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoanRequestForm {
    /// The customer applying for the loan.
    pub customer_id: CustomerId,
    /// The customer's account to pay the loan into.
    pub account_id: AccountId,
    /// The principal to borrow.
    pub amount: Money,
    /// The number of monthly installments.
    pub term_months: i64,
    /// What the money is for.
    pub purpose: String,
}

/// A newly approved loan together with its repayment schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovedLoan {
    /// The loan.
    pub loan: Loan,
    /// The installments in order.
    pub payments: Vec<Payment>,
}

/// Apply for a loan.
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if the amount is not a valid amount,
/// - [Error::InvalidRequest] if the term is out of range, or the amount is
///   too small to split into that many installments,
/// - [Error::EmptyField] if no purpose is given,
/// - [Error::InvalidReference] if the customer or account does not exist, or
///   the account belongs to another customer,
/// - [Error::AccountNotActive] if the account is frozen or closed.
pub fn submit_loan_request(
    form: &LoanRequestForm,
    connection: &Connection,
) -> Result<LoanRequest, Error> {
    let amount = form.amount.validate_amount()?;

    if !(1..=MAX_TERM_MONTHS).contains(&form.term_months) {
        return Err(Error::InvalidRequest(format!(
            "the term must be between 1 and {MAX_TERM_MONTHS} months, got {}",
            form.term_months
        )));
    }

    // Each installment has to be at least one cent.
    let smallest_principal = Money::new(Decimal::new(form.term_months, 2));
    if amount < smallest_principal {
        return Err(Error::InvalidRequest(format!(
            "{amount} cannot be repaid over {} months",
            form.term_months
        )));
    }

    let purpose = form.purpose.trim();
    if purpose.is_empty() {
        return Err(Error::EmptyField("loan purpose"));
    }

    get_customer(form.customer_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::InvalidReference(format!("customer {} does not exist", form.customer_id))
        }
        error => error,
    })?;

    let account = get_account(form.account_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::InvalidReference(format!("account {} does not exist", form.account_id))
        }
        error => error,
    })?;

    if account.customer_id != form.customer_id {
        return Err(Error::InvalidReference(format!(
            "account {} does not belong to customer {}",
            account.id, form.customer_id
        )));
    }

    if account.status != AccountStatus::Active {
        return Err(Error::AccountNotActive(account.id));
    }

    let transaction = connection.unchecked_transaction()?;

    let request = transaction
        .prepare(&format!(
            "INSERT INTO loan_request
             (customer_id, account_id, amount, term_months, purpose, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {LOAN_REQUEST_COLUMNS}"
        ))?
        .query_row(
            params![
                form.customer_id,
                form.account_id,
                amount,
                form.term_months,
                purpose,
                LoanRequestStatus::Pending,
                OffsetDateTime::now_utc()
            ],
            map_row_to_loan_request,
        )?;

    create_notification(
        request.customer_id,
        NotificationKind::Loan,
        "Loan request received",
        &format!(
            "We received your request #{} to borrow {amount} over {} months.",
            request.id, request.term_months
        ),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(request)
}

fn get_pending_loan_request(
    id: LoanRequestId,
    connection: &Connection,
) -> Result<LoanRequest, Error> {
    let request = get_loan_request(id, connection)?;

    if request.status != LoanRequestStatus::Pending {
        return Err(Error::LoanRequestAlreadyDecided(id));
    }

    Ok(request)
}

fn mark_decided(
    id: LoanRequestId,
    status: LoanRequestStatus,
    note: Option<&str>,
    connection: &Connection,
) -> Result<LoanRequest, Error> {
    connection
        .prepare(&format!(
            "UPDATE loan_request SET status = ?1, decision_note = ?2, decided_at = ?3
             WHERE id = ?4
             RETURNING {LOAN_REQUEST_COLUMNS}"
        ))?
        .query_row(
            params![
                status,
                note.map(str::trim).filter(|note| !note.is_empty()),
                OffsetDateTime::now_utc(),
                id
            ],
            map_row_to_loan_request,
        )
        .map_err(Error::from)
}

/// Approve a pending loan request on `today`.
///
/// Creates the loan and its flat-interest repayment schedule, pays the
/// principal into the request's account and notifies the customer.
///
/// # Errors
/// Returns:
/// - [Error::NotFound] if the request does not exist,
/// - [Error::LoanRequestAlreadyDecided] if it is not pending,
/// - [Error::InvalidRequest] if the interest rate is out of range or the
///   amount repayable is too large to represent,
/// - [Error::AccountNotActive] if the account was frozen or closed since the request.
pub fn approve_loan_request(
    id: LoanRequestId,
    interest_rate_bps: i64,
    note: Option<&str>,
    today: Date,
    connection: &Connection,
) -> Result<ApprovedLoan, Error> {
    if !(0..=MAX_INTEREST_RATE_BPS).contains(&interest_rate_bps) {
        return Err(Error::InvalidRequest(format!(
            "the interest rate must be between 0 and {MAX_INTEREST_RATE_BPS} basis points, got {interest_rate_bps}"
        )));
    }

    let transaction = connection.unchecked_transaction()?;

    let request = get_pending_loan_request(id, &transaction)?;
    let total = flat_interest_total(request.amount, interest_rate_bps, request.term_months)?;
    let schedule = build_schedule(total, request.term_months, today)?;

    let request = mark_decided(id, LoanRequestStatus::Approved, note, &transaction)?;

    // Paying the principal in checks that the account is still usable.
    let account = credit_account(request.account_id, request.amount, &transaction)?;

    let loan = transaction
        .prepare(&format!(
            "INSERT INTO loan
             (loan_request_id, customer_id, account_id, branch_id, principal, interest_rate_bps,
              term_months, total_repayable, outstanding, status, start_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
             RETURNING {LOAN_COLUMNS}"
        ))?
        .query_row(
            params![
                request.id,
                request.customer_id,
                account.id,
                account.branch_id,
                request.amount,
                interest_rate_bps,
                request.term_months,
                total,
                total,
                LoanStatus::Active,
                today,
                OffsetDateTime::now_utc()
            ],
            map_row_to_loan,
        )?;

    let mut insert_payment = transaction.prepare(&format!(
        "INSERT INTO payment (loan_id, installment, due_date, amount, status, reminder_sent)
         VALUES (?1, ?2, ?3, ?4, ?5, 0)
         RETURNING {PAYMENT_COLUMNS}"
    ))?;
    let payments = schedule
        .iter()
        .map(|row| {
            insert_payment
                .query_row(
                    params![
                        loan.id,
                        row.installment,
                        row.due_date,
                        row.amount,
                        PaymentStatus::Pending
                    ],
                    map_row_to_payment,
                )
                .map_err(Error::from)
        })
        .collect::<Result<Vec<_>, _>>()?;
    drop(insert_payment);

    add_to_branch_total(
        account.branch_id,
        BranchAggregate::LoansDisbursed,
        request.amount,
        &transaction,
    )?;
    insert_transaction(
        Transaction::build(
            TransactionKind::LoanDisbursement,
            request.amount,
            &format!("Loan #{} disbursement", loan.id),
        )
        .to_account(account.id)
        .loan(loan.id),
        &transaction,
    )?;

    let first_due = payments
        .first()
        .map(|payment| format!(" The first installment of {} is due on {}.", payment.amount, payment.due_date))
        .unwrap_or_default();
    create_notification(
        loan.customer_id,
        NotificationKind::Loan,
        "Loan approved",
        &format!(
            "Your loan request #{} was approved. {} was paid into account #{}. You will repay {} over {} months.{first_due}",
            request.id, loan.principal, account.id, loan.total_repayable, loan.term_months
        ),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(ApprovedLoan { loan, payments })
}

/// Reject a pending loan request and tell the customer why.
///
/// # Errors
/// Returns [Error::NotFound] if the request does not exist, or
/// [Error::LoanRequestAlreadyDecided] if it is not pending.
pub fn reject_loan_request(
    id: LoanRequestId,
    note: Option<&str>,
    connection: &Connection,
) -> Result<LoanRequest, Error> {
    let transaction = connection.unchecked_transaction()?;

    get_pending_loan_request(id, &transaction)?;
    let request = mark_decided(id, LoanRequestStatus::Rejected, note, &transaction)?;

    let reason = request
        .decision_note
        .as_deref()
        .map(|note| format!(" Reason: {note}"))
        .unwrap_or_default();
    create_notification(
        request.customer_id,
        NotificationKind::Loan,
        "Loan request declined",
        &format!("Your loan request #{} was declined.{reason}", request.id),
        &transaction,
    )?;

    transaction.commit()?;

    Ok(request)
}
