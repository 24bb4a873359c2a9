//! The loan, loan request and payment models, their tables and the queries for reading them.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    account::AccountId,
    branch::BranchId,
    customer::CustomerId,
    database_id::DatabaseId,
    db::sql_text_enum,
    money::Money,
};

pub type LoanRequestId = DatabaseId;
pub type LoanId = DatabaseId;
pub type PaymentId = DatabaseId;

// ============================================================================
// MODELS
// ============================================================================

/// Where a loan request is in the approval process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanRequestStatus {
    Pending,
    Approved,
    Rejected,
}

sql_text_enum!(LoanRequestStatus {
    Pending => "pending",
    Approved => "approved",
    Rejected => "rejected",
});

/// A customer's application for a loan, paid into one of their accounts if approved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanRequest {
    pub id: LoanRequestId,
    pub customer_id: CustomerId,
    /// The account the loan is paid into and repaid from by default.
    pub account_id: AccountId,
    /// The principal the customer asked for.
    pub amount: Money,
    /// The number of monthly installments.
    pub term_months: i64,
    pub purpose: String,
    pub status: LoanRequestStatus,
    /// The reason given by staff when the request was decided.
    pub decision_note: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub decided_at: Option<OffsetDateTime>,
}

/// Whether a loan is being repaid on time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    /// No installment is overdue.
    Active,
    /// At least one installment is overdue.
    Delinquent,
    /// Every installment has been paid.
    PaidOff,
}

sql_text_enum!(LoanStatus {
    Active => "active",
    Delinquent => "delinquent",
    PaidOff => "paid_off",
});

/// Money lent to a customer, repaid in monthly installments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub loan_request_id: LoanRequestId,
    pub customer_id: CustomerId,
    pub account_id: AccountId,
    /// The branch of the account the loan was paid into.
    pub branch_id: BranchId,
    pub principal: Money,
    /// The yearly flat interest rate in basis points, e.g. 550 is 5.5%.
    pub interest_rate_bps: i64,
    pub term_months: i64,
    /// Principal plus interest.
    pub total_repayable: Money,
    /// What is left to repay.
    pub outstanding: Money,
    pub status: LoanStatus,
    /// The date the loan was approved. Installments fall due monthly after it.
    pub start_date: Date,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Whether an installment has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Overdue,
    Paid,
}

sql_text_enum!(PaymentStatus {
    Pending => "pending",
    Overdue => "overdue",
    Paid => "paid",
});

/// One scheduled installment of a loan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub loan_id: LoanId,
    /// The 1-based position of the installment in the schedule.
    pub installment: i64,
    pub due_date: Date,
    pub amount: Money,
    pub status: PaymentStatus,
    /// Whether the customer has been reminded that the installment is due soon.
    pub reminder_sent: bool,
    #[serde(with = "time::serde::rfc3339::option")]
    pub paid_at: Option<OffsetDateTime>,
    pub paid_from_account_id: Option<AccountId>,
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

pub fn create_loan_request_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS loan_request (
            id INTEGER PRIMARY KEY,
            customer_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            amount TEXT NOT NULL,
            term_months INTEGER NOT NULL CHECK (term_months BETWEEN 1 AND 360),
            purpose TEXT NOT NULL,
            status TEXT NOT NULL,
            decision_note TEXT,
            created_at TEXT NOT NULL,
            decided_at TEXT,
            FOREIGN KEY(customer_id) REFERENCES customer(id) ON UPDATE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn create_loan_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS loan (
            id INTEGER PRIMARY KEY,
            loan_request_id INTEGER NOT NULL UNIQUE,
            customer_id INTEGER NOT NULL,
            account_id INTEGER NOT NULL,
            branch_id INTEGER NOT NULL,
            principal TEXT NOT NULL,
            interest_rate_bps INTEGER NOT NULL,
            term_months INTEGER NOT NULL,
            total_repayable TEXT NOT NULL,
            outstanding TEXT NOT NULL,
            status TEXT NOT NULL,
            start_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(loan_request_id) REFERENCES loan_request(id) ON UPDATE CASCADE,
            FOREIGN KEY(customer_id) REFERENCES customer(id) ON UPDATE CASCADE,
            FOREIGN KEY(account_id) REFERENCES account(id) ON UPDATE CASCADE,
            FOREIGN KEY(branch_id) REFERENCES branch(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn create_payment_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS payment (
            id INTEGER PRIMARY KEY,
            loan_id INTEGER NOT NULL,
            installment INTEGER NOT NULL,
            due_date TEXT NOT NULL,
            amount TEXT NOT NULL,
            status TEXT NOT NULL,
            reminder_sent INTEGER NOT NULL DEFAULT 0,
            paid_at TEXT,
            paid_from_account_id INTEGER,
            UNIQUE(loan_id, installment),
            FOREIGN KEY(loan_id) REFERENCES loan(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(paid_from_account_id) REFERENCES account(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    // The sweep scans pending payments by due date.
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_payment_status_due_date ON payment(status, due_date)",
        (),
    )?;

    Ok(())
}

pub(super) const LOAN_REQUEST_COLUMNS: &str = "id, customer_id, account_id, amount, term_months, \
    purpose, status, decision_note, created_at, decided_at";

pub(super) const LOAN_COLUMNS: &str = "id, loan_request_id, customer_id, account_id, branch_id, \
    principal, interest_rate_bps, term_months, total_repayable, outstanding, status, start_date, \
    created_at";

pub(super) const PAYMENT_COLUMNS: &str = "id, loan_id, installment, due_date, amount, status, \
    reminder_sent, paid_at, paid_from_account_id";

pub(super) fn map_row_to_loan_request(row: &Row) -> Result<LoanRequest, rusqlite::Error> {
    Ok(LoanRequest {
        id: row.get(0)?,
        customer_id: row.get(1)?,
        account_id: row.get(2)?,
        amount: row.get(3)?,
        term_months: row.get(4)?,
        purpose: row.get(5)?,
        status: row.get(6)?,
        decision_note: row.get(7)?,
        created_at: row.get(8)?,
        decided_at: row.get(9)?,
    })
}

pub(super) fn map_row_to_loan(row: &Row) -> Result<Loan, rusqlite::Error> {
    Ok(Loan {
        id: row.get(0)?,
        loan_request_id: row.get(1)?,
        customer_id: row.get(2)?,
        account_id: row.get(3)?,
        branch_id: row.get(4)?,
        principal: row.get(5)?,
        interest_rate_bps: row.get(6)?,
        term_months: row.get(7)?,
        total_repayable: row.get(8)?,
        outstanding: row.get(9)?,
        status: row.get(10)?,
        start_date: row.get(11)?,
        created_at: row.get(12)?,
    })
}

pub(crate) fn map_row_to_payment(row: &Row) -> Result<Payment, rusqlite::Error> {
    Ok(Payment {
        id: row.get(0)?,
        loan_id: row.get(1)?,
        installment: row.get(2)?,
        due_date: row.get(3)?,
        amount: row.get(4)?,
        status: row.get(5)?,
        reminder_sent: row.get(6)?,
        paid_at: row.get(7)?,
        paid_from_account_id: row.get(8)?,
    })
}

/// Get a loan request by its ID.
pub fn get_loan_request(id: LoanRequestId, connection: &Connection) -> Result<LoanRequest, Error> {
    connection
        .query_row(
            &format!("SELECT {LOAN_REQUEST_COLUMNS} FROM loan_request WHERE id = ?1"),
            params![id],
            map_row_to_loan_request,
        )
        .map_err(Error::from)
}

/// List loan requests, oldest first.
pub fn list_loan_requests(
    pending_only: bool,
    connection: &Connection,
) -> Result<Vec<LoanRequest>, Error> {
    connection
        .prepare(&format!(
            "SELECT {LOAN_REQUEST_COLUMNS} FROM loan_request
             WHERE ?1 = 0 OR status = 'pending'
             ORDER BY id ASC"
        ))?
        .query_map(params![pending_only], map_row_to_loan_request)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Get a loan by its ID.
pub fn get_loan(id: LoanId, connection: &Connection) -> Result<Loan, Error> {
    connection
        .query_row(
            &format!("SELECT {LOAN_COLUMNS} FROM loan WHERE id = ?1"),
            params![id],
            map_row_to_loan,
        )
        .map_err(Error::from)
}

/// List loans, optionally only those of one customer.
pub fn list_loans(
    customer_id: Option<CustomerId>,
    connection: &Connection,
) -> Result<Vec<Loan>, Error> {
    connection
        .prepare(&format!(
            "SELECT {LOAN_COLUMNS} FROM loan
             WHERE ?1 IS NULL OR customer_id = ?1
             ORDER BY id ASC"
        ))?
        .query_map(params![customer_id], map_row_to_loan)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Get a payment by its ID.
pub fn get_payment(id: PaymentId, connection: &Connection) -> Result<Payment, Error> {
    connection
        .query_row(
            &format!("SELECT {PAYMENT_COLUMNS} FROM payment WHERE id = ?1"),
            params![id],
            map_row_to_payment,
        )
        .map_err(Error::from)
}

/// Get the payment schedule of a loan in installment order.
///
/// # Errors
/// Returns [Error::NotFound] if the loan does not exist.
pub fn list_loan_payments(loan_id: LoanId, connection: &Connection) -> Result<Vec<Payment>, Error> {
    get_loan(loan_id, connection)?;

    connection
        .prepare(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment WHERE loan_id = ?1 ORDER BY installment ASC"
        ))?
        .query_map(params![loan_id], map_row_to_payment)?
        .map(|row| row.map_err(Error::from))
        .collect()
}
