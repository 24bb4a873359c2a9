//! Loan origination and repayment.
//!
//! A customer submits a [LoanRequest]. Staff approve it, which creates a
//! [Loan] with a schedule of monthly [Payment]s and pays the principal into
//! the customer's account, or reject it. Installments are then paid one at a
//! time, in order, until the loan is paid off.

mod core;
mod endpoints;
mod origination;
mod repayment;
mod schedule;

pub use core::{
    Loan, LoanId, LoanRequest, LoanRequestId, LoanRequestStatus, LoanStatus, Payment, PaymentId,
    PaymentStatus, create_loan_request_table, create_loan_table, create_payment_table, get_loan,
    get_loan_request, get_payment, list_loan_payments, list_loan_requests, list_loans,
};
pub(crate) use core::map_row_to_payment;
pub use endpoints::{
    approve_loan_request_endpoint, confirm_payment_endpoint, get_loan_endpoint,
    get_loan_request_endpoint, list_loan_payments_endpoint, list_loan_requests_endpoint,
    list_loans_endpoint, reject_loan_request_endpoint, submit_loan_request_endpoint,
};
pub use origination::{
    ApprovedLoan, LoanRequestForm, approve_loan_request, reject_loan_request, submit_loan_request,
};
pub use repayment::{PaymentReceipt, confirm_payment};
