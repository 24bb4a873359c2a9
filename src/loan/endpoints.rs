//! Route handlers for loan requests, loans and their payments.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    AppState, Error,
    account::AccountId,
    app_state::lock_connection,
    customer::CustomerId,
    loan::{
        ApprovedLoan, Loan, LoanId, LoanRequest, LoanRequestForm, LoanRequestId, Payment,
        PaymentId, PaymentReceipt, approve_loan_request, confirm_payment, get_loan,
        get_loan_request, list_loan_payments, list_loan_requests, list_loans,
        reject_loan_request, submit_loan_request,
    },
    timezone::today_in,
};

/// The state needed to manage loans.
#[derive(Debug, Clone)]
pub struct LoanState {
    /// The database connection for managing loans.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides which day a loan is approved on.
    pub local_timezone: String,
}

impl FromRef<AppState> for LoanState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Query parameters for listing loan requests.
#[derive(Debug, Default, Deserialize)]
pub struct LoanRequestFilter {
    /// Only include requests that have not been decided.
    #[serde(default)]
    pub pending_only: bool,
}

/// Query parameters for listing loans.
#[derive(Debug, Default, Deserialize)]
pub struct LoanFilter {
    /// Only include loans of this customer.
    pub customer_id: Option<CustomerId>,
}

/// The body of a loan approval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveForm {
    /// The yearly flat interest rate in basis points.
    pub interest_rate_bps: i64,
    /// An optional note for the customer.
    #[serde(default)]
    pub note: Option<String>,
}

/// The body of a loan rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RejectForm {
    /// The reason for the rejection.
    #[serde(default)]
    pub note: Option<String>,
}

/// The body of an installment payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmPaymentForm {
    /// The borrower's account to pay from.
    pub account_id: AccountId,
}

/// A route handler for applying for a loan, responds with 201 Created.
pub async fn submit_loan_request_endpoint(
    State(state): State<LoanState>,
    Json(form): Json<LoanRequestForm>,
) -> Result<(StatusCode, Json<LoanRequest>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let request = submit_loan_request(&form, &connection).inspect_err(|error| {
        tracing::debug!("Could not submit loan request {form:?}: {error}");
    })?;
    tracing::info!(
        "Customer {} requested a loan of {} over {} months",
        request.customer_id,
        request.amount,
        request.term_months
    );

    Ok((StatusCode::CREATED, Json(request)))
}

/// A route handler for listing loan requests.
pub async fn list_loan_requests_endpoint(
    State(state): State<LoanState>,
    Query(filter): Query<LoanRequestFilter>,
) -> Result<Json<Vec<LoanRequest>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_loan_requests(filter.pending_only, &connection).map(Json)
}

/// A route handler for getting a single loan request.
pub async fn get_loan_request_endpoint(
    State(state): State<LoanState>,
    Path(loan_request_id): Path<LoanRequestId>,
) -> Result<Json<LoanRequest>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_loan_request(loan_request_id, &connection).map(Json)
}

/// A route handler for approving a loan request as of today in the local timezone.
pub async fn approve_loan_request_endpoint(
    State(state): State<LoanState>,
    Path(loan_request_id): Path<LoanRequestId>,
    Json(form): Json<ApproveForm>,
) -> Result<(StatusCode, Json<ApprovedLoan>), Error> {
    let today = today_in(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    let approved = approve_loan_request(
        loan_request_id,
        form.interest_rate_bps,
        form.note.as_deref(),
        today,
        &connection,
    )?;
    tracing::info!(
        "Approved loan request {loan_request_id} as loan {} at {} bps",
        approved.loan.id,
        approved.loan.interest_rate_bps
    );

    Ok((StatusCode::CREATED, Json(approved)))
}

/// A route handler for rejecting a loan request.
pub async fn reject_loan_request_endpoint(
    State(state): State<LoanState>,
    Path(loan_request_id): Path<LoanRequestId>,
    Json(form): Json<RejectForm>,
) -> Result<Json<LoanRequest>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let request = reject_loan_request(loan_request_id, form.note.as_deref(), &connection)?;
    tracing::info!("Rejected loan request {loan_request_id}");

    Ok(Json(request))
}

/// A route handler for listing loans.
pub async fn list_loans_endpoint(
    State(state): State<LoanState>,
    Query(filter): Query<LoanFilter>,
) -> Result<Json<Vec<Loan>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_loans(filter.customer_id, &connection).map(Json)
}

/// A route handler for getting a single loan.
pub async fn get_loan_endpoint(
    State(state): State<LoanState>,
    Path(loan_id): Path<LoanId>,
) -> Result<Json<Loan>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_loan(loan_id, &connection).map(Json)
}

/// A route handler for the repayment schedule of a loan.
pub async fn list_loan_payments_endpoint(
    State(state): State<LoanState>,
    Path(loan_id): Path<LoanId>,
) -> Result<Json<Vec<Payment>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_loan_payments(loan_id, &connection).map(Json)
}

/// A route handler for paying a loan installment.
pub async fn confirm_payment_endpoint(
    State(state): State<LoanState>,
    Path(payment_id): Path<PaymentId>,
    Json(form): Json<ConfirmPaymentForm>,
) -> Result<Json<PaymentReceipt>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    let receipt = confirm_payment(payment_id, form.account_id, &connection).inspect_err(|error| {
        tracing::debug!(
            "Could not pay installment {payment_id} from account {}: {error}",
            form.account_id
        );
    })?;
    tracing::info!(
        "Installment {} of loan {} paid from account {}",
        receipt.payment.installment,
        receipt.loan.id,
        form.account_id
    );

    Ok(Json(receipt))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use serde_json::json;

    use crate::{
        account::Account,
        branch::Branch,
        customer::Customer,
        endpoints::{self, format_endpoint},
        loan::{ApprovedLoan, Loan, LoanRequest, LoanRequestStatus, LoanStatus, Payment, PaymentReceipt},
        test_utils::get_test_server,
    };

    async fn submit_request(server: &TestServer) -> (LoanRequest, Account) {
        let branch: Branch = server
            .post(endpoints::BRANCHES)
            .json(&json!({ "name": "Lending", "address": "9 Credit Lane" }))
            .await
            .json();
        let customer: Customer = server
            .post(endpoints::CUSTOMERS)
            .json(&json!({ "name": "Barbara", "email": "barbara@example.com" }))
            .await
            .json();
        let account: Account = server
            .post(endpoints::ACCOUNTS)
            .json(&json!({
                "customer_id": customer.id,
                "branch_id": branch.id,
                "kind": "checking"
            }))
            .await
            .json();

        let response = server
            .post(endpoints::LOAN_REQUESTS)
            .json(&json!({
                "customer_id": customer.id,
                "account_id": account.id,
                "amount": "600.00",
                "term_months": 6,
                "purpose": "Bicycle"
            }))
            .await;
        response.assert_status(StatusCode::CREATED);

        (response.json(), account)
    }

    #[tokio::test]
    async fn full_loan_lifecycle() {
        let server = get_test_server();
        let (request, account) = submit_request(&server).await;

        let response = server
            .post(&format_endpoint(endpoints::APPROVE_LOAN_REQUEST, request.id))
            .json(&json!({ "interest_rate_bps": 0 }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let approved: ApprovedLoan = response.json();
        assert_eq!(approved.payments.len(), 6);

        let payments: Vec<Payment> = server
            .get(&format_endpoint(endpoints::LOAN_PAYMENTS, approved.loan.id))
            .await
            .json();
        assert_eq!(payments, approved.payments);

        for payment in &payments {
            server
                .post(&format_endpoint(endpoints::CONFIRM_PAYMENT, payment.id))
                .json(&json!({ "account_id": account.id }))
                .await
                .assert_status_ok();
        }

        let loan: Loan = server
            .get(&format_endpoint(endpoints::LOAN, approved.loan.id))
            .await
            .json();
        assert_eq!(loan.status, LoanStatus::PaidOff);

        let loans: Vec<Loan> = server
            .get(endpoints::LOANS)
            .add_query_param("customer_id", request.customer_id)
            .await
            .json();
        assert_eq!(loans, vec![loan]);
    }

    #[tokio::test]
    async fn out_of_order_payment_is_conflict() {
        let server = get_test_server();
        let (request, account) = submit_request(&server).await;
        let approved: ApprovedLoan = server
            .post(&format_endpoint(endpoints::APPROVE_LOAN_REQUEST, request.id))
            .json(&json!({ "interest_rate_bps": 450 }))
            .await
            .json();

        server
            .post(&format_endpoint(
                endpoints::CONFIRM_PAYMENT,
                approved.payments[2].id,
            ))
            .json(&json!({ "account_id": account.id }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let receipt: PaymentReceipt = server
            .post(&format_endpoint(
                endpoints::CONFIRM_PAYMENT,
                approved.payments[0].id,
            ))
            .json(&json!({ "account_id": account.id }))
            .await
            .json();
        assert_eq!(receipt.payment.installment, 1);
    }

    #[tokio::test]
    async fn rejected_request_cannot_be_approved() {
        let server = get_test_server();
        let (request, _) = submit_request(&server).await;

        let rejected: LoanRequest = server
            .post(&format_endpoint(endpoints::REJECT_LOAN_REQUEST, request.id))
            .json(&json!({ "note": "Insufficient income" }))
            .await
            .json();
        assert_eq!(rejected.status, LoanRequestStatus::Rejected);

        server
            .post(&format_endpoint(endpoints::APPROVE_LOAN_REQUEST, request.id))
            .json(&json!({ "interest_rate_bps": 300 }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let pending: Vec<LoanRequest> = server
            .get(endpoints::LOAN_REQUESTS)
            .add_query_param("pending_only", true)
            .await
            .json();
        assert!(pending.is_empty());
    }

    #[tokio::test]
    async fn missing_loan_is_not_found() {
        let server = get_test_server();

        server
            .get(&format_endpoint(endpoints::LOAN, 1))
            .await
            .assert_status_not_found();
        server
            .get(&format_endpoint(endpoints::LOAN_REQUEST, 1))
            .await
            .assert_status_not_found();
    }
}
