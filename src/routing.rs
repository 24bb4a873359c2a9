//! Application router configuration.

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
};
use serde_json::json;

use crate::{
    AppState,
    account::{
        close_account_endpoint, get_account_endpoint, list_accounts_endpoint,
        open_account_endpoint, set_account_status_endpoint,
    },
    branch::{
        create_branch_endpoint, delete_branch_endpoint, get_branch_endpoint,
        get_branch_summary_endpoint, list_branches_endpoint, update_branch_endpoint,
    },
    customer::{
        create_customer_endpoint, delete_customer_endpoint, get_customer_endpoint,
        list_customers_endpoint, update_customer_endpoint,
    },
    department::{
        create_department_endpoint, delete_department_endpoint, get_department_endpoint,
        list_departments_endpoint, rename_department_endpoint,
    },
    employee::{
        create_employee_endpoint, delete_employee_endpoint, get_employee_endpoint,
        list_employees_endpoint, update_employee_endpoint,
    },
    endpoints,
    loan::{
        approve_loan_request_endpoint, confirm_payment_endpoint, get_loan_endpoint,
        get_loan_request_endpoint, list_loan_payments_endpoint, list_loan_requests_endpoint,
        list_loans_endpoint, reject_loan_request_endpoint, submit_loan_request_endpoint,
    },
    notification::{
        create_notification_endpoint, delete_notification_endpoint,
        list_customer_notifications_endpoint, mark_all_read_endpoint, mark_read_endpoint,
        unread_count_endpoint,
    },
    scheduler::payment_sweep_endpoint,
    transaction::{
        account_statement_endpoint, deposit_endpoint, get_transaction_endpoint,
        list_account_transactions_endpoint, transfer_endpoint, withdraw_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let organization_routes = Router::new()
        .route(
            endpoints::BRANCHES,
            get(list_branches_endpoint).post(create_branch_endpoint),
        )
        .route(
            endpoints::BRANCH,
            get(get_branch_endpoint)
                .put(update_branch_endpoint)
                .delete(delete_branch_endpoint),
        )
        .route(endpoints::BRANCH_SUMMARY, get(get_branch_summary_endpoint))
        .route(
            endpoints::DEPARTMENTS,
            get(list_departments_endpoint).post(create_department_endpoint),
        )
        .route(
            endpoints::DEPARTMENT,
            get(get_department_endpoint)
                .put(rename_department_endpoint)
                .delete(delete_department_endpoint),
        )
        .route(
            endpoints::EMPLOYEES,
            get(list_employees_endpoint).post(create_employee_endpoint),
        )
        .route(
            endpoints::EMPLOYEE,
            get(get_employee_endpoint)
                .put(update_employee_endpoint)
                .delete(delete_employee_endpoint),
        );

    let customer_routes = Router::new()
        .route(
            endpoints::CUSTOMERS,
            get(list_customers_endpoint).post(create_customer_endpoint),
        )
        .route(
            endpoints::CUSTOMER,
            get(get_customer_endpoint)
                .put(update_customer_endpoint)
                .delete(delete_customer_endpoint),
        )
        .route(
            endpoints::CUSTOMER_NOTIFICATIONS,
            get(list_customer_notifications_endpoint),
        )
        .route(endpoints::CUSTOMER_UNREAD_COUNT, get(unread_count_endpoint))
        .route(
            endpoints::CUSTOMER_NOTIFICATIONS_READ_ALL,
            put(mark_all_read_endpoint),
        )
        .route(endpoints::NOTIFICATIONS, post(create_notification_endpoint))
        .route(
            endpoints::NOTIFICATION,
            delete(delete_notification_endpoint),
        )
        .route(endpoints::NOTIFICATION_READ, put(mark_read_endpoint));

    let account_routes = Router::new()
        .route(
            endpoints::ACCOUNTS,
            get(list_accounts_endpoint).post(open_account_endpoint),
        )
        .route(
            endpoints::ACCOUNT,
            get(get_account_endpoint).delete(close_account_endpoint),
        )
        .route(endpoints::ACCOUNT_STATUS, put(set_account_status_endpoint))
        .route(endpoints::DEPOSIT, post(deposit_endpoint))
        .route(endpoints::WITHDRAW, post(withdraw_endpoint))
        .route(
            endpoints::ACCOUNT_TRANSACTIONS,
            get(list_account_transactions_endpoint),
        )
        .route(endpoints::ACCOUNT_STATEMENT, get(account_statement_endpoint))
        .route(endpoints::TRANSFERS, post(transfer_endpoint))
        .route(endpoints::TRANSACTION, get(get_transaction_endpoint));

    let loan_routes = Router::new()
        .route(
            endpoints::LOAN_REQUESTS,
            get(list_loan_requests_endpoint).post(submit_loan_request_endpoint),
        )
        .route(endpoints::LOAN_REQUEST, get(get_loan_request_endpoint))
        .route(
            endpoints::APPROVE_LOAN_REQUEST,
            post(approve_loan_request_endpoint),
        )
        .route(
            endpoints::REJECT_LOAN_REQUEST,
            post(reject_loan_request_endpoint),
        )
        .route(endpoints::LOANS, get(list_loans_endpoint))
        .route(endpoints::LOAN, get(get_loan_endpoint))
        .route(endpoints::LOAN_PAYMENTS, get(list_loan_payments_endpoint))
        .route(endpoints::CONFIRM_PAYMENT, post(confirm_payment_endpoint))
        .route(endpoints::PAYMENT_SWEEP, post(payment_sweep_endpoint));

    Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .merge(organization_routes)
        .merge(customer_routes)
        .merge(account_routes)
        .merge(loan_routes)
        .fallback(get_404_not_found)
        .with_state(state)
}

/// Report that the server is up.
async fn get_health() -> Response {
    (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response()
}

/// The response for any path that does not match a route.
async fn get_404_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "the requested route does not exist" })),
    )
        .into_response()
}
