//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/accounts/{account_id}', use [format_endpoint].

/// The route for checking that the server is up.
pub const HEALTH: &str = "/api/health";

/// The route to list and create branches.
pub const BRANCHES: &str = "/api/branches";
/// The route to access a single branch.
pub const BRANCH: &str = "/api/branches/{branch_id}";
/// The route for a branch's aggregate figures.
pub const BRANCH_SUMMARY: &str = "/api/branches/{branch_id}/summary";

/// The route to list and create departments.
pub const DEPARTMENTS: &str = "/api/departments";
/// The route to access a single department.
pub const DEPARTMENT: &str = "/api/departments/{department_id}";

/// The route to list and create employees.
pub const EMPLOYEES: &str = "/api/employees";
/// The route to access a single employee.
pub const EMPLOYEE: &str = "/api/employees/{employee_id}";

/// The route to list and create customers.
pub const CUSTOMERS: &str = "/api/customers";
/// The route to access a single customer.
pub const CUSTOMER: &str = "/api/customers/{customer_id}";
/// The route to list a customer's notifications.
pub const CUSTOMER_NOTIFICATIONS: &str = "/api/customers/{customer_id}/notifications";
/// The route to count a customer's unread notifications.
pub const CUSTOMER_UNREAD_COUNT: &str = "/api/customers/{customer_id}/notifications/unread_count";
/// The route to mark all of a customer's notifications as read.
pub const CUSTOMER_NOTIFICATIONS_READ_ALL: &str =
    "/api/customers/{customer_id}/notifications/read_all";

/// The route to list and open accounts.
pub const ACCOUNTS: &str = "/api/accounts";
/// The route to get or close a single account.
pub const ACCOUNT: &str = "/api/accounts/{account_id}";
/// The route to freeze or unfreeze an account.
pub const ACCOUNT_STATUS: &str = "/api/accounts/{account_id}/status";
/// The route to deposit money into an account.
pub const DEPOSIT: &str = "/api/accounts/{account_id}/deposit";
/// The route to withdraw money from an account.
pub const WITHDRAW: &str = "/api/accounts/{account_id}/withdraw";
/// The route to list the transactions of an account.
pub const ACCOUNT_TRANSACTIONS: &str = "/api/accounts/{account_id}/transactions";
/// The route to download an account statement as CSV.
pub const ACCOUNT_STATEMENT: &str = "/api/accounts/{account_id}/statement";
/// The route to transfer money between accounts.
pub const TRANSFERS: &str = "/api/transfers";
/// The route to access a single ledger transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";

/// The route to list and submit loan requests.
pub const LOAN_REQUESTS: &str = "/api/loan_requests";
/// The route to access a single loan request.
pub const LOAN_REQUEST: &str = "/api/loan_requests/{loan_request_id}";
/// The route to approve a loan request.
pub const APPROVE_LOAN_REQUEST: &str = "/api/loan_requests/{loan_request_id}/approve";
/// The route to reject a loan request.
pub const REJECT_LOAN_REQUEST: &str = "/api/loan_requests/{loan_request_id}/reject";
/// The route to list loans.
pub const LOANS: &str = "/api/loans";
/// The route to access a single loan.
pub const LOAN: &str = "/api/loans/{loan_id}";
/// The route to list the payment schedule of a loan.
pub const LOAN_PAYMENTS: &str = "/api/loans/{loan_id}/payments";
/// The route to confirm (pay) a loan installment.
pub const CONFIRM_PAYMENT: &str = "/api/payments/{payment_id}/confirm";

/// The route to send a general notification to a customer.
pub const NOTIFICATIONS: &str = "/api/notifications";
/// The route to delete a notification.
pub const NOTIFICATION: &str = "/api/notifications/{notification_id}";
/// The route to mark a notification as read.
pub const NOTIFICATION_READ: &str = "/api/notifications/{notification_id}/read";

/// The route to run the overdue and reminder sweep on demand.
pub const PAYMENT_SWEEP: &str = "/api/admin/payment_sweep";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_string();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
