//! Marks late loan installments as overdue and reminds customers of upcoming ones.
//!
//! The sweep runs periodically in the background and can also be triggered
//! through the admin endpoint, optionally for an explicit date.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json,
    extract::{FromRef, Query, State},
};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    customer::CustomerId,
    loan::{LoanStatus, Payment, PaymentStatus, map_row_to_payment},
    notification::{NotificationKind, create_notification},
    timezone::today_in,
};

/// What a sweep changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// The number of installments that became overdue.
    pub overdue_marked: usize,
    /// The number of reminders sent.
    pub reminders_sent: usize,
}

/// A pending installment along with who to notify about it.
struct DuePayment {
    payment: Payment,
    customer_id: CustomerId,
}

fn query_due_payments(
    sql: &str,
    params: impl rusqlite::Params,
    connection: &Connection,
) -> Result<Vec<DuePayment>, Error> {
    connection
        .prepare(sql)?
        .query_map(params, |row| {
            Ok(DuePayment {
                payment: map_row_to_payment(row)?,
                customer_id: row.get(9)?,
            })
        })?
        .map(|row| row.map_err(Error::from))
        .collect()
}

const DUE_PAYMENT_COLUMNS: &str = "payment.id, payment.loan_id, payment.installment, \
    payment.due_date, payment.amount, payment.status, payment.reminder_sent, payment.paid_at, \
    payment.paid_from_account_id, loan.customer_id";

/// Mark pending installments that were due before `today` as overdue.
///
/// The loans they belong to become delinquent, and the borrower gets one
/// notification per installment. Returns the number of installments marked.
pub fn mark_overdue(today: Date, connection: &Connection) -> Result<usize, Error> {
    let late = query_due_payments(
        &format!(
            "SELECT {DUE_PAYMENT_COLUMNS} FROM payment
             INNER JOIN loan ON payment.loan_id = loan.id
             WHERE payment.status = ?1 AND payment.due_date < ?2
             ORDER BY payment.due_date, payment.id"
        ),
        params![PaymentStatus::Pending, today],
        connection,
    )?;

    for DuePayment {
        payment,
        customer_id,
    } in &late
    {
        connection.execute(
            "UPDATE payment SET status = ?1 WHERE id = ?2",
            params![PaymentStatus::Overdue, payment.id],
        )?;
        connection.execute(
            "UPDATE loan SET status = ?1 WHERE id = ?2",
            params![LoanStatus::Delinquent, payment.loan_id],
        )?;
        create_notification(
            *customer_id,
            NotificationKind::PaymentOverdue,
            "Payment overdue",
            &format!(
                "Installment {} of loan #{} ({}) was due on {} and has not been paid.",
                payment.installment, payment.loan_id, payment.amount, payment.due_date
            ),
            connection,
        )?;
    }

    Ok(late.len())
}

/// Remind borrowers of pending installments due between `today` and
/// `window_days` days later, inclusive.
///
/// Each installment is only ever reminded about once. Returns the number of
/// reminders sent.
pub fn send_reminders(today: Date, window_days: u32, connection: &Connection) -> Result<usize, Error> {
    let horizon = today
        .checked_add(time::Duration::days(i64::from(window_days)))
        .unwrap_or(Date::MAX);

    let upcoming = query_due_payments(
        &format!(
            "SELECT {DUE_PAYMENT_COLUMNS} FROM payment
             INNER JOIN loan ON payment.loan_id = loan.id
             WHERE payment.status = ?1
               AND payment.reminder_sent = 0
               AND payment.due_date BETWEEN ?2 AND ?3
             ORDER BY payment.due_date, payment.id"
        ),
        params![PaymentStatus::Pending, today, horizon],
        connection,
    )?;

    for DuePayment {
        payment,
        customer_id,
    } in &upcoming
    {
        connection.execute(
            "UPDATE payment SET reminder_sent = 1 WHERE id = ?1",
            params![payment.id],
        )?;
        create_notification(
            *customer_id,
            NotificationKind::PaymentReminder,
            "Payment due soon",
            &format!(
                "Installment {} of loan #{} ({}) is due on {}.",
                payment.installment, payment.loan_id, payment.amount, payment.due_date
            ),
            connection,
        )?;
    }

    Ok(upcoming.len())
}

/// Mark overdue installments and send reminders in one database transaction.
pub fn sweep(today: Date, window_days: u32, connection: &Connection) -> Result<SweepReport, Error> {
    let transaction = connection.unchecked_transaction()?;

    let overdue_marked = mark_overdue(today, &transaction)?;
    let reminders_sent = send_reminders(today, window_days, &transaction)?;

    transaction.commit()?;

    Ok(SweepReport {
        overdue_marked,
        reminders_sent,
    })
}

/// Run [sweep] every `interval`, using today's date in the app's timezone.
///
/// The first sweep runs immediately. Each sweep runs on the blocking thread
/// pool since it holds the database lock for the whole query. Failures are
/// logged and retried on the next tick.
pub fn spawn_payment_sweeper(state: AppState, interval: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let sweep_state = state.clone();
            match tokio::task::spawn_blocking(move || run_sweep(&sweep_state)).await {
                Ok(Ok((today, report))) => tracing::info!(
                    "Payment sweep for {today}: {} overdue, {} reminders",
                    report.overdue_marked,
                    report.reminders_sent
                ),
                Ok(Err(error)) => tracing::error!("Payment sweep failed: {error}"),
                Err(error) => tracing::error!("Payment sweep task did not finish: {error}"),
            }
        }
    })
}

fn run_sweep(state: &AppState) -> Result<(Date, SweepReport), Error> {
    let today = today_in(&state.local_timezone)?;
    let connection = lock_connection(&state.db_connection)?;

    sweep(today, state.reminder_window_days, &connection).map(|report| (today, report))
}

/// The state needed to run the sweep on demand.
#[derive(Debug, Clone)]
pub struct SweepState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The timezone that decides what "today" is.
    pub local_timezone: String,
    /// How many days ahead reminders are sent.
    pub reminder_window_days: u32,
}

impl FromRef<AppState> for SweepState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
            reminder_window_days: state.reminder_window_days,
        }
    }
}

/// Query parameters for the on-demand sweep.
#[derive(Debug, Default, Deserialize)]
pub struct SweepQuery {
    /// Sweep as if today were this date, formatted as YYYY-MM-DD.
    pub date: Option<Date>,
}

/// A route handler that runs the payment sweep and reports what changed.
pub async fn payment_sweep_endpoint(
    State(state): State<SweepState>,
    Query(query): Query<SweepQuery>,
) -> Result<Json<SweepReport>, Error> {
    let today = match query.date {
        Some(date) => date,
        None => today_in(&state.local_timezone)?,
    };
    let connection = lock_connection(&state.db_connection)?;

    let report = sweep(today, state.reminder_window_days, &connection)?;
    tracing::info!(
        "Payment sweep for {today} on demand: {} overdue, {} reminders",
        report.overdue_marked,
        report.reminders_sent
    );

    Ok(Json(report))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rusqlite::Connection;
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        loan::{
            ApprovedLoan, LoanRequestForm, LoanStatus, PaymentStatus, approve_loan_request,
            get_loan, list_loan_payments, submit_loan_request,
        },
        money::Money,
        notification::{NotificationKind, list_notifications},
        test_utils::{
            create_test_account, create_test_branch, create_test_customer, get_test_connection,
            get_test_state,
        },
    };

    use super::{SweepReport, mark_overdue, send_reminders, spawn_payment_sweeper, sweep};

    /// Three installments due 2025-02-10, 2025-03-10 and 2025-04-10.
    fn approved_loan(connection: &Connection) -> ApprovedLoan {
        let branch = create_test_branch(connection);
        let customer = create_test_customer(connection);
        let account = create_test_account(customer.id, branch.id, connection);
        let request = submit_loan_request(
            &LoanRequestForm {
                customer_id: customer.id,
                account_id: account.id,
                amount: Money::new(dec!(300)),
                term_months: 3,
                purpose: "Tools".to_owned(),
            },
            connection,
        )
        .unwrap();

        approve_loan_request(request.id, 0, None, date!(2025 - 01 - 10), connection).unwrap()
    }

    #[test]
    fn nothing_is_overdue_on_due_date() {
        let connection = get_test_connection();
        approved_loan(&connection);

        assert_eq!(mark_overdue(date!(2025 - 02 - 10), &connection), Ok(0));
    }

    #[test]
    fn late_installments_become_overdue_and_loan_delinquent() {
        let connection = get_test_connection();
        let approved = approved_loan(&connection);

        let marked = mark_overdue(date!(2025 - 03 - 11), &connection).unwrap();

        assert_eq!(marked, 2);
        let statuses: Vec<_> = list_loan_payments(approved.loan.id, &connection)
            .unwrap()
            .into_iter()
            .map(|payment| payment.status)
            .collect();
        assert_eq!(
            statuses,
            [
                PaymentStatus::Overdue,
                PaymentStatus::Overdue,
                PaymentStatus::Pending
            ]
        );
        assert_eq!(
            get_loan(approved.loan.id, &connection).unwrap().status,
            LoanStatus::Delinquent
        );
        let overdue_notices = list_notifications(approved.loan.customer_id, false, &connection)
            .unwrap()
            .into_iter()
            .filter(|notification| notification.kind == NotificationKind::PaymentOverdue)
            .count();
        assert_eq!(overdue_notices, 2);
    }

    #[test]
    fn reminders_cover_window_inclusive_and_are_sent_once() {
        let connection = get_test_connection();
        let approved = approved_loan(&connection);

        assert_eq!(send_reminders(date!(2025 - 02 - 06), 3, &connection), Ok(0));
        assert_eq!(send_reminders(date!(2025 - 02 - 07), 3, &connection), Ok(1));
        assert_eq!(send_reminders(date!(2025 - 02 - 08), 3, &connection), Ok(0));

        let payments = list_loan_payments(approved.loan.id, &connection).unwrap();
        assert!(payments[0].reminder_sent);
        assert!(!payments[1].reminder_sent);
    }

    #[test]
    fn sweep_runs_both_steps() {
        let connection = get_test_connection();
        approved_loan(&connection);

        let report = sweep(date!(2025 - 03 - 08), 3, &connection).unwrap();

        assert_eq!(
            report,
            SweepReport {
                overdue_marked: 1,
                reminders_sent: 1,
            }
        );
        assert_eq!(
            sweep(date!(2025 - 03 - 08), 3, &connection),
            Ok(SweepReport::default())
        );
    }

    #[test]
    fn paid_installments_are_never_overdue() {
        let connection = get_test_connection();
        let approved = approved_loan(&connection);
        crate::loan::confirm_payment(approved.payments[0].id, approved.loan.account_id, &connection)
            .unwrap();

        assert_eq!(mark_overdue(date!(2025 - 02 - 20), &connection), Ok(0));
    }

    #[tokio::test]
    async fn background_sweeper_marks_past_installments_overdue() {
        let state = get_test_state();
        let loan_id = {
            let connection = state.db_connection.lock().unwrap();
            approved_loan(&connection).loan.id
        };

        let sweeper = spawn_payment_sweeper(state.clone(), Duration::from_secs(3600));
        let mut status = LoanStatus::Active;
        for _ in 0..200 {
            status = {
                let connection = state.db_connection.lock().unwrap();
                get_loan(loan_id, &connection).unwrap().status
            };
            if status == LoanStatus::Delinquent {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        sweeper.abort();

        assert_eq!(status, LoanStatus::Delinquent);
    }
}
