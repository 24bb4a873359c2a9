//! Deposits, withdrawals and transfers.
//!
//! Each operation loads the account(s), checks the amount against the
//! balance, writes the new balance(s), bumps the branch totals, appends a
//! ledger entry and notifies the account owner(s). The public functions run
//! all of that inside one database transaction. The `apply_*` functions do
//! the same work on a connection that is already inside a transaction, so
//! that other operations (e.g. opening an account) can compose them.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    account::{Account, AccountId, get_active_account, set_account_balance},
    branch::{BranchAggregate, add_to_branch_total},
    money::Money,
    notification::{NotificationKind, create_notification},
    transaction::{Transaction, TransactionKind, insert_transaction},
};

/// The result of a deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    /// The ledger entry that was written.
    pub transaction: Transaction,
    /// The balance of the account after the operation.
    pub balance: Money,
}

/// The result of a transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferReceipt {
    /// The ledger entry that was written.
    pub transaction: Transaction,
    /// The balance of the source account after the transfer.
    pub from_balance: Money,
    /// The balance of the destination account after the transfer.
    pub to_balance: Money,
}

/// Add `amount` to an active account and return the updated account.
///
/// Does not touch branch totals, the ledger or notifications.
///
/// # Errors
/// Returns [Error::ArithmeticOverflow] if the new balance cannot be represented.
pub fn credit_account(
    account_id: AccountId,
    amount: Money,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut account = get_active_account(account_id, connection)?;

    account.balance = account.balance.checked_add(amount)?;
    set_account_balance(account.id, account.balance, connection)?;

    Ok(account)
}

/// Take `amount` from an active account and return the updated account.
///
/// # Errors
/// Returns [Error::InsufficientFunds] if the balance is less than `amount`.
pub fn debit_account(
    account_id: AccountId,
    amount: Money,
    connection: &Connection,
) -> Result<Account, Error> {
    let mut account = get_active_account(account_id, connection)?;

    if account.balance < amount {
        return Err(Error::InsufficientFunds {
            available: account.balance,
            requested: amount,
        });
    }

    account.balance = account.balance.checked_sub(amount)?;
    set_account_balance(account.id, account.balance, connection)?;

    Ok(account)
}

/// Deposit money into an account.
///
/// # Errors
/// Returns:
/// - [Error::InvalidAmount] if `amount` is not positive, too large or has fractions of a cent,
/// - [Error::NotFound] if the account does not exist,
/// - [Error::AccountNotActive] if the account is frozen or closed,
/// - [Error::ArithmeticOverflow] if the balance or branch total cannot be represented.
pub fn deposit(
    account_id: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<Receipt, Error> {
    let transaction = connection.unchecked_transaction()?;
    let receipt = apply_deposit(account_id, amount, description, &transaction)?;
    transaction.commit()?;

    Ok(receipt)
}

/// [deposit] without opening a database transaction.
pub fn apply_deposit(
    account_id: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<Receipt, Error> {
    let amount = amount.validate_amount()?;

    let account = credit_account(account_id, amount, connection)?;
    add_to_branch_total(
        account.branch_id,
        BranchAggregate::Deposits,
        amount,
        connection,
    )?;

    let transaction = insert_transaction(
        Transaction::build(
            TransactionKind::Deposit,
            amount,
            description.unwrap_or("Deposit"),
        )
        .to_account(account.id),
        connection,
    )?;

    create_notification(
        account.customer_id,
        NotificationKind::Transaction,
        "Deposit received",
        &format!(
            "{amount} was deposited into account #{}. New balance: {}.",
            account.id, account.balance
        ),
        connection,
    )?;

    Ok(Receipt {
        transaction,
        balance: account.balance,
    })
}

/// Withdraw money from an account.
///
/// # Errors
/// Returns the same errors as [deposit], and [Error::InsufficientFunds] if
/// the balance is less than `amount`.
pub fn withdraw(
    account_id: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<Receipt, Error> {
    let transaction = connection.unchecked_transaction()?;
    let receipt = apply_withdrawal(account_id, amount, description, &transaction)?;
    transaction.commit()?;

    Ok(receipt)
}

/// [withdraw] without opening a database transaction.
fn apply_withdrawal(
    account_id: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<Receipt, Error> {
    let amount = amount.validate_amount()?;

    let account = debit_account(account_id, amount, connection)?;
    add_to_branch_total(
        account.branch_id,
        BranchAggregate::Withdrawals,
        amount,
        connection,
    )?;

    let transaction = insert_transaction(
        Transaction::build(
            TransactionKind::Withdrawal,
            amount,
            description.unwrap_or("Withdrawal"),
        )
        .from_account(account.id),
        connection,
    )?;

    create_notification(
        account.customer_id,
        NotificationKind::Transaction,
        "Withdrawal made",
        &format!(
            "{amount} was withdrawn from account #{}. New balance: {}.",
            account.id, account.balance
        ),
        connection,
    )?;

    Ok(Receipt {
        transaction,
        balance: account.balance,
    })
}

/// Move money from one account to another.
///
/// The source branch records the amount as a withdrawal and the destination
/// branch records it as a deposit, even when both accounts are at the same branch.
///
/// # Errors
/// Returns:
/// - [Error::SameAccountTransfer] if `from` and `to` are the same account,
/// - [Error::InvalidAmount] if `amount` is not a valid amount,
/// - [Error::NotFound] if either account does not exist,
/// - [Error::AccountNotActive] if either account is frozen or closed,
/// - [Error::InsufficientFunds] if the source balance is less than `amount`.
pub fn transfer(
    from: AccountId,
    to: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<TransferReceipt, Error> {
    let transaction = connection.unchecked_transaction()?;
    let receipt = apply_transfer(from, to, amount, description, &transaction)?;
    transaction.commit()?;

    Ok(receipt)
}

/// [transfer] without opening a database transaction.
fn apply_transfer(
    from: AccountId,
    to: AccountId,
    amount: Money,
    description: Option<&str>,
    connection: &Connection,
) -> Result<TransferReceipt, Error> {
    if from == to {
        return Err(Error::SameAccountTransfer);
    }

    let amount = amount.validate_amount()?;

    // Check the destination up front so a frozen destination is reported
    // before the source balance is looked at.
    get_active_account(to, connection)?;

    let source = debit_account(from, amount, connection)?;
    let destination = credit_account(to, amount, connection)?;

    add_to_branch_total(
        source.branch_id,
        BranchAggregate::Withdrawals,
        amount,
        connection,
    )?;
    add_to_branch_total(
        destination.branch_id,
        BranchAggregate::Deposits,
        amount,
        connection,
    )?;

    let default_description = format!("Transfer from #{from} to #{to}");
    let transaction = insert_transaction(
        Transaction::build(
            TransactionKind::Transfer,
            amount,
            description.unwrap_or(&default_description),
        )
        .from_account(from)
        .to_account(to),
        connection,
    )?;

    if source.customer_id == destination.customer_id {
        create_notification(
            source.customer_id,
            NotificationKind::Transaction,
            "Transfer completed",
            &format!(
                "{amount} was moved from account #{from} (balance {}) to account #{to} (balance {}).",
                source.balance, destination.balance
            ),
            connection,
        )?;
    } else {
        create_notification(
            source.customer_id,
            NotificationKind::Transaction,
            "Transfer sent",
            &format!(
                "{amount} was sent from account #{from} to account #{to}. New balance: {}.",
                source.balance
            ),
            connection,
        )?;
        create_notification(
            destination.customer_id,
            NotificationKind::Transaction,
            "Transfer received",
            &format!(
                "{amount} was received into account #{to} from account #{from}. New balance: {}.",
                destination.balance
            ),
            connection,
        )?;
    }

    Ok(TransferReceipt {
        transaction,
        from_balance: source.balance,
        to_balance: destination.balance,
    })
}
