//! The ledger and the operations that change account balances.

mod balance;
mod core;
mod endpoints;
mod statement;

pub use balance::{
    Receipt, TransferReceipt, apply_deposit, credit_account, debit_account, deposit, transfer,
    withdraw,
};
pub use core::{
    LedgerEntry, Transaction, TransactionBuilder, TransactionId, TransactionKind,
    all_account_transactions, create_transaction_table, get_transaction, insert_transaction,
    list_account_transactions,
};
pub use endpoints::{
    account_statement_endpoint, deposit_endpoint, get_transaction_endpoint,
    list_account_transactions_endpoint, transfer_endpoint, withdraw_endpoint,
};
pub use statement::account_statement_csv;
