mod close_endpoint;
mod core;
mod get_endpoint;
mod open_endpoint;
mod status_endpoint;

pub use close_endpoint::close_account_endpoint;
pub use core::{
    Account, AccountId, AccountKind, AccountStatus, OpenAccount, close_account,
    create_account_table, get_account, get_active_account, list_accounts, map_row_to_account,
    open_account, set_account_balance, set_account_status,
};
pub use get_endpoint::{get_account_endpoint, list_accounts_endpoint};
pub use open_endpoint::open_account_endpoint;
pub use status_endpoint::set_account_status_endpoint;
