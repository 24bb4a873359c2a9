#![allow(missing_docs)]

pub(crate) mod fixtures;
pub(crate) mod http;

pub(crate) use fixtures::{
    create_test_account, create_test_branch, create_test_customer, fund_account,
    get_test_connection,
};
pub(crate) use http::{get_test_server, get_test_server_with_state, get_test_state};
