mod core;
mod endpoints;
mod summary;

pub use core::{
    Branch, BranchAggregate, BranchForm, BranchId, add_to_branch_total, create_branch,
    create_branch_table, delete_branch, get_branch, list_branches, update_branch,
};
pub use endpoints::{
    create_branch_endpoint, delete_branch_endpoint, get_branch_endpoint,
    get_branch_summary_endpoint, list_branches_endpoint, update_branch_endpoint,
};
pub use summary::{BranchSummary, get_branch_summary};
