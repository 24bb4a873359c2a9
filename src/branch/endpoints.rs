//! Defines the route handlers for administering branches.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    branch::{
        Branch, BranchForm, BranchId, BranchSummary, create_branch, delete_branch, get_branch,
        get_branch_summary, list_branches, update_branch,
    },
};

/// The state needed to manage branches.
#[derive(Debug, Clone)]
pub struct BranchState {
    /// The database connection for managing branches.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BranchState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for creating a new branch.
pub async fn create_branch_endpoint(
    State(state): State<BranchState>,
    Json(form): Json<BranchForm>,
) -> Result<(StatusCode, Json<Branch>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let branch = create_branch(&form, &connection)?;
    tracing::info!("Created branch {} \"{}\"", branch.id, branch.name);

    Ok((StatusCode::CREATED, Json(branch)))
}

/// A route handler for listing all branches.
pub async fn list_branches_endpoint(
    State(state): State<BranchState>,
) -> Result<Json<Vec<Branch>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_branches(&connection).map(Json)
}

/// A route handler for getting a single branch.
pub async fn get_branch_endpoint(
    State(state): State<BranchState>,
    Path(branch_id): Path<BranchId>,
) -> Result<Json<Branch>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_branch(branch_id, &connection).map(Json)
}

/// A route handler for renaming or moving a branch.
pub async fn update_branch_endpoint(
    State(state): State<BranchState>,
    Path(branch_id): Path<BranchId>,
    Json(form): Json<BranchForm>,
) -> Result<Json<Branch>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_branch(branch_id, &form, &connection).map(Json)
}

/// A route handler for deleting a branch, responds with 204 No Content on success.
pub async fn delete_branch_endpoint(
    State(state): State<BranchState>,
    Path(branch_id): Path<BranchId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_branch(branch_id, &connection)?;
    tracing::info!("Deleted branch {branch_id}");

    Ok(StatusCode::NO_CONTENT)
}

/// A route handler for the aggregate figures of a branch.
pub async fn get_branch_summary_endpoint(
    State(state): State<BranchState>,
    Path(branch_id): Path<BranchId>,
) -> Result<Json<BranchSummary>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_branch_summary(branch_id, &connection).map(Json)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        branch::{Branch, BranchSummary},
        endpoints::{self, format_endpoint},
        test_utils::get_test_server,
    };

    #[tokio::test]
    async fn create_then_get_branch() {
        let server = get_test_server();

        let response = server
            .post(endpoints::BRANCHES)
            .json(&json!({ "name": "Harbour", "address": "3 Quay Street" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let created: Branch = response.json();

        let got: Branch = server
            .get(&format_endpoint(endpoints::BRANCH, created.id))
            .await
            .json();

        assert_eq!(got, created);
    }

    #[tokio::test]
    async fn create_branch_with_blank_name_is_bad_request() {
        let server = get_test_server();

        server
            .post(endpoints::BRANCHES)
            .json(&json!({ "name": "", "address": "3 Quay Street" }))
            .await
            .assert_status_bad_request();
    }

    #[tokio::test]
    async fn get_missing_branch_is_not_found() {
        let server = get_test_server();

        server
            .get(&format_endpoint(endpoints::BRANCH, 99))
            .await
            .assert_status_not_found();
    }

    #[tokio::test]
    async fn delete_branch_responds_no_content() {
        let server = get_test_server();
        let created: Branch = server
            .post(endpoints::BRANCHES)
            .json(&json!({ "name": "Harbour", "address": "3 Quay Street" }))
            .await
            .json();

        server
            .delete(&format_endpoint(endpoints::BRANCH, created.id))
            .await
            .assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn summary_of_new_branch_is_empty() {
        let server = get_test_server();
        let created: Branch = server
            .post(endpoints::BRANCHES)
            .json(&json!({ "name": "Harbour", "address": "3 Quay Street" }))
            .await
            .json();

        let summary: BranchSummary = server
            .get(&format_endpoint(endpoints::BRANCH_SUMMARY, created.id))
            .await
            .json();

        assert_eq!(summary.open_account_count, 0);
        assert_eq!(summary.branch, created);
    }
}
