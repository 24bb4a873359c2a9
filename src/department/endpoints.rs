//! Defines the route handlers for managing departments.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    app_state::lock_connection,
    branch::BranchId,
    department::{
        Department, DepartmentForm, DepartmentId, create_department, delete_department,
        get_department, list_departments, rename_department,
    },
};

/// The state needed to manage departments.
#[derive(Debug, Clone)]
pub struct DepartmentState {
    /// The database connection for managing departments.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DepartmentState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Query parameters for filtering lists by branch.
#[derive(Debug, Default, Deserialize)]
pub struct BranchFilter {
    /// Only include items belonging to this branch.
    pub branch_id: Option<BranchId>,
}

/// The request body for renaming a department.
#[derive(Debug, Deserialize)]
pub struct RenameDepartment {
    /// The new name.
    pub name: String,
}

pub async fn create_department_endpoint(
    State(state): State<DepartmentState>,
    Json(form): Json<DepartmentForm>,
) -> Result<(StatusCode, Json<Department>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let department = create_department(&form, &connection)?;

    Ok((StatusCode::CREATED, Json(department)))
}

pub async fn list_departments_endpoint(
    State(state): State<DepartmentState>,
    Query(filter): Query<BranchFilter>,
) -> Result<Json<Vec<Department>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_departments(filter.branch_id, &connection).map(Json)
}

pub async fn get_department_endpoint(
    State(state): State<DepartmentState>,
    Path(department_id): Path<DepartmentId>,
) -> Result<Json<Department>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_department(department_id, &connection).map(Json)
}

pub async fn rename_department_endpoint(
    State(state): State<DepartmentState>,
    Path(department_id): Path<DepartmentId>,
    Json(body): Json<RenameDepartment>,
) -> Result<Json<Department>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    rename_department(department_id, &body.name, &connection).map(Json)
}

pub async fn delete_department_endpoint(
    State(state): State<DepartmentState>,
    Path(department_id): Path<DepartmentId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_department(department_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
