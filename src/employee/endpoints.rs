//! Defines the route handlers for managing employees.

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
    employee::{
        Employee, EmployeeForm, EmployeeId, create_employee, delete_employee, get_employee,
        list_employees, update_employee,
    },
};

/// The state needed to manage employees.
#[derive(Debug, Clone)]
pub struct EmployeeState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for EmployeeState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmployeeFilter {
    pub branch_id: Option<BranchId>,
}

pub async fn create_employee_endpoint(
    State(state): State<EmployeeState>,
    Json(form): Json<EmployeeForm>,
) -> Result<(StatusCode, Json<Employee>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let employee = create_employee(&form, &connection)?;
    tracing::info!(
        "Hired employee {} at branch {}",
        employee.id,
        employee.branch_id
    );

    Ok((StatusCode::CREATED, Json(employee)))
}

pub async fn list_employees_endpoint(
    State(state): State<EmployeeState>,
    Query(filter): Query<EmployeeFilter>,
) -> Result<Json<Vec<Employee>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_employees(filter.branch_id, &connection).map(Json)
}

pub async fn get_employee_endpoint(
    State(state): State<EmployeeState>,
    Path(employee_id): Path<EmployeeId>,
) -> Result<Json<Employee>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_employee(employee_id, &connection).map(Json)
}

pub async fn update_employee_endpoint(
    State(state): State<EmployeeState>,
    Path(employee_id): Path<EmployeeId>,
    Json(form): Json<EmployeeForm>,
) -> Result<Json<Employee>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_employee(employee_id, &form, &connection).map(Json)
}

pub async fn delete_employee_endpoint(
    State(state): State<EmployeeState>,
    Path(employee_id): Path<EmployeeId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_employee(employee_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}
