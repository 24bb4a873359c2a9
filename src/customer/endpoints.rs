//! Defines the route handlers for managing customers.

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
    customer::{
        Customer, CustomerForm, CustomerId, create_customer, delete_customer, get_customer,
        list_customers, update_customer,
    },
};

/// The state needed to manage customers.
#[derive(Debug, Clone)]
pub struct CustomerState {
    /// The database connection for managing customers.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CustomerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for registering a new customer.
pub async fn create_customer_endpoint(
    State(state): State<CustomerState>,
    Json(form): Json<CustomerForm>,
) -> Result<(StatusCode, Json<Customer>), Error> {
    let connection = lock_connection(&state.db_connection)?;

    let customer = create_customer(&form, &connection)?;
    tracing::info!("Registered customer {}", customer.id);

    Ok((StatusCode::CREATED, Json(customer)))
}

/// A route handler for listing all customers.
pub async fn list_customers_endpoint(
    State(state): State<CustomerState>,
) -> Result<Json<Vec<Customer>>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    list_customers(&connection).map(Json)
}

/// A route handler for getting a single customer.
pub async fn get_customer_endpoint(
    State(state): State<CustomerState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<Json<Customer>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    get_customer(customer_id, &connection).map(Json)
}

/// A route handler for updating a customer's details.
pub async fn update_customer_endpoint(
    State(state): State<CustomerState>,
    Path(customer_id): Path<CustomerId>,
    Json(form): Json<CustomerForm>,
) -> Result<Json<Customer>, Error> {
    let connection = lock_connection(&state.db_connection)?;

    update_customer(customer_id, &form, &connection).map(Json)
}

/// A route handler for deleting a customer, responds with 204 No Content on success.
pub async fn delete_customer_endpoint(
    State(state): State<CustomerState>,
    Path(customer_id): Path<CustomerId>,
) -> Result<StatusCode, Error> {
    let connection = lock_connection(&state.db_connection)?;

    delete_customer(customer_id, &connection)?;
    tracing::info!("Deleted customer {customer_id}");

    Ok(StatusCode::NO_CONTENT)
}
