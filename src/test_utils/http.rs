use axum_test::TestServer;
use rusqlite::Connection;

use crate::{AppState, build_router, pagination::PaginationConfig};

/// An [AppState] backed by a fresh in-memory database.
pub(crate) fn get_test_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, "Etc/UTC", PaginationConfig::default(), 3)
        .expect("Could not create app state")
}

/// A test server running the full router over [get_test_state].
pub(crate) fn get_test_server() -> TestServer {
    get_test_server_with_state(get_test_state())
}

/// A test server running the full router over `state`, for tests that need
/// to seed the database directly first.
pub(crate) fn get_test_server_with_state(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}
