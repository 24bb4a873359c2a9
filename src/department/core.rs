//! Defines the department model and its database queries.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};

use crate::{Error, branch::BranchId, database_id::DatabaseId};

pub type DepartmentId = DatabaseId;

/// A team within a branch, e.g. "Lending" or "Tellers".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    /// The id of the department.
    pub id: DepartmentId,
    /// The branch the department belongs to.
    pub branch_id: BranchId,
    /// The name of the department, unique within its branch.
    pub name: String,
}

/// The data needed to create a department.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentForm {
    /// The branch the department belongs to.
    pub branch_id: BranchId,
    /// The name of the department.
    pub name: String,
}

pub fn create_department_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS department (
            id INTEGER PRIMARY KEY,
            branch_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            UNIQUE(branch_id, name),
            FOREIGN KEY(branch_id) REFERENCES branch(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_department(row: &Row) -> Result<Department, rusqlite::Error> {
    Ok(Department {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        name: row.get(2)?,
    })
}

/// Create a department in an existing branch.
///
/// # Errors
/// Returns [Error::InvalidReference] if the branch does not exist, or
/// [Error::Duplicate] if the branch already has a department with that name.
pub fn create_department(
    form: &DepartmentForm,
    connection: &Connection,
) -> Result<Department, Error> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("department name"));
    }

    connection
        .prepare(
            "INSERT INTO department (branch_id, name) VALUES (?1, ?2)
             RETURNING id, branch_id, name",
        )?
        .query_row(params![form.branch_id, name], map_row_to_department)
        .map_err(|error| match Error::from(error) {
            Error::InvalidReference(_) => {
                Error::InvalidReference(format!("branch {} does not exist", form.branch_id))
            }
            error => error,
        })
}

pub fn get_department(id: DepartmentId, connection: &Connection) -> Result<Department, Error> {
    connection
        .query_row(
            "SELECT id, branch_id, name FROM department WHERE id = ?1",
            params![id],
            map_row_to_department,
        )
        .map_err(Error::from)
}

/// List departments, optionally only those of one branch.
pub fn list_departments(
    branch_id: Option<BranchId>,
    connection: &Connection,
) -> Result<Vec<Department>, Error> {
    connection
        .prepare(
            "SELECT id, branch_id, name FROM department
             WHERE ?1 IS NULL OR branch_id = ?1
             ORDER BY branch_id, name",
        )?
        .query_map(params![branch_id], map_row_to_department)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Rename a department.
pub fn rename_department(
    id: DepartmentId,
    name: &str,
    connection: &Connection,
) -> Result<Department, Error> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("department name"));
    }

    let rows_affected = connection.execute(
        "UPDATE department SET name = ?1 WHERE id = ?2",
        params![name, id],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_department(id, connection)
}

/// Delete a department that has no employees.
pub fn delete_department(id: DepartmentId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM department WHERE id = ?1", params![id])
        .map_err(|error| match Error::from(error) {
            Error::InvalidReference(_) => Error::RecordInUse,
            error => error,
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
