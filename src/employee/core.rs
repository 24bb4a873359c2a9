//! Defines the employee model and its database queries.

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    branch::{BranchId, get_branch},
    database_id::DatabaseId,
    department::DepartmentId,
};

pub type EmployeeId = DatabaseId;

/// A member of staff working at a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub branch_id: BranchId,
    /// The department within the branch, if the employee has been assigned one.
    pub department_id: Option<DepartmentId>,
    pub name: String,
    /// The work email address, unique across employees.
    pub email: String,
    /// The job title, e.g. "Teller".
    pub position: String,
    pub hired_on: Date,
}

/// The data needed to create or update an employee.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmployeeForm {
    pub branch_id: BranchId,
    #[serde(default)]
    pub department_id: Option<DepartmentId>,
    pub name: String,
    pub email: String,
    pub position: String,
    pub hired_on: Date,
}

pub fn create_employee_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS employee (
            id INTEGER PRIMARY KEY,
            branch_id INTEGER NOT NULL,
            department_id INTEGER,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            position TEXT NOT NULL,
            hired_on TEXT NOT NULL,
            FOREIGN KEY(branch_id) REFERENCES branch(id) ON UPDATE CASCADE,
            FOREIGN KEY(department_id) REFERENCES department(id) ON UPDATE CASCADE
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_employee(row: &Row) -> Result<Employee, rusqlite::Error> {
    Ok(Employee {
        id: row.get(0)?,
        branch_id: row.get(1)?,
        department_id: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        position: row.get(5)?,
        hired_on: row.get(6)?,
    })
}

/// Check the text fields are filled in and that the branch exists and owns the department.
fn validate_form(form: &EmployeeForm, connection: &Connection) -> Result<(), Error> {
    if form.name.trim().is_empty() {
        return Err(Error::EmptyField("employee name"));
    }

    if form.email.trim().is_empty() {
        return Err(Error::EmptyField("employee email"));
    }

    if form.position.trim().is_empty() {
        return Err(Error::EmptyField("employee position"));
    }

    get_branch(form.branch_id, connection).map_err(|error| match error {
        Error::NotFound => {
            Error::InvalidReference(format!("branch {} does not exist", form.branch_id))
        }
        error => error,
    })?;

    if let Some(department_id) = form.department_id {
        let department_branch: Option<BranchId> = connection
            .query_row(
                "SELECT branch_id FROM department WHERE id = ?1",
                params![department_id],
                |row| row.get(0),
            )
            .optional()?;

        match department_branch {
            Some(branch_id) if branch_id == form.branch_id => {}
            Some(_) => {
                return Err(Error::InvalidReference(format!(
                    "department {department_id} does not belong to branch {}",
                    form.branch_id
                )));
            }
            None => {
                return Err(Error::InvalidReference(format!(
                    "department {department_id} does not exist"
                )));
            }
        }
    }

    Ok(())
}

/// Hire a new employee.
///
/// # Errors
/// Returns [Error::InvalidReference] if the branch does not exist or the
/// department is not part of the branch, or [Error::Duplicate] if the email
/// address is taken.
pub fn create_employee(form: &EmployeeForm, connection: &Connection) -> Result<Employee, Error> {
    validate_form(form, connection)?;

    connection
        .prepare(
            "INSERT INTO employee (branch_id, department_id, name, email, position, hired_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING id, branch_id, department_id, name, email, position, hired_on",
        )?
        .query_row(
            params![
                form.branch_id,
                form.department_id,
                form.name.trim(),
                form.email.trim().to_lowercase(),
                form.position.trim(),
                form.hired_on
            ],
            map_row_to_employee,
        )
        .map_err(Error::from)
}

pub fn get_employee(id: EmployeeId, connection: &Connection) -> Result<Employee, Error> {
    connection
        .query_row(
            "SELECT id, branch_id, department_id, name, email, position, hired_on
             FROM employee WHERE id = ?1",
            params![id],
            map_row_to_employee,
        )
        .map_err(Error::from)
}

/// List employees, optionally only those of one branch.
pub fn list_employees(
    branch_id: Option<BranchId>,
    connection: &Connection,
) -> Result<Vec<Employee>, Error> {
    connection
        .prepare(
            "SELECT id, branch_id, department_id, name, email, position, hired_on
             FROM employee
             WHERE ?1 IS NULL OR branch_id = ?1
             ORDER BY name, id",
        )?
        .query_map(params![branch_id], map_row_to_employee)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Update an employee, e.g. to move them to another branch or department.
pub fn update_employee(
    id: EmployeeId,
    form: &EmployeeForm,
    connection: &Connection,
) -> Result<Employee, Error> {
    validate_form(form, connection)?;

    let rows_affected = connection.execute(
        "UPDATE employee
         SET branch_id = ?1, department_id = ?2, name = ?3, email = ?4, position = ?5, hired_on = ?6
         WHERE id = ?7",
        params![
            form.branch_id,
            form.department_id,
            form.name.trim(),
            form.email.trim().to_lowercase(),
            form.position.trim(),
            form.hired_on,
            id
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_employee(id, connection)
}

pub fn delete_employee(id: EmployeeId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM employee WHERE id = ?1", params![id])?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
