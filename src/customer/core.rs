//! Defines the customer model and its database queries.

use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, database_id::DatabaseId};

pub type CustomerId = DatabaseId;

/// A person who holds accounts and loans at the bank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// The id of the customer.
    pub id: CustomerId,
    /// The customer's full name.
    pub name: String,
    /// The customer's email address, unique across customers.
    pub email: String,
    /// An optional contact phone number.
    pub phone: Option<String>,
    /// When the customer was registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to register or update a customer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerForm {
    /// The customer's full name.
    pub name: String,
    /// The customer's email address.
    pub email: String,
    /// An optional contact phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

impl CustomerForm {
    fn validate(&self) -> Result<(), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::EmptyField("customer name"));
        }

        let email = self.email.trim();
        if email.is_empty() {
            return Err(Error::EmptyField("customer email"));
        }

        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(()),
            _ => Err(Error::InvalidRequest(format!(
                "\"{email}\" is not a valid email address"
            ))),
        }
    }

    fn phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

pub fn create_customer_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS customer (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL UNIQUE,
            phone TEXT,
            created_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

pub fn map_row_to_customer(row: &Row) -> Result<Customer, rusqlite::Error> {
    Ok(Customer {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        phone: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Register a new customer.
///
/// # Errors
/// Returns [Error::EmptyField] or [Error::InvalidRequest] if the form is not
/// valid, or [Error::Duplicate] if the email address is already registered.
pub fn create_customer(form: &CustomerForm, connection: &Connection) -> Result<Customer, Error> {
    form.validate()?;

    connection
        .prepare(
            "INSERT INTO customer (name, email, phone, created_at) VALUES (?1, ?2, ?3, ?4)
             RETURNING id, name, email, phone, created_at",
        )?
        .query_row(
            params![
                form.name.trim(),
                form.email.trim().to_lowercase(),
                form.phone(),
                OffsetDateTime::now_utc()
            ],
            map_row_to_customer,
        )
        .map_err(Error::from)
}

/// Get a customer by ID.
pub fn get_customer(id: CustomerId, connection: &Connection) -> Result<Customer, Error> {
    connection
        .query_row(
            "SELECT id, name, email, phone, created_at FROM customer WHERE id = ?1",
            params![id],
            map_row_to_customer,
        )
        .map_err(Error::from)
}

/// Get all customers ordered by name.
pub fn list_customers(connection: &Connection) -> Result<Vec<Customer>, Error> {
    connection
        .prepare("SELECT id, name, email, phone, created_at FROM customer ORDER BY name, id")?
        .query_map([], map_row_to_customer)?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// Update a customer's contact details.
///
/// # Errors
/// Returns [Error::NotFound] if there is no customer with `id`.
pub fn update_customer(
    id: CustomerId,
    form: &CustomerForm,
    connection: &Connection,
) -> Result<Customer, Error> {
    form.validate()?;

    let rows_affected = connection.execute(
        "UPDATE customer SET name = ?1, email = ?2, phone = ?3 WHERE id = ?4",
        params![
            form.name.trim(),
            form.email.trim().to_lowercase(),
            form.phone(),
            id
        ],
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    get_customer(id, connection)
}

/// Delete a customer that holds no accounts.
///
/// The customer's notifications are deleted with them.
///
/// # Errors
/// Returns [Error::NotFound] if there is no customer with `id`, or
/// [Error::RecordInUse] if the customer still has accounts or loan requests.
pub fn delete_customer(id: CustomerId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection
        .execute("DELETE FROM customer WHERE id = ?1", params![id])
        .map_err(|error| match Error::from(error) {
            Error::InvalidReference(_) => Error::RecordInUse,
            error => error,
        })?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        notification::{NotificationKind, create_notification, list_notifications},
        test_utils::{create_test_account, create_test_branch, get_test_connection},
    };

    use super::{
        CustomerForm, create_customer, delete_customer, get_customer, list_customers,
        update_customer,
    };

    fn form(name: &str, email: &str) -> CustomerForm {
        CustomerForm {
            name: name.to_owned(),
            email: email.to_owned(),
            phone: Some("  ".to_owned()),
        }
    }

    #[test]
    fn create_customer_normalizes_fields() {
        let connection = get_test_connection();

        let customer =
            create_customer(&form(" Ada Lovelace ", "Ada@Example.com"), &connection).unwrap();

        assert_eq!(customer.name, "Ada Lovelace");
        assert_eq!(customer.email, "ada@example.com");
        assert_eq!(customer.phone, None);
        assert_eq!(get_customer(customer.id, &connection), Ok(customer));
    }

    #[test]
    fn create_customer_rejects_invalid_email() {
        let connection = get_test_connection();

        let result = create_customer(&form("Ada", "not-an-email"), &connection);

        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn create_customer_rejects_duplicate_email() {
        let connection = get_test_connection();
        create_customer(&form("Ada", "ada@example.com"), &connection).unwrap();

        let result = create_customer(&form("Another Ada", "ADA@example.com"), &connection);

        assert_eq!(result, Err(Error::Duplicate("email".to_owned())));
    }

    #[test]
    fn update_customer_changes_details() {
        let connection = get_test_connection();
        let customer = create_customer(&form("Ada", "ada@example.com"), &connection).unwrap();

        let updated = update_customer(
            customer.id,
            &CustomerForm {
                name: "Ada King".to_owned(),
                email: "ada.king@example.com".to_owned(),
                phone: Some("021 555 0100".to_owned()),
            },
            &connection,
        )
        .unwrap();

        assert_eq!(updated.name, "Ada King");
        assert_eq!(updated.phone.as_deref(), Some("021 555 0100"));
        assert_eq!(list_customers(&connection).unwrap(), vec![updated]);
    }

    #[test]
    fn delete_customer_removes_notifications() {
        let connection = get_test_connection();
        let customer = create_customer(&form("Ada", "ada@example.com"), &connection).unwrap();
        create_notification(
            customer.id,
            NotificationKind::General,
            "Welcome",
            "Thanks for joining",
            &connection,
        )
        .unwrap();

        delete_customer(customer.id, &connection).unwrap();

        assert_eq!(get_customer(customer.id, &connection), Err(Error::NotFound));
        assert_eq!(
            list_notifications(customer.id, false, &connection),
            Ok(vec![])
        );
    }

    #[test]
    fn delete_customer_with_account_is_rejected() {
        let connection = get_test_connection();
        let branch = create_test_branch(&connection);
        let customer = create_customer(&form("Ada", "ada@example.com"), &connection).unwrap();
        create_test_account(customer.id, branch.id, &connection);

        assert_eq!(
            delete_customer(customer.id, &connection),
            Err(Error::RecordInUse)
        );
    }
}
