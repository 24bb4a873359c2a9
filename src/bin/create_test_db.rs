use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::OffsetDateTime;

use teller_rs::{
    AccountKind, BranchForm, CustomerForm, DepartmentForm, EmployeeForm, LoanRequestForm, Money,
    OpenAccount, approve_loan_request, create_branch, create_customer, create_department,
    create_employee, deposit, initialize_db, open_account, submit_loan_request, transfer,
};

/// A utility for creating a demo database for the REST API server of teller_rs.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Creating branches and staff...");
    let central = create_branch(
        &BranchForm {
            name: "Central".to_owned(),
            address: "1 Queen Street".to_owned(),
        },
        &conn,
    )?;
    let harbour = create_branch(
        &BranchForm {
            name: "Harbour".to_owned(),
            address: "12 Quay Street".to_owned(),
        },
        &conn,
    )?;

    let lending = create_department(
        &DepartmentForm {
            branch_id: central.id,
            name: "Lending".to_owned(),
        },
        &conn,
    )?;
    create_employee(
        &EmployeeForm {
            branch_id: central.id,
            department_id: Some(lending.id),
            name: "Margaret Hamilton".to_owned(),
            email: "margaret@teller.example".to_owned(),
            position: "Loan officer".to_owned(),
            hired_on: OffsetDateTime::now_utc().date(),
        },
        &conn,
    )?;

    println!("Creating customers and accounts...");
    let alice = create_customer(
        &CustomerForm {
            name: "Alice Adams".to_owned(),
            email: "alice@example.com".to_owned(),
            phone: Some("021 555 0101".to_owned()),
        },
        &conn,
    )?;
    let bob = create_customer(
        &CustomerForm {
            name: "Bob Brown".to_owned(),
            email: "bob@example.com".to_owned(),
            phone: None,
        },
        &conn,
    )?;

    let alice_checking = open_account(
        &OpenAccount {
            customer_id: alice.id,
            branch_id: central.id,
            kind: AccountKind::Checking,
            initial_deposit: Some(Money::new(Decimal::new(250_000, 2))),
        },
        &conn,
    )?;
    let alice_savings = open_account(
        &OpenAccount {
            customer_id: alice.id,
            branch_id: central.id,
            kind: AccountKind::Savings,
            initial_deposit: None,
        },
        &conn,
    )?;
    let bob_checking = open_account(
        &OpenAccount {
            customer_id: bob.id,
            branch_id: harbour.id,
            kind: AccountKind::Checking,
            initial_deposit: Some(Money::new(Decimal::new(40_000, 2))),
        },
        &conn,
    )?;

    deposit(
        alice_savings.id,
        Money::new(Decimal::new(100_000, 2)),
        Some("Opening savings"),
        &conn,
    )?;
    transfer(
        alice_checking.id,
        bob_checking.id,
        Money::new(Decimal::new(7_550, 2)),
        Some("Concert tickets"),
        &conn,
    )?;

    println!("Creating loans...");
    let request = submit_loan_request(
        &LoanRequestForm {
            customer_id: bob.id,
            account_id: bob_checking.id,
            amount: Money::new(Decimal::new(1_200_00, 2)),
            term_months: 12,
            purpose: "Used car".to_owned(),
        },
        &conn,
    )?;
    approve_loan_request(
        request.id,
        750,
        Some("Stable income"),
        OffsetDateTime::now_utc().date(),
        &conn,
    )?;
    submit_loan_request(
        &LoanRequestForm {
            customer_id: alice.id,
            account_id: alice_checking.id,
            amount: Money::new(Decimal::new(5_000_00, 2)),
            term_months: 24,
            purpose: "Kitchen renovation".to_owned(),
        },
        &conn,
    )?;

    println!("Success!");

    Ok(())
}
