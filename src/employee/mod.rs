mod core;
mod endpoints;

pub use core::{
    Employee, EmployeeForm, EmployeeId, create_employee, create_employee_table, delete_employee,
    get_employee, list_employees, update_employee,
};
pub use endpoints::{
    create_employee_endpoint, delete_employee_endpoint, get_employee_endpoint,
    list_employees_endpoint, update_employee_endpoint,
};
