mod core;
mod endpoints;

pub use core::{
    Department, DepartmentForm, DepartmentId, create_department, create_department_table,
    delete_department, get_department, list_departments, rename_department,
};
pub use endpoints::{
    create_department_endpoint, delete_department_endpoint, get_department_endpoint,
    list_departments_endpoint, rename_department_endpoint,
};
