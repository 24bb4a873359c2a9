mod core;
mod endpoints;

pub use core::{
    Customer, CustomerForm, CustomerId, create_customer, create_customer_table, delete_customer,
    get_customer, list_customers, update_customer,
};
pub use endpoints::{
    create_customer_endpoint, delete_customer_endpoint, get_customer_endpoint,
    list_customers_endpoint, update_customer_endpoint,
};
