pub mod car;
pub mod customer;
pub mod dealership;
pub mod employee;
pub mod error;
pub mod logger;
pub mod repl;
pub mod sale;
pub mod schema;
pub mod seed;
pub mod store;
