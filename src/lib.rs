pub mod api;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod models;
pub mod notify;
pub mod observability;
pub mod query;
pub mod state;
pub mod store;
