pub mod api;
pub mod app;
pub mod cache;
pub mod config;
pub mod error;
pub mod filters;
pub mod logging;
pub mod models;
pub mod parser;
pub mod query;
pub mod store;
pub mod ui;
pub mod validation;
