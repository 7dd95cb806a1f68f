pub mod activity;
pub mod auth;
pub mod config;
pub mod contacts;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod models;
pub mod schema;
pub mod state;
pub mod tickets;
