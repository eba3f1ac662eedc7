pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod flow;
pub mod models;
pub mod store;
