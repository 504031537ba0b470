pub mod app;
pub mod catalog;
pub mod categories;
pub mod client;
pub mod config;
pub mod episodes;
pub mod error;
pub mod fill;
pub mod filter;
pub mod hash;
pub mod history;
pub mod models;
