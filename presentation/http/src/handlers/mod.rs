//! HTTP request handlers for the relay

pub mod generate;
pub mod health;
