//! Application services layer scaffolding.

pub mod envelope;
pub mod error;
pub mod provider;
pub mod service;
pub mod store;
