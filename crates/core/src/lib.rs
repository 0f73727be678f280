pub mod api;
pub mod config;
pub mod error;
pub mod identity;
pub mod models;
pub mod retry;

pub use error::{Error, Result};
