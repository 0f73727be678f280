pub mod query;
pub mod trigger;
