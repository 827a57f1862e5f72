pub mod config;
pub mod manifest;
pub mod partition;
pub mod ratings;
pub mod schema;
pub mod types;
pub mod verify;
