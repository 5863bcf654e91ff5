//! Database initialization and table records

pub mod init;
pub mod models;

pub use init::*;
pub use models::*;
