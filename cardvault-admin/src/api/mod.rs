//! HTTP API handlers for cardvault-admin

pub mod cards;
pub mod health;
pub mod locations;
pub mod sets;

pub use cards::card_routes;
pub use health::health_routes;
pub use locations::location_routes;
pub use sets::set_routes;

use serde::Serialize;

/// `{"success": true, "message": ..., ...data}`
#[derive(Debug, Serialize)]
pub struct SuccessResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl<T: Serialize> SuccessResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}
