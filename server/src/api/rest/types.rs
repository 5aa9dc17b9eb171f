//! Shared types for REST API

use serde::Serialize;

#[derive(Serialize)]
pub struct StateResponse {
    pub server: String,
    /// "ok" when the card is mounted, "missing" otherwise
    pub storage: &'static str,
    /// Whether the archive directory exists on the card
    pub archive: bool,
}
