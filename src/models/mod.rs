//! Domain records and request/response payloads.
//!
//! Records map 1:1 onto the tables in `migrations/` (via `sqlx::FromRow`) and serialise with
//! camelCase keys. TypeScript bindings are exported with `ts-rs` for the frontend.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

pub mod analytics;
pub mod certificate;
pub mod content;
pub mod course;
pub mod enrollment;
pub mod user;

pub use analytics::*;
pub use certificate::*;
pub use content::*;
pub use course::*;
pub use enrollment::*;
pub use user::*;

/// UnknownVariant
///
/// Raised when a text column holds a value that none of our enums recognise.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// UploadRequest
///
/// Metadata the client sends before uploading a file directly to object storage.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadRequest {
    #[schema(example = "intro.mp4")]
    pub file_name: String,
    #[schema(example = "video/mp4")]
    pub content_type: String,
    /// Size in bytes.
    pub file_size: i64,
}

/// UploadTicket
///
/// Presigned upload target plus the public URL the object will be served from once uploaded.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct UploadTicket {
    pub upload_url: String,
    pub resource_key: String,
    pub file_url: String,
}

/// MessageResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}
