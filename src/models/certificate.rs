use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

/// Certificate
///
/// Issued once per completed enrollment. The PDF itself lives in object storage under
/// `{certificate_storage_path}/{file_name}`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Certificate {
    pub certificate_id: String,
    pub enrollment_id: String,
    pub user_id: String,
    pub course_id: String,
    /// `CERT-{year}-{six digits}`.
    pub certificate_number: String,
    /// `/api/certificates/download/{certificateId}`.
    pub certificate_url: String,
    pub file_name: String,
    #[ts(type = "string")]
    pub issued_at: DateTime<Utc>,
}
