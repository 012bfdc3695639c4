use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use super::common::double_option;

/// MediaType
///
/// Coarse classification derived from the upload's MIME type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, ToSchema, TS,
)]
#[sqlx(type_name = "media_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum MediaType {
    Image,
    Document,
    Video,
    Other,
}

impl MediaType {
    pub fn from_mime(mime: &str) -> Self {
        let mime = mime.to_ascii_lowercase();
        if mime.starts_with("image/") {
            Self::Image
        } else if mime.starts_with("video/") {
            Self::Video
        } else if mime == "application/pdf"
            || mime == "application/msword"
            || mime.starts_with("application/vnd.openxmlformats-officedocument")
            || mime.starts_with("application/vnd.ms-")
            || mime.starts_with("text/")
        {
            Self::Document
        } else {
            Self::Other
        }
    }
}

/// MediaFile
///
/// Row of `media_files`. `filename` is generated at upload and unique; the bytes live
/// under the storage root at `file_path`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema, TS)]
#[ts(export)]
pub struct MediaFile {
    pub id: i32,
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub file_type: MediaType,
    pub mime_type: String,
    pub file_size: i64,
    pub image_width: Option<i32>,
    pub image_height: Option<i32>,
    pub alt_text: Option<String>,
    pub uploaded_by: i32,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    #[ts(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewMedia {
    pub filename: String,
    pub original_name: String,
    pub file_path: String,
    pub file_url: String,
    pub thumbnail_url: Option<String>,
    pub file_type: MediaType,
    pub mime_type: String,
    pub file_size: i64,
    pub image_width: Option<i32>,
    pub image_height: Option<i32>,
    pub alt_text: Option<String>,
    pub uploaded_by: i32,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMediaRequest {
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub alt_text: Option<Option<String>>,
}

/// MediaFilter
///
/// Query parameters of `GET /media`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct MediaFilter {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    #[serde(rename = "type")]
    pub file_type: Option<MediaType>,
    /// Case-insensitive match on original name, filename or alt text.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_mime() {
        assert_eq!(MediaType::from_mime("image/png"), MediaType::Image);
        assert_eq!(MediaType::from_mime("IMAGE/JPEG"), MediaType::Image);
        assert_eq!(MediaType::from_mime("video/mp4"), MediaType::Video);
        assert_eq!(MediaType::from_mime("application/pdf"), MediaType::Document);
        assert_eq!(
            MediaType::from_mime(
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            ),
            MediaType::Document
        );
        assert_eq!(MediaType::from_mime("application/zip"), MediaType::Other);
    }
}
