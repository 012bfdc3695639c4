use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::{
    AppState,
    auth::AuthUser,
    error::ApiError,
    extract::{ApiQuery, EntityId, ValidatedJson},
    models::{
        ApiResponse, MediaFile, MediaFilter, MessageResponse, Paginated, UpdateMediaRequest,
        created, message, ok,
    },
    permissions::{Action, Module},
    services::media::{self as service, Upload},
};

/// Body of the multipart upload, for the OpenAPI document only.
#[derive(utoipa::ToSchema)]
#[allow(dead_code)]
pub struct UploadForm {
    #[schema(value_type = String, format = Binary)]
    file: Vec<u8>,
    #[schema(rename = "altText")]
    alt_text: Option<String>,
}

/// Reads the `file` part and the optional `altText` part. Other parts are ignored.
async fn read_upload(mut multipart: Multipart) -> Result<Upload, ApiError> {
    let mut file = None;
    let mut alt_text = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("file") => {
                let original_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field.bytes().await?.to_vec();
                file = Some((original_name, content_type, bytes));
            }
            Some("altText") => alt_text = Some(field.text().await?),
            _ => {}
        }
    }

    let (original_name, content_type, bytes) =
        file.ok_or_else(|| ApiError::bad_request("No file uploaded"))?;
    Ok(Upload {
        original_name,
        content_type,
        bytes,
        alt_text,
    })
}

/// upload_media
///
/// [Authenticated Route] Multipart upload. Images are resized, re-encoded and given a
/// 300×300 thumbnail; other files are stored as sent.
#[utoipa::path(
    post,
    path = "/api/v1/media/upload",
    tag = "media",
    security(("bearer" = [])),
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "File uploaded", body = MediaFile),
        (status = 400, description = "Missing, oversized or undecodable file")
    )
)]
pub async fn upload_media(
    user: AuthUser,
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<MediaFile>>), ApiError> {
    user.require_writer(Module::Media, Action::Upload)?;
    let upload = read_upload(multipart).await?;
    let media = service::upload(
        state.repo.as_ref(),
        state.storage.as_ref(),
        &state.config,
        &user,
        upload,
    )
    .await?;
    Ok(created(media))
}

/// list_media
///
/// [Authenticated Route] Newest first, 20 per page by default.
#[utoipa::path(
    get,
    path = "/api/v1/media",
    tag = "media",
    security(("bearer" = [])),
    params(MediaFilter),
    responses((status = 200, description = "Paginated media", body = [MediaFile]))
)]
pub async fn list_media(
    user: AuthUser,
    State(state): State<AppState>,
    ApiQuery(filter): ApiQuery<MediaFilter>,
) -> Result<Json<Paginated<MediaFile>>, ApiError> {
    user.require_permission(Module::Media, Action::Read)?;
    Ok(Json(service::list(state.repo.as_ref(), filter).await?))
}

/// get_media
///
/// [Authenticated Route]
#[utoipa::path(
    get,
    path = "/api/v1/media/{id}",
    tag = "media",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Media id")),
    responses(
        (status = 200, description = "Media file", body = MediaFile),
        (status = 404, description = "Media file not found")
    )
)]
pub async fn get_media(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<ApiResponse<MediaFile>>, ApiError> {
    user.require_permission(Module::Media, Action::Read)?;
    Ok(ok(service::get(state.repo.as_ref(), id).await?))
}

/// update_media
///
/// [Authenticated Route] Sets or clears the alt text. Uploader or super-admin only.
#[utoipa::path(
    put,
    path = "/api/v1/media/{id}",
    tag = "media",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Media id")),
    request_body = UpdateMediaRequest,
    responses(
        (status = 200, description = "Media updated", body = MediaFile),
        (status = 403, description = "Not the uploader")
    )
)]
pub async fn update_media(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
    ValidatedJson(payload): ValidatedJson<UpdateMediaRequest>,
) -> Result<Json<ApiResponse<MediaFile>>, ApiError> {
    user.require_writer(Module::Media, Action::Update)?;
    Ok(ok(service::update(state.repo.as_ref(), &user, id, payload).await?))
}

/// delete_media
///
/// [Authenticated Route] Soft delete; the stored file is kept. Uploader or
/// super-admin only.
#[utoipa::path(
    delete,
    path = "/api/v1/media/{id}",
    tag = "media",
    security(("bearer" = [])),
    params(("id" = i32, Path, description = "Media id")),
    responses((status = 200, description = "Media deleted", body = MessageResponse))
)]
pub async fn delete_media(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(id): EntityId,
) -> Result<Json<MessageResponse>, ApiError> {
    user.require_writer(Module::Media, Action::Delete)?;
    service::delete(state.repo.as_ref(), &user, id).await?;
    Ok(message("Media file deleted successfully"))
}
