use std::io::Cursor;
use std::path::Path;

use image::{
    DynamicImage, ImageFormat,
    codecs::{
        jpeg::JpegEncoder,
        png::{CompressionType, FilterType as PngFilter, PngEncoder},
        webp::WebPEncoder,
    },
    imageops::FilterType,
};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    config::AppConfig,
    error::ApiError,
    models::{MediaFile, MediaFilter, MediaType, NewMedia, Page, Paginated, UpdateMediaRequest},
    repository::Repository,
    slug::slugify,
    storage::StorageService,
};

/// Widest image kept after optimisation.
pub const MAX_IMAGE_WIDTH: u32 = 1920;
/// Edge of the square cover-cropped thumbnail.
pub const THUMBNAIL_SIZE: u32 = 300;
pub const JPEG_QUALITY: u8 = 85;

const UNDECODABLE: &str = "Uploaded image could not be decoded";

/// One file received from the multipart form.
#[derive(Debug, Clone)]
pub struct Upload {
    pub original_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
    pub alt_text: Option<String>,
}

/// ProcessedImage
///
/// Output of the image pipeline: the optimised image, its thumbnail (when the format
/// can be re-encoded) and the final dimensions.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub bytes: Vec<u8>,
    pub thumbnail: Option<Vec<u8>>,
    pub width: u32,
    pub height: u32,
}

fn encode(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, image::ImageError> {
    let mut buffer = Vec::new();
    match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8())
            .write_with_encoder(JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY))?,
        ImageFormat::Png => image.write_with_encoder(PngEncoder::new_with_quality(
            &mut buffer,
            CompressionType::Best,
            PngFilter::Adaptive,
        ))?,
        ImageFormat::WebP => DynamicImage::ImageRgba8(image.to_rgba8())
            .write_with_encoder(WebPEncoder::new_lossless(&mut buffer))?,
        other => image.write_to(&mut Cursor::new(&mut buffer), other)?,
    }
    Ok(buffer)
}

/// process_image
///
/// Decodes the upload, scales it down to `MAX_IMAGE_WIDTH` when wider, re-encodes
/// JPEG at quality 85, PNG at best compression and WebP losslessly, and renders a
/// `THUMBNAIL_SIZE` square cover thumbnail in the same format. Formats without a
/// tuned encoder keep their original bytes unless they had to be resized.
///
/// CPU-bound: call it from `spawn_blocking`.
pub fn process_image(bytes: &[u8]) -> Result<ProcessedImage, ApiError> {
    let format = image::guess_format(bytes).map_err(|_| ApiError::bad_request(UNDECODABLE))?;
    let decoded = image::load_from_memory_with_format(bytes, format)
        .map_err(|_| ApiError::bad_request(UNDECODABLE))?;

    let resized = decoded.width() > MAX_IMAGE_WIDTH;
    let optimised = if resized {
        decoded.resize(MAX_IMAGE_WIDTH, u32::MAX, FilterType::Lanczos3)
    } else {
        decoded
    };

    let main = match format {
        ImageFormat::Jpeg | ImageFormat::Png | ImageFormat::WebP => encode(&optimised, format),
        _ if resized => encode(&optimised, format),
        _ => Ok(bytes.to_vec()),
    }
    .map_err(|err| ApiError::internal(format!("image encoding failed: {err}")))?;

    let thumb = optimised.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::Lanczos3);
    let thumbnail = match encode(&thumb, format) {
        Ok(bytes) => Some(bytes),
        Err(err) => {
            tracing::warn!(?format, error = %err, "thumbnail skipped: format cannot be encoded");
            None
        }
    };

    Ok(ProcessedImage {
        bytes: main,
        thumbnail,
        width: optimised.width(),
        height: optimised.height(),
    })
}

/// stored_filename
///
/// `{slugified stem}-{8 hex chars}{.ext}`. The extension is lower-cased; stems with
/// nothing sluggable fall back to `file`.
pub fn stored_filename(original_name: &str) -> String {
    let path = Path::new(original_name);
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(slugify)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "file".to_string());
    let unique = Uuid::new_v4().simple().to_string();
    format!("{stem}-{}{ext}", &unique[..8])
}

fn not_found() -> ApiError {
    ApiError::not_found("Media file not found")
}

/// upload
///
/// Classifies the file, optimises images, writes everything through the storage
/// backend and records the row. Stored objects are removed again if the row cannot
/// be written.
pub async fn upload(
    repo: &dyn Repository,
    storage: &dyn StorageService,
    config: &AppConfig,
    principal: &AuthUser,
    upload: Upload,
) -> Result<MediaFile, ApiError> {
    if upload.bytes.is_empty() {
        return Err(ApiError::bad_request("No file uploaded"));
    }
    if upload.bytes.len() > config.max_upload_bytes {
        return Err(ApiError::bad_request("File too large"));
    }

    let file_type = MediaType::from_mime(&upload.content_type);
    let filename = stored_filename(&upload.original_name);

    let raster = file_type == MediaType::Image && upload.content_type != "image/svg+xml";
    let (body, thumbnail, width, height) = if raster {
        let bytes = upload.bytes;
        let image = tokio::task::spawn_blocking(move || process_image(&bytes))
            .await
            .map_err(|e| ApiError::internal(format!("image task failed: {e}")))??;
        (
            image.bytes,
            image.thumbnail,
            Some(image.width as i32),
            Some(image.height as i32),
        )
    } else {
        (upload.bytes, None, None, None)
    };
    let file_size = body.len() as i64;

    let file_path = storage.put(&filename, body).await?;
    let thumbnail_url = match thumbnail {
        Some(bytes) => {
            let key = format!("thumb_{filename}");
            storage.put(&key, bytes).await?;
            Some(storage.public_url(&key))
        }
        None => None,
    };

    let inserted = repo
        .insert_media(NewMedia {
            filename: filename.clone(),
            original_name: upload.original_name,
            file_path,
            file_url: storage.public_url(&filename),
            thumbnail_url: thumbnail_url.clone(),
            file_type,
            mime_type: upload.content_type,
            file_size,
            image_width: width,
            image_height: height,
            alt_text: upload.alt_text.filter(|alt| !alt.trim().is_empty()),
            uploaded_by: principal.id,
        })
        .await;

    match inserted {
        Ok(media) => {
            tracing::info!(
                media_id = media.id,
                filename = %media.filename,
                file_type = ?media.file_type,
                size = media.file_size,
                "media uploaded"
            );
            Ok(media)
        }
        Err(err) => {
            let _ = storage.remove(&filename).await;
            if thumbnail_url.is_some() {
                let _ = storage.remove(&format!("thumb_{filename}")).await;
            }
            Err(err)
        }
    }
}

/// Newest uploads first, twenty per page by default.
pub async fn list(repo: &dyn Repository, filter: MediaFilter) -> Result<Paginated<MediaFile>, ApiError> {
    let page = Page::new(filter.page, filter.limit, Page::MEDIA_LIMIT);
    Ok(repo.list_media(&filter, page).await?.into_paginated(page))
}

pub async fn get(repo: &dyn Repository, id: i32) -> Result<MediaFile, ApiError> {
    repo.find_media(id).await?.ok_or_else(not_found)
}

/// Sets or clears the alt text. Only the uploader or a super-admin may edit.
pub async fn update(
    repo: &dyn Repository,
    principal: &AuthUser,
    id: i32,
    req: UpdateMediaRequest,
) -> Result<MediaFile, ApiError> {
    let mut media = get(repo, id).await?;
    principal.require_owner_or_super_admin(media.uploaded_by)?;

    let Some(alt_text) = req.alt_text else {
        return Err(ApiError::bad_request("Alt text is required"));
    };
    media.alt_text = alt_text.filter(|alt| !alt.trim().is_empty());
    repo.save_media(&media).await
}

/// Soft delete. The stored file stays where it is.
pub async fn delete(repo: &dyn Repository, principal: &AuthUser, id: i32) -> Result<(), ApiError> {
    let media = get(repo, id).await?;
    principal.require_owner_or_super_admin(media.uploaded_by)?;
    if !repo.soft_delete_media(id).await? {
        return Err(not_found());
    }
    tracing::info!(media_id = id, "media deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 128]));
        let mut buffer = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
            .unwrap();
        buffer
    }

    #[test]
    fn wide_images_are_scaled_to_max_width() {
        let processed = process_image(&png(2400, 1200)).unwrap();
        assert_eq!(processed.width, MAX_IMAGE_WIDTH);
        assert_eq!(processed.height, 960);

        let thumb = image::load_from_memory(processed.thumbnail.as_deref().unwrap()).unwrap();
        assert_eq!((thumb.width(), thumb.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
    }

    #[test]
    fn small_images_keep_their_size() {
        let processed = process_image(&png(640, 480)).unwrap();
        assert_eq!((processed.width, processed.height), (640, 480));
        assert_eq!(
            image::guess_format(&processed.bytes).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn garbage_is_a_bad_request() {
        let err = process_image(b"definitely not an image").unwrap_err();
        assert_eq!(err.code(), "BAD_REQUEST");
    }

    #[test]
    fn stored_filenames_are_slugged_and_unique() {
        let a = stored_filename("My Holiday Photo.JPG");
        let b = stored_filename("My Holiday Photo.JPG");
        assert!(a.starts_with("my-holiday-photo-"));
        assert!(a.ends_with(".jpg"));
        assert_eq!(a.len(), "my-holiday-photo-".len() + 8 + ".jpg".len());
        assert_ne!(a, b);
        assert!(stored_filename("???.pdf").starts_with("file-"));
        assert!(!stored_filename("README").contains('.'));
    }
}
