mod common;

use std::io::Cursor;

use common::TestContext;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use morphe_cms::{
    models::{MediaFilter, MediaType, UpdateMediaRequest},
    permissions::{EDITOR, SUPER_ADMIN},
    services::media::{self, THUMBNAIL_SIZE, Upload},
    storage::MockStorageService,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ImageBuffer::from_fn(width, height, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 64]));
    let mut buffer = Vec::new();
    DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .unwrap();
    buffer
}

fn image_upload(name: &str, bytes: Vec<u8>) -> Upload {
    Upload {
        original_name: name.to_string(),
        content_type: "image/png".to_string(),
        bytes,
        alt_text: Some("Team photo".to_string()),
    }
}

#[tokio::test]
async fn test_image_upload_stores_optimised_file_and_thumbnail() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;

    let media = media::upload(
        ctx.repo.as_ref(),
        &ctx.storage,
        &ctx.config,
        &editor,
        image_upload("Team Photo.PNG", png(2400, 600)),
    )
    .await
    .unwrap();

    assert_eq!(media.file_type, MediaType::Image);
    assert_eq!(media.image_width, Some(1920));
    assert_eq!(media.image_height, Some(480));
    assert_eq!(media.uploaded_by, editor.id);
    assert_eq!(media.alt_text.as_deref(), Some("Team photo"));
    assert!(media.filename.starts_with("team-photo-"));
    assert!(media.filename.ends_with(".png"));
    assert_eq!(media.file_url, format!("/uploads/{}", media.filename));

    let stored = ctx.storage.object(&media.filename).expect("main object stored");
    assert_eq!(stored.len() as i64, media.file_size);

    let thumb_key = format!("thumb_{}", media.filename);
    assert_eq!(media.thumbnail_url, Some(format!("/uploads/{thumb_key}")));
    let thumb = image::load_from_memory(&ctx.storage.object(&thumb_key).unwrap()).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));
}

#[tokio::test]
async fn test_documents_are_stored_verbatim() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let bytes = b"%PDF-1.4 fake pdf body".to_vec();

    let media = media::upload(
        ctx.repo.as_ref(),
        &ctx.storage,
        &ctx.config,
        &editor,
        Upload {
            original_name: "Annual Report.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: bytes.clone(),
            alt_text: Some("   ".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(media.file_type, MediaType::Document);
    assert_eq!(media.thumbnail_url, None);
    assert_eq!(media.image_width, None);
    assert_eq!(media.alt_text, None);
    assert_eq!(ctx.storage.object(&media.filename), Some(bytes));
}

#[tokio::test]
async fn test_upload_rejections() {
    let mut ctx = TestContext::new();
    ctx.config.max_upload_bytes = 1024;
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let repo = ctx.repo.as_ref();

    let empty = media::upload(repo, &ctx.storage, &ctx.config, &editor, image_upload("a.png", vec![]))
        .await
        .unwrap_err();
    assert_eq!(empty.to_string(), "No file uploaded");

    let large = media::upload(
        repo,
        &ctx.storage,
        &ctx.config,
        &editor,
        image_upload("big.png", vec![0u8; 2048]),
    )
    .await
    .unwrap_err();
    assert_eq!(large.to_string(), "File too large");

    let garbage = media::upload(
        repo,
        &ctx.storage,
        &ctx.config,
        &editor,
        image_upload("fake.png", b"not really a png".to_vec()),
    )
    .await
    .unwrap_err();
    assert_eq!(garbage.code(), "BAD_REQUEST");
    assert!(ctx.storage.keys().is_empty());
}

#[tokio::test]
async fn test_storage_failure_surfaces_as_error() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let failing = MockStorageService::new_failing();

    let err = media::upload(
        ctx.repo.as_ref(),
        &failing,
        &ctx.config,
        &editor,
        image_upload("photo.png", png(10, 10)),
    )
    .await
    .unwrap_err();
    assert!(err.status().is_server_error());
}

#[tokio::test]
async fn test_only_uploader_or_super_admin_may_edit_or_delete() {
    let ctx = TestContext::new();
    let owner = ctx.principal(EDITOR, "owner@morphelabs.com").await;
    let other = ctx.principal(EDITOR, "other@morphelabs.com").await;
    let admin = ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await;
    let repo = ctx.repo.as_ref();

    let media = media::upload(
        repo,
        &ctx.storage,
        &ctx.config,
        &owner,
        image_upload("logo.png", png(32, 32)),
    )
    .await
    .unwrap();

    let err = media::update(
        repo,
        &other,
        media.id,
        UpdateMediaRequest {
            alt_text: Some(Some("Hijacked".to_string())),
        },
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "FORBIDDEN");

    let missing_alt = media::update(repo, &owner, media.id, UpdateMediaRequest::default())
        .await
        .unwrap_err();
    assert_eq!(missing_alt.to_string(), "Alt text is required");

    let updated = media::update(
        repo,
        &owner,
        media.id,
        UpdateMediaRequest {
            alt_text: Some(Some("Company logo".to_string())),
        },
    )
    .await
    .unwrap();
    assert_eq!(updated.alt_text.as_deref(), Some("Company logo"));

    let cleared = media::update(repo, &admin, media.id, UpdateMediaRequest { alt_text: Some(None) })
        .await
        .unwrap();
    assert_eq!(cleared.alt_text, None);

    assert_eq!(
        media::delete(repo, &other, media.id).await.unwrap_err().code(),
        "FORBIDDEN"
    );
    media::delete(repo, &admin, media.id).await.unwrap();
    assert!(ctx.repo.media_row(media.id).unwrap().deleted_at.is_some());
    assert_eq!(media::get(repo, media.id).await.unwrap_err().code(), "NOT_FOUND");
    // The bytes stay in storage.
    assert!(ctx.storage.object(&media.filename).is_some());
}

#[tokio::test]
async fn test_media_listing_filters_and_pages() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let repo = ctx.repo.as_ref();

    for n in 0..3 {
        media::upload(
            repo,
            &ctx.storage,
            &ctx.config,
            &editor,
            image_upload(&format!("shot-{n}.png"), png(16, 16)),
        )
        .await
        .unwrap();
    }
    media::upload(
        repo,
        &ctx.storage,
        &ctx.config,
        &editor,
        Upload {
            original_name: "notes.txt".to_string(),
            content_type: "text/plain".to_string(),
            bytes: b"hello".to_vec(),
            alt_text: None,
        },
    )
    .await
    .unwrap();

    let all = media::list(repo, MediaFilter::default()).await.unwrap();
    assert_eq!(all.pagination.total, 4);
    assert_eq!(all.pagination.limit, 20);

    let images = media::list(
        repo,
        MediaFilter {
            file_type: Some(MediaType::Image),
            limit: Some(2),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(images.pagination.total, 3);
    assert_eq!(images.pagination.total_pages, 2);
    assert_eq!(images.data.len(), 2);

    let searched = media::list(
        repo,
        MediaFilter {
            search: Some("NOTES".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert_eq!(searched.data.len(), 1);
    assert_eq!(searched.data[0].file_type, MediaType::Document);
}
