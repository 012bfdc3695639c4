mod common;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use common::{PASSWORD, TestContext};
use morphe_cms::{
    create_router,
    permissions::{EDITOR, SUPER_ADMIN, VIEWER},
};
use serde_json::{Value, json};
use std::io::Cursor;
use tower::ServiceExt;

// --- Helpers ---

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn get(uri: &str, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    builder.body(Body::empty()).unwrap()
}

fn json_request(method: Method, uri: &str, bearer: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, bearer);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

// --- Health, docs and fallbacks ---

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(&app, get("/api/v1/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Morphe CMS API is running");
    assert_eq!(body["environment"], "local");
}

#[tokio::test]
async fn test_openapi_document_is_served() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(&app, get("/api-docs/openapi.json", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"].get("/api/v1/posts").is_some());
    assert!(body["components"]["securitySchemes"].get("bearer").is_some());
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(&app, get("/api/v1/does-not-exist", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert_eq!(
        body["error"]["message"],
        "Route GET /api/v1/does-not-exist not found"
    );
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let response = app.oneshot(get("/api/v1/health", None)).await.unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

// --- Authentication ---

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(&app, get("/api/v1/auth/me", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "No authentication token provided");

    let (status, body) = send(&app, get("/api/v1/users", Some("Bearer garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_login_then_me() {
    let ctx = TestContext::new();
    ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let app = create_router(ctx.state());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "editor@morphelabs.com", "password": PASSWORD }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["user"]["role"], EDITOR);
    let token = body["data"]["accessToken"].as_str().unwrap().to_string();

    let (status, body) = send(&app, get("/api/v1/auth/me", Some(&format!("Bearer {token}")))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["email"], "editor@morphelabs.com");
    assert_eq!(body["data"]["role"]["slug"], EDITOR);
}

#[tokio::test]
async fn test_login_payload_is_validated() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = body["error"]["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert_eq!(fields, vec!["email", "password"]);

    let (status, _) = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn from_client(mut request: Request<Body>, ip: &'static str) -> Request<Body> {
    request
        .headers_mut()
        .insert("x-forwarded-for", header::HeaderValue::from_static(ip));
    request
}

fn login_from(ip: &'static str, password: &str) -> Request<Body> {
    from_client(
        json_request(
            Method::POST,
            "/api/v1/auth/login",
            None,
            json!({ "email": "editor@morphelabs.com", "password": password }),
        ),
        ip,
    )
}

#[tokio::test]
async fn test_failed_logins_are_rate_limited_per_client() {
    let ctx = TestContext::new();
    ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let app = create_router(ctx.state());

    // Successful logins do not use up the budget.
    for _ in 0..3 {
        let (status, _) = send(&app, login_from("203.0.113.10", PASSWORD)).await;
        assert_eq!(status, StatusCode::OK);
    }
    for _ in 0..ctx.config.login_rate_limit_max {
        let (status, _) = send(&app, login_from("203.0.113.10", "Wrong-password1")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let response = app
        .clone()
        .oneshot(login_from("203.0.113.10", PASSWORD))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(response.headers().contains_key(header::RETRY_AFTER));
    let (status, body) = send(&app, login_from("203.0.113.10", PASSWORD)).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "LOGIN_RATE_LIMIT_EXCEEDED");
    assert_eq!(
        body["error"]["message"],
        "Too many login attempts, please try again later"
    );

    let (status, _) = send(&app, login_from("198.51.100.20", PASSWORD)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_forgot_password_is_rate_limited_per_client() {
    let ctx = TestContext::new();
    ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let app = create_router(ctx.state());
    let forgot = || {
        from_client(
            json_request(
                Method::POST,
                "/api/v1/auth/forgot-password",
                None,
                json!({ "email": "editor@morphelabs.com" }),
            ),
            "203.0.113.30",
        )
    };

    for _ in 0..3 {
        let (status, _) = send(&app, forgot()).await;
        assert_eq!(status, StatusCode::OK);
    }
    let (status, body) = send(&app, forgot()).await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error"]["code"], "PASSWORD_RESET_RATE_LIMIT_EXCEEDED");
    assert_eq!(
        body["error"]["message"],
        "Too many password reset requests, please try again later"
    );
    assert_eq!(ctx.mailer.sent().len(), 3);
}

// --- Authorization and visibility ---

#[tokio::test]
async fn test_drafts_are_visible_to_staff_only() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let viewer = ctx.principal(VIEWER, "viewer@morphelabs.com").await;
    let editor_bearer = ctx.bearer(&editor);
    let viewer_bearer = ctx.bearer(&viewer);
    let app = create_router(ctx.state());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/posts",
            Some(&editor_bearer),
            json!({ "title": "Quarterly Roadmap", "content": "Coming soon" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "draft");
    let id = body["data"]["id"].as_i64().unwrap();

    let (_, anonymous) = send(&app, get("/api/v1/posts", None)).await;
    assert_eq!(anonymous["pagination"]["total"], 0);

    let (_, as_viewer) = send(&app, get("/api/v1/posts", Some(&viewer_bearer))).await;
    assert_eq!(as_viewer["pagination"]["total"], 0);

    let (_, as_editor) = send(&app, get("/api/v1/posts", Some(&editor_bearer))).await;
    assert_eq!(as_editor["pagination"]["total"], 1);
    assert_eq!(as_editor["data"][0]["slug"], "quarterly-roadmap");

    let (status, _) = send(&app, get(&format!("/api/v1/posts/{id}"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // A broken token on a public route reads as anonymous.
    let (status, _) = send(&app, get("/api/v1/posts", Some("Bearer broken"))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_role_gates() {
    let ctx = TestContext::new();
    let admin = ctx.principal(SUPER_ADMIN, "admin@morphelabs.com").await;
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let viewer = ctx.principal(VIEWER, "viewer@morphelabs.com").await;
    let admin_bearer = ctx.bearer(&admin);
    let editor_bearer = ctx.bearer(&editor);
    let viewer_bearer = ctx.bearer(&viewer);
    let app = create_router(ctx.state());

    let (status, _) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/tags",
            Some(&viewer_bearer),
            json!({ "name": "Rust" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/tags",
            Some(&editor_bearer),
            json!({ "name": "Rust" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let tag_id = body["data"]["id"].as_i64().unwrap();

    let delete_tag = |bearer: &str| {
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/v1/tags/{tag_id}"))
            .header(header::AUTHORIZATION, bearer)
            .body(Body::empty())
            .unwrap()
    };
    let (status, _) = send(&app, delete_tag(&editor_bearer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, delete_tag(&admin_bearer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Tag deleted successfully");

    let (status, _) = send(&app, get("/api/v1/users", Some(&editor_bearer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = send(&app, get("/api/v1/users", Some(&admin_bearer))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 3);

    let (status, body) = send(
        &app,
        Request::builder()
            .method(Method::DELETE)
            .uri(format!("/api/v1/users/{}", admin.id))
            .header(header::AUTHORIZATION, &admin_bearer)
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["message"], "You cannot delete your own account");

    let (status, _) = send(&app, get("/api/v1/dashboard/search?q=rust", Some(&viewer_bearer))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, get("/api/v1/dashboard/stats", Some(&viewer_bearer))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_ids_are_bad_requests() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    for uri in ["/api/v1/posts/abc", "/api/v1/jobs/0", "/api/v1/categories/-1"] {
        let (status, body) = send(&app, get(uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"]["message"], "Invalid ID");
    }
}

#[tokio::test]
async fn test_out_of_range_page_is_an_empty_page() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());

    let (status, body) = send(&app, get("/api/v1/posts?page=9223372036854775807", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["page"], i32::MAX);
}

// --- Careers ---

#[tokio::test]
async fn test_public_application_flow() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let editor_bearer = ctx.bearer(&editor);
    let app = create_router(ctx.state());

    let (status, body) = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/jobs",
            Some(&editor_bearer),
            json!({
                "title": "Platform Engineer",
                "department": "Engineering",
                "description": "Keep the lights on",
                "employmentType": "full-time",
                "status": "active",
                "internalNotes": "Budget approved",
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let job_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, get("/api/v1/jobs/slug/platform-engineer", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("internal_notes").is_none());
    assert!(body["data"].get("applicationsCount").is_none());

    let apply = json!({
        "applicantName": "Grace Hopper",
        "applicantEmail": "grace@example.com",
        "resumeUrl": "https://example.com/grace.pdf",
    });
    let (status, body) = send(
        &app,
        json_request(Method::POST, &format!("/api/v1/jobs/{job_id}/apply"), None, apply.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["status"], "new");

    let (status, _) = send(
        &app,
        json_request(Method::POST, &format!("/api/v1/jobs/{job_id}/apply"), None, apply),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(
        &app,
        get("/api/v1/jobs/all/applications", Some(&editor_bearer)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["jobTitle"], "Platform Engineer");
}

// --- Media ---

fn png_bytes() -> Vec<u8> {
    let img = image::RgbImage::from_pixel(64, 32, image::Rgb([200, 30, 30]));
    let mut buffer = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buffer), image::ImageFormat::Png)
        .unwrap();
    buffer
}

fn multipart_upload(bearer: &str, file: &[u8]) -> Request<Body> {
    let boundary = "morphe-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"banner.png\"\r\nContent-Type: image/png\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(
        format!(
            "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"altText\"\r\n\r\nRed banner\r\n--{boundary}--\r\n"
        )
        .as_bytes(),
    );

    Request::builder()
        .method(Method::POST)
        .uri("/api/v1/media/upload")
        .header(header::AUTHORIZATION, bearer)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_multipart_upload() {
    let ctx = TestContext::new();
    let editor = ctx.principal(EDITOR, "editor@morphelabs.com").await;
    let viewer = ctx.principal(VIEWER, "viewer@morphelabs.com").await;
    let app = create_router(ctx.state());

    let (status, _) = send(&app, multipart_upload(&ctx.bearer(&viewer), &png_bytes())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, multipart_upload(&ctx.bearer(&editor), &png_bytes())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["file_type"], "image");
    assert_eq!(body["data"]["alt_text"], "Red banner");
    assert_eq!(body["data"]["image_width"], 64);

    let filename = body["data"]["filename"].as_str().unwrap();
    assert!(ctx.storage.object(filename).is_some());
    assert!(ctx.storage.object(&format!("thumb_{filename}")).is_some());

    let (status, body) = send(&app, get("/api/v1/media", Some(&ctx.bearer(&viewer)))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["total"], 1);
}

// --- Over a real socket ---

#[tokio::test]
async fn test_served_over_tcp() {
    let ctx = TestContext::new();
    let app = create_router(ctx.state());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/api/v1/health"))
        .header("Origin", "http://localhost:3000")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:3000")
    );
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
}
