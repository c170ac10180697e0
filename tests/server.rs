use anyhow::Result;
use artlens::ArtDBBuilder;
use artlens::cli::server::ServerCommand;
use artlens::server::{self, ADMIN_TOKEN_HEADER, AppState};
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, Request, StatusCode, header};
use http_body_util::BodyExt;
use rstest::*;
use serde_json::{Value, json};
use tower::ServiceExt;

const TOKEN: &str = "secret-token";

async fn app(dir: &assert_fs::TempDir) -> Result<Router> {
    let db = ArtDBBuilder::new(dir.path().to_string_lossy().parse()?).open().await?;
    let opts = ServerCommand {
        addr: "127.0.0.1:0".into(),
        token: TOKEN.into(),
        cors_origin: vec![],
        prometheus_push: None,
        prometheus_instance: None,
        prometheus_auth: None,
    };
    Ok(server::create_app(AppState::new(db, opts)))
}

async fn send(app: &Router, request: Request<Body>) -> Result<(StatusCode, Value)> {
    let response = app.clone().oneshot(request).await?;
    let status = response.status();
    let bytes = response.into_body().collect().await?.to_bytes();
    let body = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes)? };
    Ok((status, body))
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn artwork() -> Value {
    json!({
        "id": "A",
        "title": "Starry Night",
        "artist": "Van Gogh",
        "descriptions": {"en": "night", "it": "notte"},
        "visual_descriptors": [
            {"id": "d1", "embedding": [1.0, 0.0, 0.0], "image_path": "a/d1.jpg"},
            {"id": "d2", "embedding": [0.0, 1.0, 0.0]},
        ],
    })
}

fn admin(request: Request<Body>) -> Request<Body> {
    let (mut parts, body) = request.into_parts();
    parts.headers.insert(ADMIN_TOKEN_HEADER, TOKEN.parse().unwrap());
    Request::from_parts(parts, body)
}

#[tokio::test]
async fn match_on_empty_store() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;

    let (status, body) = send(&app, post("/match", json!({"embedding": [1.0, 0.0, 0.0]}))).await?;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["detail"], "Empty database");

    let (status, body) = send(&app, get("/health")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["artworks"], 0);
    assert_eq!(body["dim"], Value::Null);
    Ok(())
}

#[tokio::test]
async fn admin_write_is_visible_to_match() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;

    let (status, body) = send(&app, admin(post("/artworks", artwork()))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["descriptors"], 2);

    let (status, body) = send(
        &app,
        post("/match", json!({"embedding": [0.9, 0.1, 0.0], "top_k": 5, "lang": "IT-it"})),
    )
    .await?;
    assert_eq!(status, StatusCode::OK);
    let matches = body["matches"].as_array().unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0]["artwork_id"], "A");
    assert_eq!(matches[0]["descriptor_id"], "d1");
    assert_eq!(matches[0]["description"], "notte");
    assert_eq!(matches[0]["image_path"], "a/d1.jpg");
    assert!(matches[0]["confidence"].as_f64().unwrap() > 0.9);

    let (_, body) = send(&app, get("/catalog")).await?;
    assert_eq!(body[0]["title"], "Starry Night");
    let (_, body) = send(&app, get("/descriptors")).await?;
    assert_eq!(body.as_array().map(Vec::len), Some(2));
    Ok(())
}

#[rstest]
#[case::wrong_dimension(json!({"embedding": [1.0, 0.0]}))]
#[case::top_k_too_large(json!({"embedding": [1.0, 0.0, 0.0], "top_k": 51}))]
#[case::top_k_zero(json!({"embedding": [1.0, 0.0, 0.0], "top_k": 0}))]
#[case::threshold_out_of_range(json!({"embedding": [1.0, 0.0, 0.0], "threshold": 1.5}))]
#[tokio::test]
async fn bad_match_request(#[case] request: Value) -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;
    send(&app, admin(post("/artworks", artwork()))).await?;

    let (status, body) = send(&app, post("/match", request)).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
    Ok(())
}

#[rstest]
#[case::missing(None)]
#[case::wrong(Some("x-admin-token: nope"))]
#[case::wrong_bearer(Some("authorization: Bearer nope"))]
#[tokio::test]
async fn admin_routes_require_token(#[case] header: Option<&str>) -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;

    for uri in ["/artworks", "/reload"] {
        let mut request = post(uri, artwork());
        if let Some((name, value)) = header.and_then(|h| h.split_once(": ")) {
            let name = HeaderName::from_bytes(name.as_bytes())?;
            request.headers_mut().insert(name, value.parse()?);
        }
        let (status, _) = send(&app, request).await?;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    let (_, body) = send(&app, get("/health")).await?;
    assert_eq!(body["artworks"], 0);
    Ok(())
}

#[tokio::test]
async fn reload_with_bearer_token() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;
    send(&app, admin(post("/artworks", artwork()))).await?;

    let request = Request::post("/reload")
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .body(Body::empty())?;
    let (status, body) = send(&app, request).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"artworks": 1, "descriptors": 2, "dropped": 0}));
    Ok(())
}

#[tokio::test]
async fn invalid_artwork_is_rejected() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;

    let (status, _) = send(&app, admin(post("/artworks", json!({"id": "A"})))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    send(&app, admin(post("/artworks", artwork()))).await?;
    let mut other = artwork();
    other["id"] = json!("B");
    other["visual_descriptors"] = json!([{"embedding": [1.0, 0.0]}]);
    let (status, body) = send(&app, admin(post("/artworks", other))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Embedding dim mismatch: got 2, expected 3");
    Ok(())
}

#[tokio::test]
async fn catalog_and_grouped_descriptors_line_up() -> Result<()> {
    let dir = assert_fs::TempDir::new()?;
    let app = app(&dir).await?;
    send(&app, admin(post("/artworks", artwork()))).await?;

    let (status, catalog) = send(&app, get("/catalog")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        catalog[0]["visual_descriptors"],
        json!([{"id": "d1", "image_path": "a/d1.jpg"}, {"id": "d2", "image_path": null}])
    );

    let (status, grouped) = send(&app, get("/descriptors_v2")).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(grouped, json!({"A": [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]}));
    Ok(())
}
