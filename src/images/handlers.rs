use axum::{extract::State, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use super::dto::{CompressRequest, CompressedImage};
use super::transform::{
    download_filename, estimate_compressed_size, saved_percent, size_url, variant_url,
    ImageFormat, TransformParams, DEFAULT_QUALITY,
};
use crate::{
    auth::extractors::SessionUser,
    error::{ApiError, ApiResult},
    state::AppState,
};

pub fn image_routes() -> Router<AppState> {
    Router::new().route("/images/compress", post(compress))
}

/// Resolve the CDN variant for an uploaded image and report its size.
#[instrument(skip(state, session, body), fields(email = %session.email))]
pub async fn compress(
    State(state): State<AppState>,
    session: SessionUser,
    Json(body): Json<CompressRequest>,
) -> ApiResult<Json<CompressedImage>> {
    let format = match body.format.as_deref() {
        Some(f) => f.parse::<ImageFormat>().map_err(bad_request)?,
        None => ImageFormat::default(),
    };
    let mut params = TransformParams::new(body.quality.unwrap_or(DEFAULT_QUALITY as u16), format)
        .map_err(bad_request)?;
    if body.advanced {
        params = params.with_dimensions(body.width, body.height);
    }

    let variant =
        variant_url(&body.url, &state.config.cdn_base_url, &params).map_err(bad_request)?;
    let size = size_url(&variant);

    // A zero-length report means the CDN has no size for the variant yet.
    let (compressed_size, estimated) = match state.probe.content_length(&size).await {
        Some(n) if n > 0 => (n, false),
        _ => (estimate_compressed_size(body.original_size, params.quality()), true),
    };

    info!(
        variant = %variant,
        original = body.original_size,
        compressed = compressed_size,
        estimated,
        "variant resolved"
    );

    Ok(Json(CompressedImage {
        filename: download_filename(&variant, params.format),
        url: variant.to_string(),
        size_url: size.to_string(),
        original_size: body.original_size,
        compressed_size,
        estimated,
        format: params.format,
        quality: params.quality(),
        saved_percent: saved_percent(body.original_size, compressed_size),
    }))
}

fn bad_request<E: std::fmt::Display>(e: E) -> ApiError {
    warn!(error = %e, "rejected compress request");
    ApiError::BadRequest(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::build_app;
    use crate::auth::session::SessionKeys;
    use crate::state::test_support::{fake, fake_parts, fake_with_probe};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        response::Response,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn compress_request(state: &AppState, body: Value) -> Request<Body> {
        let token = SessionKeys::from_config(&state.config.session)
            .sign("ada@example.com", "Ada")
            .unwrap();
        Request::post("/api/images/compress")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(res: Response) -> Value {
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn uses_reported_size_when_available() {
        let (state, _) = fake_with_probe(Some(250));
        let req = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/u/abc", "originalSize": 1000, "quality": 60, "format": "png" }),
        );
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let v = body_json(res).await;
        assert_eq!(v["url"], "https://cdn.example.com/u/abc?quality=60&format=png");
        assert_eq!(v["sizeUrl"], "https://cdn.example.com/size/u/abc?quality=60&format=png");
        assert_eq!(v["compressedSize"], 250);
        assert_eq!(v["estimated"], false);
        assert_eq!(v["savedPercent"], 75);
        assert_eq!(v["format"], "png");
        assert_eq!(v["quality"], 60);
        assert_eq!(v["filename"], "compressed-image.png");
    }

    #[tokio::test]
    async fn falls_back_to_estimate_and_defaults() {
        let (state, _) = fake();
        let req = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/u/cat.jpg", "originalSize": 1000 }),
        );
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let v = body_json(res).await;
        assert_eq!(v["quality"], 80);
        assert_eq!(v["format"], "webp");
        assert_eq!(v["compressedSize"], 560);
        assert_eq!(v["estimated"], true);
        assert_eq!(v["savedPercent"], 44);
        assert_eq!(v["filename"], "cat.jpg");
    }

    #[tokio::test]
    async fn zero_reported_size_falls_back_to_estimate() {
        let (state, _) = fake_with_probe(Some(0));
        let req = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/u/cat.jpg", "originalSize": 1000 }),
        );
        let res = build_app(state).oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);

        let v = body_json(res).await;
        assert_eq!(v["compressedSize"], 560);
        assert_eq!(v["estimated"], true);
        assert_eq!(v["savedPercent"], 44);
    }

    #[tokio::test]
    async fn foreign_host_is_rejected_before_any_size_request() {
        let (state, _, probe) = fake_parts(Some(6));
        let app = build_app(state.clone());

        for url in [
            "http://127.0.0.1:39279/admin/x",
            "http://169.254.169.254/latest/meta-data",
            "https://cdn.example.com.attacker.test/a.png",
        ] {
            let req = compress_request(&state, json!({ "url": url, "originalSize": 1000 }));
            let res = app.clone().oneshot(req).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST, "{}", url);
        }
        assert_eq!(probe.calls(), 0);

        let req = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/a.png", "originalSize": 1000 }),
        );
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(probe.calls(), 1);
    }

    #[tokio::test]
    async fn dimensions_need_advanced_flag() {
        let (state, _) = fake_with_probe(Some(100));
        let app = build_app(state.clone());

        let plain = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/a.png", "originalSize": 500, "width": 320 }),
        );
        let v = body_json(app.clone().oneshot(plain).await.unwrap()).await;
        assert_eq!(v["url"], "https://cdn.example.com/a.png?quality=80&format=webp");

        let advanced = compress_request(
            &state,
            json!({ "url": "https://cdn.example.com/a.png", "originalSize": 500, "width": 320, "height": 200, "advanced": true }),
        );
        let v = body_json(app.oneshot(advanced).await.unwrap()).await;
        assert_eq!(
            v["url"],
            "https://cdn.example.com/a.png?quality=80&format=webp&width=320&height=200"
        );
    }

    #[tokio::test]
    async fn invalid_input_is_bad_request() {
        let (state, _) = fake();
        let app = build_app(state.clone());

        for body in [
            json!({ "url": "https://cdn.example.com/a.png", "originalSize": 1, "quality": 0 }),
            json!({ "url": "https://cdn.example.com/a.png", "originalSize": 1, "format": "gif" }),
            json!({ "url": "file:///etc/passwd", "originalSize": 1 }),
        ] {
            let res = app.clone().oneshot(compress_request(&state, body)).await.unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn requires_session() {
        let (state, _) = fake();
        let res = build_app(state)
            .oneshot(
                Request::post("/api/images/compress")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "url": "https://cdn.example.com/a.png", "originalSize": 1 }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
