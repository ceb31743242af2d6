use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use rust_embed::Embed;

#[derive(Embed)]
#[folder = "assets/"]
struct PageAssets;

/// GET / — the trigger page.
pub async fn index() -> Response {
    asset("index.html")
}

/// Serve any other embedded asset by path, 404 otherwise.
pub async fn static_handler(uri: axum::http::Uri) -> Response {
    asset(uri.path().trim_start_matches('/'))
}

fn asset(path: &str) -> Response {
    match <PageAssets as Embed>::get(path) {
        Some(content) => {
            let mime = mime_guess::from_path(path).first_or_octet_stream();
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, mime.as_ref())],
                content.data.to_vec(),
            )
                .into_response()
        }
        None => (StatusCode::NOT_FOUND, "not found").into_response(),
    }
}
