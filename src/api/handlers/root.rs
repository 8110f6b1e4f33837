use axum::response::IntoResponse;

// axum handler for the root path, returns name and version
pub async fn root() -> impl IntoResponse {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}
