//! HTTP API
//!
//! 参照API（最新・履歴・手動実行）とリアルタイム配信（WebSocket）のルーター

pub mod error;
pub mod status;
pub mod updates_ws;

use axum::http::{header, HeaderValue, Method};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::AppState;

/// アプリケーションルーターを作成
pub fn create_app(state: AppState) -> Router {
    let cors = state.cors_origin.as_deref().and_then(cors_layer);

    let router = Router::new()
        .route("/up", get(status::latest))
        .route("/history", get(status::history))
        .route("/refresh", post(status::refresh))
        .route("/healthz", get(status::healthz))
        .route("/ws", get(updates_ws::updates_ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match cors {
        Some(cors) => router.layer(cors),
        None => router,
    }
}

/// 設定されたオリジンのみを許可するCORSレイヤー（資格情報付き）
///
/// `*` はワイルドカードとして扱い、資格情報ヘッダーは付けない。
fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];
    if origin == "*" {
        // tower-http は `*` と credentials の併用を拒否する
        return Some(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(methods)
                .allow_headers([header::CONTENT_TYPE]),
        );
    }
    match HeaderValue::from_str(origin) {
        Ok(origin) => Some(
            CorsLayer::new()
                .allow_origin(origin)
                .allow_credentials(true)
                .allow_methods(methods)
                .allow_headers([header::CONTENT_TYPE]),
        ),
        Err(e) => {
            warn!(origin, error = %e, "Ignoring unusable CORS origin");
            None
        }
    }
}
