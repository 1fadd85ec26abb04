//! # لایه API
//!
//! این ماژول HTTP handlers و routing رو مدیریت میکنه.
//!
//! ## مفاهیم Rust + Axum:
//! - **Router**: تعریف مسیرها
//! - **MethodRouter**: dispatch بر اساس متد HTTP
//! - **State**: اشتراک state بین handlers
//! - **Tower**: زیرساخت middleware
//!
//! ## ساختار URL‌ها:
//! - `GET /:key` (و `HEAD`) - Redirect به URL اصلی
//! - `POST /` - ساخت کلید تولیدی
//! - `POST /:key` - ساخت کلید پیشنهادی
//! - `OPTIONS /:key` - متدهای مجاز
//!
//! هیچ endpoint دیگه‌ای وجود نداره؛ متدهای دیگه 405 میگیرن.

mod handlers;
mod middleware;
pub mod negotiate;

pub use handlers::shorten::{create, introspect, lookup, path_base};
pub use middleware::*;

use axum::{
    middleware as axum_middleware,
    routing::{get, MethodRouter},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use std::time::Duration;

use crate::services::AppState;

/// حداکثر زمان پردازش یک request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

// =====================================
// Router Builder
// =====================================
/// ساخت Router اصلی برنامه
///
/// ریشه و هر مسیر دیگه به یک `MethodRouter` میرسن؛ کلید از آخرین بخش
/// مسیر خونده میشه.
///
/// # مثال
/// ```rust
/// use furl::{api::create_router, config::Config, services::{AppState, Shortener}};
///
/// let state = AppState::new(Shortener::builder().build(), Config::default());
/// let app = create_router(state);
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", shortener_routes())
        .route("/*key", shortener_routes())
        .layer(
            ServiceBuilder::new()
                // Tracing - لاگ کردن request‌ها
                .layer(TraceLayer::new_for_http())
                .layer(axum_middleware::from_fn(request_id))
                .layer(axum_middleware::from_fn(request_timing))
                // Timeout - حداکثر زمان پردازش
                .layer(TimeoutLayer::new(REQUEST_TIMEOUT)),
        )
        .with_state(state)
}

/// `get` در axum خودش `HEAD` رو هم جواب میده
fn shortener_routes() -> MethodRouter<AppState> {
    get(handlers::shorten::lookup)
        .post(handlers::shorten::create)
        .options(handlers::shorten::introspect)
}
