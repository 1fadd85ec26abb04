//! # Handler‌های کوتاه‌کننده
//!
//! | متد | کار |
//! |---|---|
//! | `GET`, `HEAD /:key` | redirect دائمی (301) به URL ذخیره شده |
//! | `POST /` یا `POST /:key` | ثبت URL با کلید تولیدی یا پیشنهادی |
//! | `OPTIONS /:key` | گزارش متدهای مجاز در header `Allow` |

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use tracing::{debug, info};

use crate::{
    api::negotiate::Negotiated,
    error::{AppError, Result},
    services::AppState,
};

// =====================================
// Path Helpers
// =====================================
/// آخرین بخش مسیر (مثل `path.Base`)
///
/// - مسیر خالی => `"."`
/// - فقط اسلش => `"/"`
/// - اسلش‌های انتهایی نادیده گرفته میشن
///
/// # مثال
/// ```rust
/// use furl::api::path_base;
///
/// assert_eq!(path_base("/a/b/"), "b");
/// assert_eq!(path_base("/"), "/");
/// assert_eq!(path_base(""), ".");
/// ```
#[must_use]
pub fn path_base(path: &str) -> &str {
    if path.is_empty() {
        return ".";
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        return "/";
    }
    match trimmed.rfind('/') {
        Some(index) => &trimmed[index + 1..],
        None => trimmed,
    }
}

/// کلید درخواست: آخرین بخش مسیر بعد از percent-decode
fn request_key(uri: &Uri) -> String {
    let raw = uri.path();
    let decoded = urlencoding::decode(raw).map(|cow| cow.into_owned());
    let path = decoded.unwrap_or_else(|_| raw.to_string());
    path_base(&path).to_string()
}

// =====================================
// Lookup
// =====================================
/// Redirect به URL اصلی
///
/// # Response
/// - 301 با header `Location`
/// - 404 اگه کلید نباشه
/// - 422 اگه validator کلید رو رد کنه
pub async fn lookup(State(state): State<AppState>, uri: Uri) -> Result<Response> {
    let key = request_key(&uri);
    let url = state.shortener.lookup(&key)?;

    let location = HeaderValue::try_from(url.as_str())
        .map_err(|e| AppError::Server(format!("stored url is not a valid header: {e}")))?;

    info!(key = %key, "Redirecting");
    Ok((StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response())
}

// =====================================
// Create
// =====================================
/// ثبت URL جدید
///
/// # Request
/// ```text
/// application/json:                  {"key": "KEY", "url": "URL"}
/// text/xml:                          <furl><key>KEY</key><url>URL</url></furl>
/// application/x-www-form-urlencoded: key=KEY&url=URL
/// text/plain:                        URL
/// ```
///
/// کلید میتونه در بدنه، در مسیر، یا هیچ جا نباشه (تولید میشه).
///
/// کار تراکنش روی یک thread جدا (`spawn_blocking`) انجام میشه، چون
/// حلقه تولید و sink فایلی همزمان قفل نوشتن رو نگه میدارن.
pub async fn create(
    State(state): State<AppState>,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok());

    let negotiated = match Negotiated::from_content_type(content_type) {
        Ok(negotiated) => negotiated,
        Err(err) => {
            debug!(content_type = ?content_type, "Rejecting unsupported content type");
            return err.into_response();
        }
    };

    let path_key = request_key(&uri);
    let result = match negotiated.decode(&body) {
        Ok(request) => {
            let shortener = state.shortener.clone();
            tokio::task::spawn_blocking(move || shortener.create(request, &path_key))
                .await
                .unwrap_or_else(|e| Err(AppError::Server(format!("create task failed: {e}"))))
        }
        Err(err) => Err(err),
    };

    if let Ok(created) = &result {
        debug!(link = %state.short_link(&created.key), "Short link ready");
    }
    negotiated.respond(result)
}

// =====================================
// Introspect
// =====================================
/// گزارش متدهای مجاز
///
/// # Response
/// 204 با `Allow: OPTIONS, POST` یا `Allow: OPTIONS, GET, HEAD`
pub async fn introspect(State(state): State<AppState>, uri: Uri) -> Response {
    let key = request_key(&uri);
    let allow = state.shortener.allowed_methods(&key);

    (
        StatusCode::NO_CONTENT,
        [(header::ALLOW, allow.header_value())],
    )
        .into_response()
}
