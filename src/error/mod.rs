//! # ماژول مدیریت خطاها (Error Handling)
//!
//! همه خطاهای قابل گزارش به کلاینت اینجا تعریف میشن.
//!
//! ## مفاهیم Rust:
//! - **Custom Error Types**: تعریف نوع خطای سفارشی
//! - **thiserror**: derive macro برای Error trait
//! - **Result Type Alias**: alias برای ساده‌تر شدن کد
//!
//! ## طبقه‌بندی خطاها
//!
//! | خطا | status | پیام |
//! |---|---|---|
//! | `MalformedRequest` | 400 | `failed to read request` |
//! | `InvalidUrl` | 400 | `invalid url` |
//! | `NotFound` | 404 | `404 page not found` |
//! | `KeyExists` | 405 | `key exists` |
//! | `UnsupportedMediaType` | 415 | `unrecognised content-type` |
//! | `InvalidKey` | 422 | `invalid key` |
//! | `KeyGenerationExhausted` | 500 | `failed to generate key` |
//! | `Persistence` | 500 | `failed to store key` |
//!
//! پیام‌ها (خروجی `Display`) همون متنی هستن که در بدنه پاسخ نوشته میشن.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tracing::error;

// =====================================
// Result Type Alias
// =====================================
/// نوع Result سفارشی برنامه
///
/// به جای نوشتن `Result<String, AppError>` میتونیم بنویسیم `Result<String>`
pub type Result<T, E = AppError> = std::result::Result<T, E>;

// =====================================
// Custom Error Enum
// =====================================
/// خطای اصلی برنامه
///
/// همه خطاها محدود به یک request هستن و هیچکدوم process رو از کار نمیندازن.
#[derive(Debug, Error)]
pub enum AppError {
    // ----------------------------------------
    // خطاهای کاربر (4xx)
    // ----------------------------------------

    /// بدنه request قابل decode نبود - 400
    #[error("failed to read request")]
    MalformedRequest,

    /// URL خالی، خیلی بلند یا رد شده توسط validator - 400
    #[error("invalid url")]
    InvalidUrl,

    /// کلید پیدا نشد - 404
    #[error("404 page not found")]
    NotFound,

    /// کلید پیشنهادی از قبل وجود داره - 405
    #[error("key exists")]
    KeyExists,

    /// Content-Type ناشناخته - 415
    #[error("unrecognised content-type")]
    UnsupportedMediaType,

    /// کلید خیلی بلند یا رد شده توسط validator - 422
    #[error("invalid key")]
    InvalidKey,

    // ----------------------------------------
    // خطاهای سرور (5xx)
    // ----------------------------------------

    /// هیچ کلید یکتایی تا حداکثر طول پیدا نشد - 500
    #[error("failed to generate key")]
    KeyGenerationExhausted,

    /// نوشتن در sink دائمی شکست خورد
    ///
    /// رکورد در حافظه ثبت شده و قابل lookup هست؛ فقط دوام تضمین نشده.
    #[error("failed to store key")]
    Persistence(#[source] std::io::Error),

    /// خطای تنظیمات
    #[error("Configuration error: {0}")]
    Config(String),

    /// خطای سرور
    #[error("Server error: {0}")]
    Server(String),

    /// خطای IO
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// گرفتن HTTP status code متناسب با خطا
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::MalformedRequest | Self::InvalidUrl => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::KeyExists => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InvalidKey => StatusCode::UNPROCESSABLE_ENTITY,

            // 5xx Server Errors
            Self::KeyGenerationExhausted
            | Self::Persistence(_)
            | Self::Config(_)
            | Self::Server(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// آیا این یه خطای سرور هست؟
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// لاگ کردن خطاهای سرور قبل از تبدیل به پاسخ
    pub(crate) fn log_if_server_error(&self) {
        if self.is_server_error() {
            match self {
                Self::Persistence(source) => {
                    error!(error = %source, "Persistence sink failed");
                }
                other => error!(error = %other, "Server error occurred"),
            }
        }
    }
}

// =====================================
// IntoResponse Implementation
// =====================================
/// تبدیل AppError به پاسخ متنی ساده
///
/// مسیرهای lookup و introspect و خطای 415 از این پاسخ استفاده میکنن.
/// مسیر create بدنه خطا رو بر اساس فرمت مذاکره شده میسازه
/// (`api::negotiate`).
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log_if_server_error();
        (self.status_code(), self.to_string()).into_response()
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::MalformedRequest.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::InvalidUrl.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::KeyExists.status_code(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            AppError::UnsupportedMediaType.status_code(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(AppError::InvalidKey.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(
            AppError::KeyGenerationExhausted.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wire_messages() {
        assert_eq!(AppError::MalformedRequest.to_string(), "failed to read request");
        assert_eq!(AppError::InvalidUrl.to_string(), "invalid url");
        assert_eq!(AppError::InvalidKey.to_string(), "invalid key");
        assert_eq!(AppError::KeyExists.to_string(), "key exists");
        assert_eq!(AppError::KeyGenerationExhausted.to_string(), "failed to generate key");
        assert_eq!(AppError::UnsupportedMediaType.to_string(), "unrecognised content-type");
    }

    #[test]
    fn test_only_generation_and_storage_are_server_errors() {
        assert!(AppError::KeyGenerationExhausted.is_server_error());
        assert!(AppError::Persistence(std::io::Error::other("disk full")).is_server_error());
        assert!(!AppError::KeyExists.is_server_error());
        assert!(!AppError::InvalidKey.is_server_error());
    }
}
