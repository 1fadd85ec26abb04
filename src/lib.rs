//! # furl
//!
//! این کتابخانه یک handler کوتاه‌کننده URL ارائه میده: ثبت URL با کلید
//! پیشنهادی یا تولیدی، redirect با کلید، و گزارش متدهای مجاز.
//!
//! ## ساختار پروژه
//!
//! ```text
//! src/
//! ├── lib.rs          # نقطه ورود کتابخانه - اینجا!
//! ├── main.rs         # نقطه ورود باینری
//! ├── config/         # مدیریت تنظیمات
//! ├── error/          # تعریف خطاها
//! ├── storage/        # Store، تراکنش و فایل رکوردها
//! ├── generator/      # تولید کلید تصادفی
//! ├── validators/     # اعتبارسنجی URL و کلید
//! ├── models/         # مدل‌های داده
//! ├── services/       # منطق کسب‌وکار
//! └── api/            # لایه HTTP و content negotiation
//! ```
//!
//! ## مثال استفاده
//!
//! ```rust,no_run
//! use furl::{api::create_router, config::Config, services::{AppState, Shortener}, validators};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default();
//!     let shortener = Shortener::builder()
//!         .with_config(&config)
//!         .url_validator(validators::http_url)
//!         .build();
//!
//!     let app = create_router(AppState::new(shortener, config.clone()));
//!     let listener = tokio::net::TcpListener::bind(config.server_addr()).await.unwrap();
//!     axum::serve(listener, app).await.unwrap();
//! }
//! ```

// =====================================
// Module Declarations
// =====================================

/// ماژول مدیریت تنظیمات برنامه
pub mod config;

/// ماژول تعریف و مدیریت خطاها
pub mod error;

/// ماژول ذخیره‌سازی کلید => URL
pub mod storage;

/// ماژول تولید کلید
pub mod generator;

/// ماژول validator‌ها
pub mod validators;

/// ماژول مدل‌های داده (Domain Models)
pub mod models;

/// ماژول سرویس‌ها (Business Logic)
pub mod services;

/// ماژول API و HTTP Handlers
pub mod api;

// =====================================
// Re-exports
// =====================================
// کاربر به جای `furl::error::Result` میتونه بنویسه `furl::Result`

/// نتیجه عملیات با خطای سفارشی ما
pub use error::Result;

/// خطای اصلی برنامه
pub use error::AppError;

// =====================================
// Prelude Module
// =====================================
/// ماژول prelude برای import راحت‌تر آیتم‌های پرکاربرد
///
/// کاربرد:
/// ```rust
/// use furl::prelude::*;
///
/// let shortener = Shortener::builder().build();
/// assert!(matches!(shortener.lookup("missing"), Err(AppError::NotFound)));
/// ```
pub mod prelude {
    pub use crate::config::Config;
    pub use crate::error::{AppError, Result};
    pub use crate::models::*;
    pub use crate::services::*;
    pub use crate::storage::{MemoryStore, Store, StoreExt, Transaction};
}
