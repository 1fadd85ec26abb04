//! # ماژول سرویس‌ها (Business Logic Layer)
//!
//! ## لایه‌بندی معماری
//!
//! ```text
//! ┌─────────────────┐
//! │    API Layer    │  <-- HTTP handlers + content negotiation
//! ├─────────────────┤
//! │  Service Layer  │  <-- Shortener (اینجا!)
//! ├─────────────────┤
//! │  Key Generator  │  <-- تولید کلید داخل تراکنش
//! ├─────────────────┤
//! │     Storage     │  <-- Store / Transaction / PersistSink
//! └─────────────────┘
//! ```

mod shortener;

pub use shortener::*;

use std::sync::Arc;
use crate::config::Config;

// =====================================
// Application State
// =====================================
/// وضعیت برنامه که بین همه handlers اشتراک‌گذاری میشه
///
/// `Clone` فقط Arc‌ها رو کپی میکنه، نه داده رو.
#[derive(Clone, Debug)]
pub struct AppState {
    /// تنظیمات برنامه
    pub config: Arc<Config>,

    /// سرویس اصلی
    pub shortener: Arc<Shortener>,
}

impl AppState {
    #[must_use]
    pub fn new(shortener: Shortener, config: Config) -> Self {
        Self {
            config: Arc::new(config),
            shortener: Arc::new(shortener),
        }
    }

    /// لینک عمومی یک کلید با `base_url`؛ بدون `base_url` فقط مسیر
    ///
    /// # مثال
    /// ```rust
    /// use furl::{config::ConfigBuilder, services::{AppState, Shortener}};
    ///
    /// let config = ConfigBuilder::new().base_url("https://fu.rl/").build();
    /// let state = AppState::new(Shortener::builder().build(), config);
    /// assert_eq!(state.short_link("AQ"), "https://fu.rl/AQ");
    /// ```
    #[must_use]
    pub fn short_link(&self, key: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), key)
    }
}
