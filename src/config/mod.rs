//! # ماژول تنظیمات (Configuration)
//!
//! این ماژول مسئول خوندن و مدیریت تنظیمات برنامه هست.
//!
//! ## مفاهیم Rust:
//! - **Default Trait**: مقادیر پیش‌فرض
//! - **Serde**: سریالایز/دسریالایز
//! - **Builder Pattern**: ساخت تدریجی آبجکت
//!
//! تنظیماتی که از جنس تابع هستن (validator‌ها، منبع تصادفی، sink) اینجا
//! نیستن؛ اون‌ها مستقیم به `ShortenerBuilder` تزریق میشن.

use std::{env, path::PathBuf};
use serde::{Deserialize, Serialize};
use crate::error::{AppError, Result};

// =====================================
// Defaults
// =====================================
/// طول پیش‌فرض کلید تولیدی (به بایت، قبل از base64)
pub const DEFAULT_KEY_LENGTH: usize = 6;

/// تعداد تلاش در هر طول قبل از بلندتر کردن کلید
pub const DEFAULT_COLLISION_RETRIES: usize = 100;

/// حداکثر طول کلید؛ هم سقف تولید و هم سقف کلید پیشنهادی
pub const DEFAULT_MAX_KEY_LENGTH: usize = 2048;

/// تنظیمات اصلی برنامه
///
/// # مثال
/// ```rust
/// use furl::config::Config;
///
/// let config = Config::default();
/// assert_eq!(config.key_length, 6);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// آدرس هاست سرور
    pub host: String,

    /// پورت سرور
    pub port: u16,

    /// آدرس پایه عمومی برای لینک‌های کوتاه (فقط برای لاگ)
    pub base_url: String,

    /// فایل رکوردهای key:url؛ اگه نباشه همه چیز فقط در حافظه‌ست
    pub data_file: Option<PathBuf>,

    /// حداقل طول کلید تولیدی (بایت)
    pub key_length: usize,

    /// تعداد تلاش در هر طول
    pub collision_retries: usize,

    /// حداکثر طول کلید (بایت)
    pub max_key_length: usize,

    /// محیط اجرا (development, production)
    pub environment: Environment,
}

/// محیط اجرای برنامه
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// محیط توسعه - لاگ خوانا
    #[default]
    Development,

    /// محیط تست
    Testing,

    /// محیط تولید - لاگ JSON
    Production,
}

impl Environment {
    /// آیا در محیط تولید هستیم؟
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }
}

impl From<String> for Environment {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "testing" | "test" => Environment::Testing,
            _ => Environment::Development,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            base_url: String::new(),
            data_file: None,
            key_length: DEFAULT_KEY_LENGTH,
            collision_retries: DEFAULT_COLLISION_RETRIES,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            environment: Environment::Development,
        }
    }
}

impl Config {
    /// ساخت تنظیمات از متغیرهای محیطی
    ///
    /// | متغیر | پیش‌فرض |
    /// |---|---|
    /// | `FURL_HOST` | `127.0.0.1` |
    /// | `FURL_PORT` | `8080` |
    /// | `FURL_BASE_URL` | خالی |
    /// | `FURL_DATA_FILE` | ندارد |
    /// | `FURL_KEY_LENGTH` | `6` |
    /// | `FURL_COLLISION_RETRIES` | `100` |
    /// | `FURL_MAX_KEY_LENGTH` | `2048` |
    /// | `FURL_ENVIRONMENT` | `development` |
    ///
    /// # Errors
    /// خطا برمیگردونه اگه یه مقدار عددی قابل parse نباشه
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let get_env = |key: &str, default: &str| -> String {
            env::var(key).unwrap_or_else(|_| default.to_string())
        };

        // برخلاف get_env، مقدار خراب رو بی‌صدا نادیده نمیگیره
        fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
            match env::var(key) {
                Ok(value) => value.trim().parse().map_err(|_| {
                    AppError::Config(format!("{key} must be a number, got {value:?}"))
                }),
                Err(_) => Ok(default),
            }
        }

        Ok(Self {
            host: get_env("FURL_HOST", &defaults.host),
            port: parse_env("FURL_PORT", defaults.port)?,
            base_url: get_env("FURL_BASE_URL", &defaults.base_url),
            data_file: env::var_os("FURL_DATA_FILE")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from),
            key_length: parse_env("FURL_KEY_LENGTH", defaults.key_length)?,
            collision_retries: parse_env("FURL_COLLISION_RETRIES", defaults.collision_retries)?,
            max_key_length: parse_env("FURL_MAX_KEY_LENGTH", defaults.max_key_length)?,
            environment: get_env("FURL_ENVIRONMENT", "development").into(),
        })
    }

    /// اعتبارسنجی تنظیمات
    ///
    /// # Errors
    /// - پورت صفر
    /// - طول کلید صفر یا بیشتر از حداکثر
    /// - حداکثر طول بیشتر از چیزی که فرمت رکورد (u16) جا میده
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::Config("FURL_PORT cannot be 0".to_string()));
        }

        if self.key_length == 0 {
            return Err(AppError::Config("FURL_KEY_LENGTH cannot be 0".to_string()));
        }

        if self.key_length > self.max_key_length {
            return Err(AppError::Config(format!(
                "FURL_KEY_LENGTH ({}) exceeds FURL_MAX_KEY_LENGTH ({})",
                self.key_length, self.max_key_length
            )));
        }

        if self.max_key_length > usize::from(u16::MAX) {
            return Err(AppError::Config(format!(
                "FURL_MAX_KEY_LENGTH cannot exceed {}",
                u16::MAX
            )));
        }

        Ok(())
    }

    /// آدرس کامل سرور
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// =====================================
// Builder Pattern
// =====================================
/// ساخت Config با Builder Pattern
///
/// # مثال
/// ```rust
/// use furl::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .port(9000)
///     .key_length(4)
///     .build();
/// assert_eq!(config.port, 9000);
/// ```
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// ساخت builder جدید
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// تنظیم پورت
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// تنظیم هاست
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// تنظیم base_url
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// تنظیم فایل رکوردها
    #[must_use]
    pub fn data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_file = Some(path.into());
        self
    }

    #[must_use]
    pub fn key_length(mut self, length: usize) -> Self {
        self.config.key_length = length;
        self
    }

    #[must_use]
    pub fn collision_retries(mut self, retries: usize) -> Self {
        self.config.collision_retries = retries;
        self
    }

    #[must_use]
    pub fn max_key_length(mut self, length: usize) -> Self {
        self.config.max_key_length = length;
        self
    }

    /// تنظیم محیط
    #[must_use]
    pub fn environment(mut self, env: Environment) -> Self {
        self.config.environment = env;
        self
    }

    /// ساخت Config نهایی
    #[must_use]
    pub fn build(self) -> Config {
        self.config
    }

    /// ساخت Config با اعتبارسنجی
    ///
    /// # Errors
    /// خطا برمیگردونه اگه اعتبارسنجی fail بشه
    pub fn build_validated(self) -> Result<Config> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
