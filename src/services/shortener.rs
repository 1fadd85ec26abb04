//! # سرویس کوتاه‌کننده (Shortener)
//!
//! منطق اصلی: lookup، create و گزارش متدهای مجاز.
//!
//! ## مفاهیم Rust:
//! - **Dependency Injection**: store، validator‌ها و منبع تصادفی تزریق میشن
//! - **Builder Pattern**: تنظیمات اختیاری با مقدار پیش‌فرض
//! - **`#[instrument]`**: tracing خودکار

use std::{collections::HashMap, sync::Arc};

use tracing::{info, instrument};

use crate::{
    config::{Config, DEFAULT_COLLISION_RETRIES, DEFAULT_KEY_LENGTH, DEFAULT_MAX_KEY_LENGTH},
    error::{AppError, Result},
    generator::{KeyGenerator, RandomSource, SeededSource},
    models::{Allow, KeyUrl},
    storage::{MemoryStore, NoopSink, PersistSink, Store, StoreExt},
    validators::{self, Validator, MAX_URL_LENGTH},
};

/// مسیرهایی که معادل ریشه حساب میشن و به تولید کلید میرسن
///
/// یک فهرست ثابت هست، نه قانون کلی normalization.
pub const ROOT_ALIASES: [&str; 4] = ["", "/", ".", ".."];

/// آیا کلید یکی از نام‌های مستعار ریشه هست؟
#[must_use]
pub fn is_root_alias(key: &str) -> bool {
    ROOT_ALIASES.contains(&key)
}

// =====================================
// Shortener
// =====================================
/// هسته سرویس
pub struct Shortener {
    store: Arc<dyn Store>,
    generator: KeyGenerator,
    url_validator: Validator,
    key_validator: Validator,
    max_key_length: usize,
}

impl std::fmt::Debug for Shortener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shortener")
            .field("generator", &self.generator)
            .field("max_key_length", &self.max_key_length)
            .finish_non_exhaustive()
    }
}

impl Shortener {
    /// شروع builder
    #[must_use]
    pub fn builder() -> ShortenerBuilder {
        ShortenerBuilder::default()
    }

    /// دسترسی به store زیرین
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// پیدا کردن URL یک کلید
    ///
    /// # Errors
    /// - `InvalidKey`: کلید توسط validator رد شد
    /// - `NotFound`: کلید وجود نداره
    #[instrument(skip(self))]
    pub fn lookup(&self, key: &str) -> Result<String> {
        if !(self.key_validator)(key) {
            return Err(AppError::InvalidKey);
        }
        self.store.get(key).ok_or(AppError::NotFound)
    }

    /// ثبت یک URL با کلید پیشنهادی یا تولیدی
    ///
    /// منبع کلید به ترتیب: `request.key`، بعد `path_key` (آخرین بخش
    /// مسیر). اگه نتیجه یکی از `ROOT_ALIASES` باشه کلید تولید میشه.
    ///
    /// بررسی وجود و درج داخل یک تراکنش انجام میشن.
    ///
    /// # Errors
    /// - `InvalidUrl`: URL خالی، بلندتر از 2048 یا رد شده
    /// - `InvalidKey`: کلید پیشنهادی بلندتر از حداکثر یا رد شده
    /// - `KeyExists`: کلید پیشنهادی از قبل هست
    /// - `KeyGenerationExhausted`: کلید یکتا پیدا نشد
    /// - `Persistence`: sink شکست خورد (رکورد در حافظه می‌مونه)
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub fn create(&self, request: KeyUrl, path_key: &str) -> Result<KeyUrl> {
        let KeyUrl { key, url } = request;

        if url.is_empty() || url.len() > MAX_URL_LENGTH || !(self.url_validator)(&url) {
            return Err(AppError::InvalidUrl);
        }

        let key = if key.is_empty() {
            path_key.to_string()
        } else {
            key
        };

        let key = if is_root_alias(&key) {
            let accept = &*self.key_validator;
            self.store
                .with_transaction(|tx| self.generator.generate(tx, &url, accept))?
        } else {
            if key.len() > self.max_key_length || !(self.key_validator)(&key) {
                return Err(AppError::InvalidKey);
            }
            self.store.with_transaction(|tx| {
                if tx.has(&key) {
                    return Err(AppError::KeyExists);
                }
                tx.set(&key, &url)
            })?;
            key
        };

        info!(key = %key, "Short key created");
        Ok(KeyUrl { key, url })
    }

    /// متدهای مجاز روی یک کلید
    ///
    /// ریشه یا کلید نامعتبر => فقط ساختن؛ کلید موجود => فقط خوندن.
    #[must_use]
    pub fn allowed_methods(&self, key: &str) -> Allow {
        if is_root_alias(key) || !(self.key_validator)(key) {
            return Allow::Create;
        }
        if self.store.get(key).is_some() {
            Allow::Read
        } else {
            Allow::Create
        }
    }
}

// =====================================
// Builder
// =====================================
/// تنظیمات اختیاری `Shortener`
///
/// | تنظیم | پیش‌فرض |
/// |---|---|
/// | `url_validator` | همه قبول |
/// | `key_validator` | همه قبول |
/// | `key_length` | 6 |
/// | `collision_retries` | 100 |
/// | `max_key_length` | 2048 |
/// | `random_source` | `SeededSource::from_time()` |
/// | `data` | خالی |
/// | `sink` | `NoopSink` |
///
/// `data` و `sink` فقط روی `MemoryStore` پیش‌فرض اعمال میشن و اگه با
/// `store` یک store دیگه داده بشه نادیده گرفته میشن.
///
/// # مثال
/// ```rust
/// use furl::{services::Shortener, models::KeyUrl, validators};
///
/// let shortener = Shortener::builder()
///     .url_validator(validators::http_url)
///     .build();
///
/// let created = shortener
///     .create(KeyUrl::new("", "https://www.rust-lang.org"), "/")
///     .unwrap();
/// assert_eq!(shortener.lookup(&created.key).unwrap(), "https://www.rust-lang.org");
/// ```
pub struct ShortenerBuilder {
    url_validator: Validator,
    key_validator: Validator,
    key_length: usize,
    collision_retries: usize,
    max_key_length: usize,
    random_source: Option<Box<dyn RandomSource>>,
    data: HashMap<String, String>,
    sink: Box<dyn PersistSink>,
    store: Option<Arc<dyn Store>>,
}

impl Default for ShortenerBuilder {
    fn default() -> Self {
        Self {
            url_validator: Arc::new(validators::accept_all),
            key_validator: Arc::new(validators::accept_all),
            key_length: DEFAULT_KEY_LENGTH,
            collision_retries: DEFAULT_COLLISION_RETRIES,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
            random_source: None,
            data: HashMap::new(),
            sink: Box::new(NoopSink),
            store: None,
        }
    }
}

impl ShortenerBuilder {
    /// کپی طول‌ها از `Config`
    #[must_use]
    pub fn with_config(self, config: &Config) -> Self {
        self.key_length(config.key_length)
            .collision_retries(config.collision_retries)
            .max_key_length(config.max_key_length)
    }

    #[must_use]
    pub fn url_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.url_validator = Arc::new(validator);
        self
    }

    #[must_use]
    pub fn key_validator(mut self, validator: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        self.key_validator = Arc::new(validator);
        self
    }

    /// حداقل طول کلید تولیدی (بایت، قبل از base64)
    #[must_use]
    pub fn key_length(mut self, length: usize) -> Self {
        self.key_length = length;
        self
    }

    #[must_use]
    pub fn collision_retries(mut self, retries: usize) -> Self {
        self.collision_retries = retries;
        self
    }

    /// حداکثر طول تولید و سقف کلید پیشنهادی
    #[must_use]
    pub fn max_key_length(mut self, length: usize) -> Self {
        self.max_key_length = length;
        self
    }

    #[must_use]
    pub fn random_source(mut self, source: impl RandomSource + 'static) -> Self {
        self.random_source = Some(Box::new(source));
        self
    }

    /// داده اولیه store پیش‌فرض
    #[must_use]
    pub fn data(mut self, data: HashMap<String, String>) -> Self {
        self.data = data;
        self
    }

    /// sink دائمی store پیش‌فرض
    #[must_use]
    pub fn sink(mut self, sink: impl PersistSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    /// جایگزینی کامل store
    #[must_use]
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn build(self) -> Shortener {
        let store = self.store.unwrap_or_else(|| {
            let sink = self.sink;
            Arc::new(MemoryStore::with_data(self.data).with_boxed_sink(sink))
        });

        let source = self
            .random_source
            .unwrap_or_else(|| Box::new(SeededSource::from_time()));

        let generator = KeyGenerator::from_boxed(source)
            .key_length(self.key_length)
            .retries(self.collision_retries)
            .max_key_length(self.max_key_length);

        Shortener {
            store,
            generator,
            url_validator: self.url_validator,
            key_validator: self.key_validator,
            max_key_length: self.max_key_length,
        }
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::SequenceSource;
    use std::{
        io,
        sync::atomic::{AtomicUsize, Ordering},
        thread,
    };

    fn google() -> HashMap<String, String> {
        HashMap::from([("AA".to_string(), "http://www.google.com".to_string())])
    }

    fn shortener() -> Shortener {
        Shortener::builder()
            .data(google())
            .random_source(SequenceSource::new([0, 0, 1, 2]))
            .key_length(1)
            .url_validator(validators::http_url)
            .key_validator(|key: &str| key != "ABC")
            .build()
    }

    #[test]
    fn test_lookup() {
        let s = shortener();
        assert_eq!(s.lookup("AA").unwrap(), "http://www.google.com");
        assert!(matches!(s.lookup("BB"), Err(AppError::NotFound)));
        assert!(matches!(s.lookup("ABC"), Err(AppError::InvalidKey)));
    }

    #[test]
    fn test_generated_key_then_explicit_keys() {
        let s = shortener();
        let url = || KeyUrl::new("", "http://google.com");

        assert_eq!(s.create(url(), "/").unwrap().key, "AQ");
        assert!(matches!(s.create(url(), "AQ"), Err(AppError::KeyExists)));
        assert_eq!(s.create(url(), "Ag").unwrap().key, "Ag");
        // "AA" و "Ag" گرفته شدن، بقیه بایت‌ها صفرن => طول 2
        assert_eq!(s.create(url(), "/").unwrap().key, "AAA");
    }

    #[test]
    fn test_body_key_wins_over_path_key() {
        let s = shortener();
        let created = s
            .create(KeyUrl::new("ABCD", "http://google.com"), "ignored")
            .unwrap();
        assert_eq!(created.key, "ABCD");
        assert!(s.lookup("ignored").is_err());
    }

    #[test]
    fn test_invalid_inputs() {
        let s = shortener();
        let long_url = format!("http://google.com/{}", "A".repeat(MAX_URL_LENGTH));
        let long_key = "A".repeat(DEFAULT_MAX_KEY_LENGTH + 1);

        assert!(matches!(
            s.create(KeyUrl::new("", "ftp://google.com"), "/"),
            Err(AppError::InvalidUrl)
        ));
        assert!(matches!(s.create(KeyUrl::new("", long_url), "/"), Err(AppError::InvalidUrl)));
        assert!(matches!(s.create(KeyUrl::default(), "/"), Err(AppError::InvalidUrl)));
        assert!(matches!(
            s.create(KeyUrl::new("ABC", "http://google.com"), "/"),
            Err(AppError::InvalidKey)
        ));
        assert!(matches!(
            s.create(KeyUrl::new(long_key, "http://google.com"), "/"),
            Err(AppError::InvalidKey)
        ));
    }

    #[test]
    fn test_every_root_alias_generates() {
        for alias in ROOT_ALIASES {
            let s = Shortener::builder().random_source(SequenceSource::default()).build();
            let created = s.create(KeyUrl::new(alias, "http://x"), "/").unwrap();
            assert_eq!(created.key, "AAAAAAAA", "alias {alias:?}");
        }
    }

    #[test]
    fn test_allowed_methods() {
        let s = shortener();
        assert_eq!(s.allowed_methods("/"), Allow::Create);
        assert_eq!(s.allowed_methods("AA"), Allow::Read);
        assert_eq!(s.allowed_methods("BB"), Allow::Create);
        assert_eq!(s.allowed_methods("ABC"), Allow::Create);
    }

    #[test]
    fn test_concurrent_explicit_key_exactly_one_wins() {
        let s = Shortener::builder().build();
        let exists = AtomicUsize::new(0);
        let created = AtomicUsize::new(0);

        thread::scope(|scope| {
            for i in 0..32 {
                let (s, exists, created) = (&s, &exists, &created);
                scope.spawn(move || {
                    match s.create(KeyUrl::new("race", format!("http://example.com/{i}")), "/") {
                        Ok(_) => created.fetch_add(1, Ordering::SeqCst),
                        Err(AppError::KeyExists) => exists.fetch_add(1, Ordering::SeqCst),
                        Err(other) => panic!("unexpected error: {other}"),
                    };
                });
            }
        });

        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(exists.load(Ordering::SeqCst), 31);
    }

    #[test]
    fn test_persistence_failure_is_reported_but_visible() {
        let s = Shortener::builder()
            .sink(|_: &str, _: &str| -> io::Result<()> { Err(io::Error::other("read-only")) })
            .build();

        let err = s.create(KeyUrl::new("kept", "http://x"), "/").unwrap_err();
        assert!(matches!(err, AppError::Persistence(_)));
        assert_eq!(s.lookup("kept").unwrap(), "http://x");
    }

    #[test]
    fn test_custom_store_is_used() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::with_data(google()));
        let s = Shortener::builder().store(Arc::clone(&store)).build();

        s.create(KeyUrl::new("mine", "http://x"), "/").unwrap();
        assert_eq!(store.get("mine").as_deref(), Some("http://x"));
        assert_eq!(s.lookup("AA").unwrap(), "http://www.google.com");
    }
}
