//! # لایه ذخیره‌سازی (Storage Layer)
//!
//! نگاشت key → URL و پروتکل تراکنش اون.
//!
//! ## مفاهیم Rust:
//! - **Traits**: تعریف interface (`Store`, `Transaction`)
//! - **Trait Objects**: `&mut dyn Transaction` برای object-safety
//! - **Extension Trait**: `StoreExt` یه API generic روی trait object میسازه
//! - **RAII**: قفل با drop شدن guard آزاد میشه، حتی موقع panic
//!
//! ## قرارداد
//! - `get` فقط قفل خواندن میگیره؛ خواننده‌ها همدیگه رو block نمیکنن.
//! - `transact` در کل store فقط یکی در لحظه اجرا میشه و خواننده‌ها رو
//!   هم تا پایان تراکنش بیرون نگه میداره.
//! - بررسی وجود (`has`) و درج (`set`) داخل یک تراکنش انجام میشن، پس دو
//!   create همزمان هیچوقت هر دو یک کلید رو خالی نمیبینن.

mod memory;
pub mod records;

pub use memory::*;

use std::io;

use crate::error::{AppError, Result};

// =====================================
// Transaction
// =====================================
/// دسترسی انحصاری به store در طول یک تراکنش
pub trait Transaction {
    /// آیا کلید وجود داره؟ (در هر تراکنش هر چند بار)
    fn has(&self, key: &str) -> bool;

    /// ثبت کلید و فراخوانی همزمان sink دائمی
    ///
    /// در استفاده معمول حداکثر یک بار در هر تراکنش صدا زده میشه.
    ///
    /// # Errors
    /// `AppError::Persistence` اگه sink شکست بخوره. درج در حافظه
    /// برگردونده نمیشه.
    fn set(&mut self, key: &str, url: &str) -> Result<()>;
}

// =====================================
// Store
// =====================================
/// انتزاع store
///
/// هر پیاده‌سازی دیگه (دیتابیس، KV راه دور) باید همین ضمانت اتمی بودن
/// `transact` رو حفظ کنه.
pub trait Store: Send + Sync {
    /// گرفتن URL مربوط به کلید
    fn get(&self, key: &str) -> Option<String>;

    /// اجرای `body` با دسترسی انحصاری
    ///
    /// # Errors
    /// هر خطایی که `body` برگردونه
    fn transact(&self, body: &mut dyn FnMut(&mut dyn Transaction) -> Result<()>) -> Result<()>;
}

/// نسخه generic و راحت‌تر از `Store::transact`
///
/// # مثال
/// ```rust
/// use furl::storage::{MemoryStore, Store, StoreExt};
///
/// let store = MemoryStore::new();
/// let inserted = store
///     .with_transaction(|tx| {
///         if tx.has("go") {
///             return Ok(false);
///         }
///         tx.set("go", "https://go.dev")?;
///         Ok(true)
///     })
///     .unwrap();
/// assert!(inserted);
/// assert_eq!(store.get("go").as_deref(), Some("https://go.dev"));
/// ```
pub trait StoreExt: Store {
    /// # Errors
    /// هر خطایی که `body` برگردونه
    fn with_transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>;
}

impl<S: Store + ?Sized> StoreExt for S {
    fn with_transaction<T, F>(&self, body: F) -> Result<T>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<T>,
    {
        let mut body = Some(body);
        let mut output = None;

        self.transact(&mut |tx: &mut dyn Transaction| {
            let body = body
                .take()
                .ok_or_else(|| AppError::Server("transaction body ran twice".to_string()))?;
            output = Some(body(tx)?);
            Ok(())
        })?;

        output.ok_or_else(|| AppError::Server("transaction body never ran".to_string()))
    }
}

// =====================================
// Persistence Sink
// =====================================
/// مقصد دائمی برای هر درج موفق
///
/// داخل قفل نوشتن و به همون ترتیب commit صدا زده میشه.
/// هر closure با امضای `Fn(&str, &str) -> io::Result<()>` یه sink هست.
pub trait PersistSink: Send + Sync {
    /// # Errors
    /// خطای IO مقصد
    fn save(&self, key: &str, url: &str) -> io::Result<()>;
}

impl<F> PersistSink for F
where
    F: Fn(&str, &str) -> io::Result<()> + Send + Sync,
{
    fn save(&self, key: &str, url: &str) -> io::Result<()> {
        self(key, url)
    }
}

/// sink پیش‌فرض: هیچ کاری نمیکنه
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl PersistSink for NoopSink {
    fn save(&self, _key: &str, _url: &str) -> io::Result<()> {
        Ok(())
    }
}
