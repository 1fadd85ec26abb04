//! # Store درون حافظه
//!
//! یک `HashMap` پشت یک `RwLock` از parking_lot.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use super::{NoopSink, PersistSink, Store, Transaction};
use crate::error::{AppError, Result};

/// پیاده‌سازی مرجع `Store`
///
/// # مثال
/// ```rust
/// use std::collections::HashMap;
/// use furl::storage::{MemoryStore, Store};
///
/// let store = MemoryStore::with_data(HashMap::from([(
///     "AA".to_string(),
///     "http://www.google.com".to_string(),
/// )]));
/// assert_eq!(store.get("AA").as_deref(), Some("http://www.google.com"));
/// assert!(store.get("BB").is_none());
/// ```
pub struct MemoryStore {
    urls: RwLock<HashMap<String, String>>,
    sink: Box<dyn PersistSink>,
}

impl MemoryStore {
    /// store خالی بدون ذخیره دائمی
    #[must_use]
    pub fn new() -> Self {
        Self::with_data(HashMap::new())
    }

    /// store با داده اولیه
    ///
    /// کلید‌ها و URL‌های اولیه اعتبارسنجی نمیشن.
    #[must_use]
    pub fn with_data(urls: HashMap<String, String>) -> Self {
        Self {
            urls: RwLock::new(urls),
            sink: Box::new(NoopSink),
        }
    }

    /// تنظیم sink دائمی
    #[must_use]
    pub fn with_sink(self, sink: impl PersistSink + 'static) -> Self {
        self.with_boxed_sink(Box::new(sink))
    }

    #[must_use]
    pub fn with_boxed_sink(mut self, sink: Box<dyn PersistSink>) -> Self {
        self.sink = sink;
        self
    }

    /// تعداد رکوردها
    #[must_use]
    pub fn len(&self) -> usize {
        self.urls.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.urls.read().is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}

impl Store for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.urls.read().get(key).cloned()
    }

    fn transact(&self, body: &mut dyn FnMut(&mut dyn Transaction) -> Result<()>) -> Result<()> {
        // guard با drop شدن (حتی در unwind) آزاد میشه
        let mut urls = self.urls.write();
        let mut tx = MemoryTx {
            urls: &mut urls,
            sink: self.sink.as_ref(),
        };
        body(&mut tx)
    }
}

// =====================================
// Transaction Handle
// =====================================
struct MemoryTx<'a> {
    urls: &'a mut HashMap<String, String>,
    sink: &'a dyn PersistSink,
}

impl Transaction for MemoryTx<'_> {
    fn has(&self, key: &str) -> bool {
        self.urls.contains_key(key)
    }

    fn set(&mut self, key: &str, url: &str) -> Result<()> {
        self.urls.insert(key.to_string(), url.to_string());
        debug!(key, "stored key");
        self.sink.save(key, url).map_err(AppError::Persistence)
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreExt;
    use parking_lot::Mutex;
    use std::{io, sync::Arc, thread};

    #[test]
    fn test_set_is_visible_after_commit() {
        let store = MemoryStore::new();
        store
            .with_transaction(|tx| tx.set("abc", "http://example.com"))
            .unwrap();

        assert_eq!(store.get("abc").as_deref(), Some("http://example.com"));
        assert!(store.get("abd").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sink_sees_entries_in_commit_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink_log = Arc::clone(&log);
        let store = MemoryStore::new().with_sink(move |key: &str, url: &str| -> io::Result<()> {
            sink_log.lock().push((key.to_string(), url.to_string()));
            Ok(())
        });

        for (key, url) in [("a", "http://a"), ("b", "http://b"), ("c", "http://c")] {
            store.with_transaction(|tx| tx.set(key, url)).unwrap();
        }

        let keys: Vec<_> = log.lock().iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, ["a", "b", "c"]);
    }

    #[test]
    fn test_sink_failure_keeps_in_memory_entry() {
        let store = MemoryStore::new()
            .with_sink(|_: &str, _: &str| -> io::Result<()> { Err(io::Error::other("disk full")) });

        let result = store.with_transaction(|tx| tx.set("k", "http://example.com"));

        assert!(matches!(result, Err(AppError::Persistence(_))));
        assert_eq!(store.get("k").as_deref(), Some("http://example.com"));
    }

    #[test]
    fn test_lock_released_after_panic() {
        let store = Arc::new(MemoryStore::new());
        let panicking = Arc::clone(&store);

        let joined = thread::spawn(move || {
            let _ = panicking.with_transaction(|_tx| -> Result<()> {
                panic!("boom inside transaction");
            });
        })
        .join();
        assert!(joined.is_err());

        store.with_transaction(|tx| tx.set("after", "http://x")).unwrap();
        assert_eq!(store.get("after").as_deref(), Some("http://x"));
    }

    #[test]
    fn test_concurrent_check_then_set_inserts_once() {
        let store = Arc::new(MemoryStore::new());
        let winners: usize = thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|i| {
                    let store = Arc::clone(&store);
                    scope.spawn(move || {
                        store
                            .with_transaction(|tx| {
                                if tx.has("same") {
                                    return Ok(false);
                                }
                                tx.set("same", &format!("http://example.com/{i}"))?;
                                Ok(true)
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|h| usize::from(h.join().unwrap()))
                .sum()
        });

        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
