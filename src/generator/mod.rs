//! # تولید کلید (Key Generation)
//!
//! ## الگوریتم
//! داخل یک تراکنش store اجرا میشه:
//!
//! 1. از طول `L = key_length` شروع کن.
//! 2. `L` بایت تصادفی بکش، با base64-url بدون padding کد کن.
//! 3. اگه کلید در store نبود و validator قبولش کرد، `set` کن و تمام.
//! 4. بعد از `retries` شکست پشت سر هم، `L` رو یکی زیاد کن.
//! 5. اگه طول `max_key_length` هم تموم شد، `KeyGenerationExhausted`.
//!
//! طول کلید نهایی تقریبا `4 * ceil(L / 3)` کاراکتر هست.
//!
//! ## مفاهیم Rust:
//! - **Trait Objects**: منبع تصادفی قابل تزریق (`Box<dyn RandomSource>`)
//! - **Interior Mutability**: `Mutex` برای منبعی که `&mut` لازم داره
//!   ولی پشت `&self` نگه داشته میشه

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use parking_lot::Mutex;
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, warn};

use crate::{
    config::{DEFAULT_COLLISION_RETRIES, DEFAULT_KEY_LENGTH, DEFAULT_MAX_KEY_LENGTH},
    error::{AppError, Result},
    storage::Transaction,
};

// =====================================
// Random Sources
// =====================================
/// منبع مقادیر تصادفی 63 بیتی
///
/// داخل قفل نوشتن store صدا زده میشه، پس نباید block کنه.
pub trait RandomSource: Send {
    /// یک مقدار غیرمنفی در بازه `[0, 2^63)`
    fn int63(&mut self) -> u64;
}

/// منبع پیش‌فرض: `StdRng` با seed
#[derive(Debug)]
pub struct SeededSource(StdRng);

impl SeededSource {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }

    /// seed از زمان فعلی (میکروثانیه)
    #[must_use]
    pub fn from_time() -> Self {
        let micros = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_micros() as u64)
            .unwrap_or_default();
        Self::new(micros)
    }
}

impl RandomSource for SeededSource {
    fn int63(&mut self) -> u64 {
        self.0.gen::<u64>() >> 1
    }
}

/// منبع قطعی برای تست: مقادیر رو به ترتیب میده و بعد از تموم شدن صفر
///
/// # مثال
/// ```rust
/// use furl::generator::{RandomSource, SequenceSource};
///
/// let mut source = SequenceSource::new([5, 7]);
/// assert_eq!(source.int63(), 5);
/// assert_eq!(source.int63(), 7);
/// assert_eq!(source.int63(), 0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct SequenceSource {
    values: std::collections::VecDeque<u64>,
}

impl SequenceSource {
    #[must_use]
    pub fn new(values: impl IntoIterator<Item = u64>) -> Self {
        Self {
            values: values.into_iter().collect(),
        }
    }
}

impl RandomSource for SequenceSource {
    fn int63(&mut self) -> u64 {
        self.values.pop_front().unwrap_or(0)
    }
}

// =====================================
// Byte Stream
// =====================================
/// تبدیل مقادیر 63 بیتی به جریان بایت
///
/// از هر مقدار 7 بایت پایینش (little-endian) مصرف میشه و بایت‌های
/// باقیمونده بین فراخوانی‌ها نگه داشته میشن.
pub struct RandomBytes {
    source: Box<dyn RandomSource>,
    value: u64,
    remaining: u8,
}

impl RandomBytes {
    #[must_use]
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    #[must_use]
    pub fn from_boxed(source: Box<dyn RandomSource>) -> Self {
        Self {
            source,
            value: 0,
            remaining: 0,
        }
    }

    pub fn fill(&mut self, buf: &mut [u8]) {
        for byte in buf {
            if self.remaining == 0 {
                self.value = self.source.int63();
                self.remaining = 7;
            }
            *byte = self.value as u8;
            self.value >>= 8;
            self.remaining -= 1;
        }
    }
}

impl std::fmt::Debug for RandomBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RandomBytes")
            .field("remaining", &self.remaining)
            .finish_non_exhaustive()
    }
}

// =====================================
// Key Generator
// =====================================
/// تولیدکننده کلید یکتا
///
/// منبع تصادفی فقط مال همین generator هست و با هیچ چیز دیگه share نمیشه.
#[derive(Debug)]
pub struct KeyGenerator {
    bytes: Mutex<RandomBytes>,
    key_length: usize,
    retries: usize,
    max_key_length: usize,
}

impl Default for KeyGenerator {
    fn default() -> Self {
        Self::new(SeededSource::from_time())
    }
}

impl KeyGenerator {
    /// generator با مقادیر پیش‌فرض (6 بایت، 100 تلاش، حداکثر 2048)
    #[must_use]
    pub fn new(source: impl RandomSource + 'static) -> Self {
        Self::from_boxed(Box::new(source))
    }

    #[must_use]
    pub fn from_boxed(source: Box<dyn RandomSource>) -> Self {
        Self {
            bytes: Mutex::new(RandomBytes::from_boxed(source)),
            key_length: DEFAULT_KEY_LENGTH,
            retries: DEFAULT_COLLISION_RETRIES,
            max_key_length: DEFAULT_MAX_KEY_LENGTH,
        }
    }

    /// حداقل طول کلید (بایت، قبل از base64)؛ صفر به یک گرد میشه
    #[must_use]
    pub fn key_length(mut self, length: usize) -> Self {
        self.key_length = length.max(1);
        self
    }

    /// تعداد تلاش در هر طول
    #[must_use]
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }

    /// آخرین طولی که امتحان میشه
    #[must_use]
    pub fn max_key_length(mut self, length: usize) -> Self {
        self.max_key_length = length;
        self
    }

    /// تولید و ثبت یک کلید یکتا داخل تراکنش جاری
    ///
    /// `tx.set` فقط یک بار و فقط برای کلید برنده صدا زده میشه؛ این تنها
    /// نقطه commit هست.
    ///
    /// # Errors
    /// - `KeyGenerationExhausted` اگه تا `max_key_length` کلیدی پیدا نشه
    /// - خطای `tx.set` (مثلا `Persistence`)
    pub fn generate(
        &self,
        tx: &mut dyn Transaction,
        url: &str,
        accept: &dyn Fn(&str) -> bool,
    ) -> Result<String> {
        let mut bytes = self.bytes.lock();

        for length in self.key_length..=self.max_key_length {
            let mut raw = vec![0u8; length];
            for _ in 0..self.retries {
                bytes.fill(&mut raw);
                let key = URL_SAFE_NO_PAD.encode(&raw);
                if !tx.has(&key) && accept(&key) {
                    tx.set(&key, url)?;
                    return Ok(key);
                }
            }
            debug!(length, retries = self.retries, "no free key at this length, growing");
        }

        warn!(
            min = self.key_length,
            max = self.max_key_length,
            "key generation exhausted"
        );
        Err(AppError::KeyGenerationExhausted)
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, Store, StoreExt};
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    fn seeded_store() -> MemoryStore {
        MemoryStore::with_data(HashMap::from([(
            "AA".to_string(),
            "http://www.google.com".to_string(),
        )]))
    }

    #[test]
    fn test_bytes_are_drawn_seven_per_value() {
        let mut bytes = RandomBytes::new(SequenceSource::new([0x0807_0605_0403_0201, 0xff]));
        let mut buf = [0u8; 8];
        bytes.fill(&mut buf);
        // بایت هشتم از مقدار دوم میاد
        assert_eq!(buf, [1, 2, 3, 4, 5, 6, 7, 0xff]);
    }

    #[test]
    fn test_collision_skips_to_next_draw() {
        let store = seeded_store();
        let generator = KeyGenerator::new(SequenceSource::new([0, 0, 1, 2])).key_length(1);

        let key = store
            .with_transaction(|tx| generator.generate(tx, "http://google.com", &|_: &str| true))
            .unwrap();

        // 14 بایت صفر => "AA" که گرفته شده، بعد بایت 1 => "AQ"
        assert_eq!(key, "AQ");
        assert_eq!(store.get("AQ").as_deref(), Some("http://google.com"));
    }

    #[test]
    fn test_length_grows_after_retry_budget() {
        let store = seeded_store();
        let generator = KeyGenerator::new(SequenceSource::default())
            .key_length(1)
            .retries(5);

        let key = store
            .with_transaction(|tx| generator.generate(tx, "http://x", &|_: &str| true))
            .unwrap();

        assert_eq!(key, "AAA");
    }

    #[test]
    fn test_rejected_keys_are_never_stored() {
        let store = MemoryStore::new();
        let generator = KeyGenerator::new(SeededSource::new(7)).key_length(1);

        for _ in 0..50 {
            let key = store
                .with_transaction(|tx| {
                    generator.generate(tx, "http://x", &|k: &str| !k.contains('-'))
                })
                .unwrap();
            assert!(!key.contains('-'));
        }
        assert_eq!(store.len(), 50);
    }

    #[test]
    fn test_exhaustion_after_exact_number_of_draws() {
        let store = MemoryStore::new();
        let attempts = AtomicUsize::new(0);
        let generator = KeyGenerator::new(SequenceSource::default())
            .key_length(2)
            .retries(3)
            .max_key_length(6);

        let result = store.with_transaction(|tx| {
            generator.generate(tx, "http://x", &|_: &str| {
                attempts.fetch_add(1, Ordering::SeqCst);
                false
            })
        });

        assert!(matches!(result, Err(AppError::KeyGenerationExhausted)));
        // lengths 2..=6 => 5 lengths × 3 retries
        assert_eq!(attempts.load(Ordering::SeqCst), 15);
        assert!(store.is_empty());
    }

    #[test]
    fn test_zero_retries_exhausts_without_drawing() {
        let store = MemoryStore::new();
        let generator = KeyGenerator::new(SequenceSource::default())
            .retries(0)
            .max_key_length(8);

        let result = store.with_transaction(|tx| generator.generate(tx, "http://x", &|_: &str| true));
        assert!(matches!(result, Err(AppError::KeyGenerationExhausted)));
    }

    #[test]
    fn test_min_above_max_exhausts_immediately() {
        let store = MemoryStore::new();
        let generator = KeyGenerator::new(SequenceSource::default())
            .key_length(10)
            .max_key_length(4);

        let result = store.with_transaction(|tx| generator.generate(tx, "http://x", &|_: &str| true));
        assert!(matches!(result, Err(AppError::KeyGenerationExhausted)));
    }
}
