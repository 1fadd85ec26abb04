//! # فرمت رکوردهای key:url
//!
//! هر رکورد به ترتیب و بدون فاصله نوشته میشه:
//!
//! ```text
//! struct {
//!     KeyLength u16 (little-endian)
//!     Key       [KeyLength]byte
//!     URLLength u16 (little-endian)
//!     URL       [URLLength]byte
//! }
//! ```
//!
//! یک طول کلید صفر (یا EOF دقیقا سر مرز یک رکورد) پایان جریان هست.
//! این تنها قرارداد bit-exact سیستمه.

use std::{
    collections::HashMap,
    fs::{File, OpenOptions},
    io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write},
    path::Path,
};

use parking_lot::Mutex;
use tracing::{debug, error, info};

use super::PersistSink;

/// نتیجه خوندن یک جریان رکورد
#[derive(Debug, Default)]
pub struct Loaded {
    /// همه رکوردهای خونده شده؛ کلید تکراری آخرین مقدار رو نگه میداره
    pub urls: HashMap<String, String>,

    /// offset پایان آخرین رکورد کامل (قبل از terminator)
    pub end: u64,
}

/// خوندن رکوردها تا terminator یا EOF
///
/// # Errors
/// - رکورد ناقص (`UnexpectedEof`)
/// - کلید یا URL غیر UTF-8 (`InvalidData`)
///
/// # مثال
/// ```rust
/// use furl::storage::records::{load, write_record};
///
/// let mut buf = Vec::new();
/// write_record(&mut buf, "AA", "http://www.google.com").unwrap();
/// buf.extend_from_slice(&[0, 0]);
///
/// let loaded = load(buf.as_slice()).unwrap();
/// assert_eq!(loaded.urls["AA"], "http://www.google.com");
/// assert_eq!(loaded.end, (buf.len() - 2) as u64);
/// ```
pub fn load<R: Read>(reader: R) -> io::Result<Loaded> {
    let mut reader = BufReader::new(reader);
    let mut loaded = Loaded::default();

    loop {
        let key_length = match read_length(&mut reader, true)? {
            Some(0) | None => break,
            Some(length) => length,
        };
        let key = read_string(&mut reader, key_length)?;
        let url_length = read_length(&mut reader, false)?.unwrap_or_default();
        let url = read_string(&mut reader, url_length)?;

        loaded.end += 4 + u64::from(key_length) + u64::from(url_length);
        loaded.urls.insert(key, url);
    }

    Ok(loaded)
}

/// نوشتن یک رکورد
///
/// # Errors
/// `InvalidInput` اگه کلید یا URL بیشتر از `u16::MAX` بایت باشه، یا خطای
/// نوشتن
pub fn write_record<W: Write>(writer: &mut W, key: &str, url: &str) -> io::Result<()> {
    // هر دو طول قبل از نوشتن اولین بایت چک میشن
    let key_length = field_length(key)?;
    let url_length = field_length(url)?;
    writer.write_all(&key_length.to_le_bytes())?;
    writer.write_all(key.as_bytes())?;
    writer.write_all(&url_length.to_le_bytes())?;
    writer.write_all(url.as_bytes())
}

fn read_length<R: Read>(reader: &mut R, eof_allowed: bool) -> io::Result<Option<u16>> {
    let mut bytes = [0u8; 2];
    if eof_allowed {
        // EOF قبل از اولین بایت یعنی پایان تمیز
        loop {
            match reader.read(&mut bytes[..1]) {
                Ok(0) => return Ok(None),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        reader.read_exact(&mut bytes[1..])?;
    } else {
        reader.read_exact(&mut bytes)?;
    }
    Ok(Some(u16::from_le_bytes(bytes)))
}

fn read_string<R: Read>(reader: &mut R, length: u16) -> io::Result<String> {
    let mut bytes = vec![0u8; usize::from(length)];
    reader.read_exact(&mut bytes)?;
    String::from_utf8(bytes).map_err(|e| io::Error::new(ErrorKind::InvalidData, e))
}

fn field_length(value: &str) -> io::Result<u16> {
    u16::try_from(value.len()).map_err(|_| {
        io::Error::new(
            ErrorKind::InvalidInput,
            format!("record field of {} bytes exceeds {}", value.len(), u16::MAX),
        )
    })
}

// =====================================
// File Sink
// =====================================
/// sink فایلی: هر رکورد با یک `write_all` نوشته و sync میشه
///
/// اگه نوشتن وسط کار شکست بخوره، فایل به `end` (پایان آخرین رکورد
/// کامل) برمیگرده تا هیچ تکه‌ای از رکورد خراب توی فایل نمونه.
#[derive(Debug)]
pub struct FileSink {
    inner: Mutex<SinkFile>,
}

#[derive(Debug)]
struct SinkFile {
    file: File,
    end: u64,
}

impl SinkFile {
    fn append(&mut self, record: &[u8]) -> io::Result<()> {
        self.file.write_all(record)?;
        self.file.flush()?;
        self.file.sync_data()
    }

    fn rollback(&mut self) -> io::Result<()> {
        self.file.set_len(self.end)?;
        self.file.seek(SeekFrom::Start(self.end))?;
        Ok(())
    }
}

impl PersistSink for FileSink {
    fn save(&self, key: &str, url: &str) -> io::Result<()> {
        let mut record = Vec::with_capacity(4 + key.len() + url.len());
        write_record(&mut record, key, url)?;

        let mut inner = self.inner.lock();
        match inner.append(&record) {
            Ok(()) => {
                inner.end += record.len() as u64;
                Ok(())
            }
            Err(e) => {
                if let Err(rollback) = inner.rollback() {
                    error!(error = %rollback, end = inner.end, "failed to roll back partial record");
                }
                Err(e)
            }
        }
    }
}

/// باز کردن (یا ساختن) فایل رکوردها
///
/// رکوردهای موجود خونده میشن و هر چیزی بعد از آخرین رکورد کامل (مثلا
/// terminator) حذف میشه تا رکوردهای جدید بعد از بارگذاری بعدی هم
/// خونده بشن.
///
/// # Errors
/// خطای باز کردن، خوندن یا کوتاه کردن فایل
pub fn open(path: impl AsRef<Path>) -> io::Result<(HashMap<String, String>, FileSink)> {
    let path = path.as_ref();
    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;

    let Loaded { urls, end } = load(&file)?;
    if file.metadata()?.len() > end {
        debug!(path = %path.display(), end, "truncating trailing bytes after last record");
        file.set_len(end)?;
    }
    file.seek(SeekFrom::Start(end))?;

    info!(path = %path.display(), entries = urls.len(), "opened record file");

    Ok((
        urls,
        FileSink {
            inner: Mutex::new(SinkFile { file, end }),
        },
    ))
}
