//! # مدل‌های داده (Domain Models)
//!
//! ## مفاهیم Rust:
//! - **Serde**: یک struct برای JSON، XML و فرم
//! - **`#[serde(default)]`**: فیلدهای غایب رشته خالی میشن
//! - **`deserialize_with`**: مقدار `null` هم رشته خالی حساب میشه

use serde::{Deserialize, Deserializer, Serialize};

// =====================================
// Key/URL Pair
// =====================================
/// یک رکورد key → URL
///
/// همین struct هم بدنه درخواست create هست و هم بدنه پاسخ موفق.
/// کلید خالی یعنی «کلید بساز».
///
/// # مثال
/// ```rust
/// use furl::models::KeyUrl;
///
/// let data: KeyUrl = serde_json::from_str(r#"{"url":"http://google.com"}"#).unwrap();
/// assert!(data.key.is_empty());
/// assert_eq!(data.url, "http://google.com");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyUrl {
    #[serde(deserialize_with = "null_as_empty")]
    pub key: String,
    #[serde(deserialize_with = "null_as_empty")]
    pub url: String,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl KeyUrl {
    pub fn new(key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
        }
    }
}

// =====================================
// Allowed Methods
// =====================================
/// متدهای مجاز روی یک مسیر (پاسخ OPTIONS)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allow {
    /// کلید وجود نداره: فقط ساختن
    Create,

    /// کلید وجود داره: فقط خوندن
    Read,
}

impl Allow {
    /// مقدار header `Allow`
    #[must_use]
    pub fn header_value(self) -> &'static str {
        match self {
            Self::Create => "OPTIONS, POST",
            Self::Read => "OPTIONS, GET, HEAD",
        }
    }
}
