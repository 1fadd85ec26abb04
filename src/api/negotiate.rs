//! # Content Negotiation
//!
//! Content-Type درخواست هم decode بدنه رو مشخص میکنه و هم فرمت پاسخ رو.
//!
//! | Content-Type | بدنه درخواست | پاسخ موفق | پاسخ خطا |
//! |---|---|---|---|
//! | `application/json`, `text/json` | `{"key","url"}` | همون شکل | `{"error":"..."}` |
//! | `text/xml`, `application/xml` | `<furl><key/><url/></furl>` | همون شکل | `<furl><error>...</error></furl>` |
//! | `application/x-www-form-urlencoded` | فیلدهای `key`, `url` | متن کلید (`text/html`) | متن خطا |
//! | `text/plain` | کل بدنه = URL | متن کلید | متن خطا |
//!
//! ## مفاهیم:
//! - **Tagged enum** به جای سلسله‌مراتب: هر `Format` یک جفت encode/decode

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    models::KeyUrl,
};

/// نام ریشه XML
const XML_ROOT: &str = "furl";

/// فرمت‌های پشتیبانی شده
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Xml,
    Form,
    Text,
}

/// نتیجه مذاکره: فرمت + media type پاسخ
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Negotiated {
    pub format: Format,
    pub media_type: &'static str,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

impl Negotiated {
    /// انتخاب فرمت از header Content-Type
    ///
    /// پارامترها (`; charset=...`) نادیده گرفته میشن.
    ///
    /// # Errors
    /// `UnsupportedMediaType` برای header غایب یا ناشناخته
    pub fn from_content_type(content_type: Option<&str>) -> Result<Self> {
        let essence = content_type
            .and_then(|value| value.split(';').next())
            .map(|value| value.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let (format, media_type) = match essence.as_str() {
            "application/json" => (Format::Json, "application/json"),
            "text/json" => (Format::Json, "text/json"),
            "text/xml" => (Format::Xml, "text/xml"),
            "application/xml" => (Format::Xml, "application/xml"),
            // پاسخ فرم مستقیم در مرورگر نشون داده میشه
            "application/x-www-form-urlencoded" => (Format::Form, "text/html"),
            "text/plain" => (Format::Text, "text/plain"),
            _ => return Err(AppError::UnsupportedMediaType),
        };

        Ok(Self { format, media_type })
    }

    /// decode بدنه درخواست
    ///
    /// # Errors
    /// `MalformedRequest` اگه بدنه با فرمت نخونه
    pub fn decode(&self, body: &[u8]) -> Result<KeyUrl> {
        match self.format {
            Format::Json => {
                serde_json::from_slice(body).map_err(|_| AppError::MalformedRequest)
            }
            Format::Xml => {
                let text = std::str::from_utf8(body).map_err(|_| AppError::MalformedRequest)?;
                quick_xml::de::from_str(text).map_err(|_| AppError::MalformedRequest)
            }
            Format::Form => {
                // جداکننده ';' پذیرفته نیست، فقط '&'
                if body.contains(&b';') {
                    return Err(AppError::MalformedRequest);
                }
                serde_urlencoded::from_bytes(body).map_err(|_| AppError::MalformedRequest)
            }
            Format::Text => {
                let url = String::from_utf8(body.to_vec()).map_err(|_| AppError::MalformedRequest)?;
                Ok(KeyUrl::new("", url))
            }
        }
    }

    /// encode پاسخ موفق
    ///
    /// # Errors
    /// `Server` اگه serializer شکست بخوره
    pub fn encode(&self, data: &KeyUrl) -> Result<String> {
        match self.format {
            Format::Json => serde_json::to_string(data).map_err(|e| AppError::Server(e.to_string())),
            Format::Xml => quick_xml::se::to_string_with_root(XML_ROOT, data)
                .map_err(|e| AppError::Server(e.to_string())),
            Format::Form | Format::Text => Ok(data.key.clone()),
        }
    }

    /// encode بدنه خطا در همین فرمت
    #[must_use]
    pub fn encode_error(&self, err: &AppError) -> String {
        let message = err.to_string();
        match self.format {
            Format::Json => serde_json::to_string(&ErrorBody { error: &message })
                .unwrap_or_else(|_| format!("{{\"error\":{message:?}}}")),
            Format::Xml => format!(
                "<{XML_ROOT}><error>{}</error></{XML_ROOT}>",
                quick_xml::escape::escape(message.as_str())
            ),
            Format::Form | Format::Text => message,
        }
    }

    /// ساخت پاسخ HTTP از نتیجه create
    pub fn respond(&self, result: Result<KeyUrl>) -> Response {
        let encoded = result.and_then(|data| self.encode(&data));
        let (status, body) = match encoded {
            Ok(body) => (StatusCode::OK, body),
            Err(err) => {
                err.log_if_server_error();
                (err.status_code(), self.encode_error(&err))
            }
        };
        (status, [(header::CONTENT_TYPE, self.media_type)], body).into_response()
    }
}

// =====================================
// Tests
// =====================================
#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn negotiated(content_type: &str) -> Negotiated {
        Negotiated::from_content_type(Some(content_type)).unwrap()
    }

    #[test]
    fn test_content_type_table() {
        assert_eq!(negotiated("application/json").format, Format::Json);
        assert_eq!(negotiated("text/json").media_type, "text/json");
        assert_eq!(negotiated("application/xml").format, Format::Xml);
        assert_eq!(negotiated("text/xml").media_type, "text/xml");
        assert_eq!(negotiated("text/plain").format, Format::Text);

        let form = negotiated("application/x-www-form-urlencoded");
        assert_eq!(form.format, Format::Form);
        assert_eq!(form.media_type, "text/html");
    }

    #[test]
    fn test_parameters_and_case_are_ignored() {
        let json = negotiated("Application/JSON; charset=utf-8");
        assert_eq!(json.format, Format::Json);
        assert_eq!(json.media_type, "application/json");
    }

    #[test]
    fn test_unknown_or_missing_type_is_unsupported() {
        assert!(matches!(
            Negotiated::from_content_type(Some("unknown")),
            Err(AppError::UnsupportedMediaType)
        ));
        assert!(matches!(
            Negotiated::from_content_type(None),
            Err(AppError::UnsupportedMediaType)
        ));
    }

    #[test]
    fn test_decode_each_format() {
        let expected = KeyUrl::new("ABCD", "http://google.com");

        assert_eq!(
            negotiated("application/json")
                .decode(br#"{"key":"ABCD","url":"http://google.com"}"#)
                .unwrap(),
            expected
        );
        assert_eq!(
            negotiated("text/xml")
                .decode(b"<furl><key>ABCD</key><url>http://google.com</url></furl>")
                .unwrap(),
            expected
        );
        assert_eq!(
            negotiated("application/x-www-form-urlencoded")
                .decode(b"key=ABCD&url=http%3A%2F%2Fgoogle.com")
                .unwrap(),
            expected
        );
        assert_eq!(
            negotiated("text/plain").decode(b"http://google.com").unwrap(),
            KeyUrl::new("", "http://google.com")
        );
    }

    #[test]
    fn test_decode_failures_are_malformed() {
        assert!(matches!(
            negotiated("application/json").decode(br#"{"url":a}"#),
            Err(AppError::MalformedRequest)
        ));
        assert!(matches!(
            negotiated("text/xml").decode(b"<furl><url>"),
            Err(AppError::MalformedRequest)
        ));
        assert!(matches!(
            negotiated("application/x-www-form-urlencoded").decode(b"url=;"),
            Err(AppError::MalformedRequest)
        ));
        assert!(matches!(
            negotiated("text/plain").decode(&[0xff, 0xfe]),
            Err(AppError::MalformedRequest)
        ));
    }

    #[test]
    fn test_missing_fields_decode_empty() {
        assert_eq!(negotiated("text/xml").decode(b"<furl></furl>").unwrap(), KeyUrl::default());
        assert_eq!(
            negotiated("application/x-www-form-urlencoded").decode(b"").unwrap(),
            KeyUrl::default()
        );
    }

    #[test]
    fn test_encode_success_bodies() {
        let data = KeyUrl::new("AQ", "http://google.com");

        assert_eq!(
            negotiated("application/json").encode(&data).unwrap(),
            r#"{"key":"AQ","url":"http://google.com"}"#
        );
        assert_eq!(
            negotiated("text/xml").encode(&data).unwrap(),
            "<furl><key>AQ</key><url>http://google.com</url></furl>"
        );
        assert_eq!(negotiated("text/plain").encode(&data).unwrap(), "AQ");
        assert_eq!(
            negotiated("application/x-www-form-urlencoded").encode(&data).unwrap(),
            "AQ"
        );
    }

    #[test]
    fn test_encode_error_bodies() {
        let err = AppError::InvalidKey;
        assert_eq!(
            negotiated("application/json").encode_error(&err),
            r#"{"error":"invalid key"}"#
        );
        assert_eq!(
            negotiated("application/xml").encode_error(&err),
            "<furl><error>invalid key</error></furl>"
        );
        assert_eq!(negotiated("text/plain").encode_error(&err), "invalid key");
    }
}
