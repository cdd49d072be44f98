use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};

use importer_logging::importer_warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBody {
    pub text: String,
    pub encoding_label: String,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("body is not valid {encoding}")]
    Malformed { encoding: String },
}

/// Decode a response body into UTF-8, choosing the encoding from:
/// byte order mark, then `Content-Type` charset, then a chardetng guess.
pub fn decode_body(bytes: &[u8], content_type: Option<&str>) -> Result<DecodedBody, DecodeError> {
    let encoding = detect_encoding(bytes, content_type);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(DecodeError::Malformed {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(DecodedBody {
        text: text.into_owned(),
        encoding_label: encoding.name().to_string(),
    })
}

/// Like [`decode_body`], but falls back to lossy UTF-8 instead of failing.
pub fn decode_body_lossy(bytes: &[u8], content_type: Option<&str>) -> DecodedBody {
    match decode_body(bytes, content_type) {
        Ok(decoded) => decoded,
        Err(err) => {
            importer_warn!("{err}; decoding as lossy UTF-8");
            DecodedBody {
                text: String::from_utf8_lossy(bytes).into_owned(),
                encoding_label: UTF_8.name().to_string(),
            }
        }
    }
}

fn detect_encoding(bytes: &[u8], content_type: Option<&str>) -> &'static Encoding {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return encoding;
    }
    if let Some(encoding) = content_type
        .and_then(charset_param)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
    {
        return encoding;
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    detector.guess(None, true)
}

fn charset_param(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(['"', '\''].as_ref()))
    })
}
