// ============================================================
// ENCODING DETECTION
// ============================================================
// Guess a text file's encoding and decode it through a fixed fallback chain

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use tracing::{debug, warn};

use crate::domain::error::{AppError, Result};

/// Bytes inspected when guessing an encoding
pub const DETECTION_PREFIX_BYTES: usize = 10_000;

/// Tried in order once the first choice fails to decode
pub const FALLBACK_ENCODINGS: [&str; 4] = ["utf-8", "gbk", "gb2312", "latin1"];

/// Guess the encoding of a file from its first 10 KB.
///
/// Never fails: unreadable or empty files are reported as UTF-8.
pub fn detect_file_encoding(path: &Path) -> &'static Encoding {
    let mut prefix = Vec::with_capacity(DETECTION_PREFIX_BYTES);
    let read = File::open(path).and_then(|file| {
        file.take(DETECTION_PREFIX_BYTES as u64)
            .read_to_end(&mut prefix)
    });

    match read {
        Ok(0) => UTF_8,
        Ok(_) => detect_bytes_encoding(&prefix),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Encoding detection could not read file, assuming UTF-8");
            UTF_8
        }
    }
}

/// Guess the encoding of an in-memory prefix
pub fn detect_bytes_encoding(prefix: &[u8]) -> &'static Encoding {
    if prefix.is_empty() {
        return UTF_8;
    }
    if let Some((encoding, _)) = Encoding::for_bom(prefix) {
        return encoding;
    }

    let mut detector = EncodingDetector::new();
    detector.feed(prefix, prefix.len() < DETECTION_PREFIX_BYTES);
    detector.guess(None, true)
}

/// First encoding to try when decoding a text file
#[derive(Debug, Clone, Copy)]
pub enum EncodingChoice<'a> {
    /// Label supplied by the caller, e.g. "gbk"
    Explicit(&'a str),
    Detected(&'static Encoding),
}

/// Decode strictly, rejecting malformed sequences instead of replacing them
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Option<String> {
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| {
            let text = text.into_owned();
            match text.strip_prefix('\u{feff}') {
                Some(stripped) => stripped.to_string(),
                None => text,
            }
        })
}

/// Decode `bytes` with the first choice, then each fallback encoding in turn.
///
/// Returns the text and the encoding that produced it.
pub fn decode_with_fallback(
    bytes: &[u8],
    first: EncodingChoice<'_>,
) -> Result<(String, &'static Encoding)> {
    let mut failures: Vec<String> = Vec::new();

    let first_encoding = match first {
        EncodingChoice::Detected(encoding) => Some(encoding),
        EncodingChoice::Explicit(label) => {
            let found = Encoding::for_label(label.trim().as_bytes());
            if found.is_none() {
                failures.push(format!("{} (unknown label)", label));
            }
            found
        }
    };

    if let Some(encoding) = first_encoding {
        if let Some(text) = decode_strict(encoding, bytes) {
            return Ok((text, encoding));
        }
        debug!(encoding = encoding.name(), "First-choice encoding failed, trying fallbacks");
        failures.push(encoding.name().to_string());
    }

    for label in FALLBACK_ENCODINGS {
        let Some(encoding) = Encoding::for_label(label.as_bytes()) else {
            failures.push(format!("{} (unknown label)", label));
            continue;
        };
        if let Some(text) = decode_strict(encoding, bytes) {
            debug!(encoding = encoding.name(), "Decoded with fallback encoding");
            return Ok((text, encoding));
        }
        failures.push(label.to_string());
    }

    Err(AppError::EncodingUndetermined(format!(
        "tried {}",
        failures.join(", ")
    )))
}
