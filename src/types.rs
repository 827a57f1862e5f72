use std::borrow::Cow;
use std::ops::Range;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// One rating line as read from the input, with its 1-based source line number.
/// `bytes` is the line without its `\n`; a preceding `\r` is kept so the line can be
/// written back byte for byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line_no: usize,
    pub bytes: Vec<u8>,
}

impl Record {
    /// Lossy UTF-8 view without the trailing `\r`, for field parsing.
    pub fn text(&self) -> Cow<'_, str> {
        let b = self.bytes.strip_suffix(b"\r").unwrap_or(&self.bytes[..]);
        String::from_utf8_lossy(b)
    }
}

/// A parsed `user::item::value::other` line.
#[derive(Debug, Clone, PartialEq)]
pub struct Preference {
    pub user: String,
    pub item: String,
    pub value: Option<f64>,
    pub other: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoldRange {
    pub start: usize,
    pub end: usize,
}

impl FoldRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn as_range(&self) -> Range<usize> {
        self.start..self.end
    }
}

pub fn now_ms() -> u64 {
    let d = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    d.as_millis() as u64
}
