use std::collections::HashSet;
use std::path::Path;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{Preference, Record};

#[derive(Debug, Clone)]
pub struct Dataset {
    pub records: Vec<Record>,
    pub sha256: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetStats {
    pub records: u64,
    pub preferences: u64,
    pub users: u64,
    pub items: u64,
    pub unparsed: u64,
}

/// Reads one rating per line. The input is not required to be UTF-8.
pub fn load_records(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let sha256 = hex::encode(Sha256::digest(&raw));
    Ok(Dataset {
        records: split_records(&raw),
        sha256,
    })
}

/// Splits raw bytes on `\n`. Each record keeps every other byte of its line (including a
/// `\r` before the `\n`), so writing `bytes + \n` reproduces the line exactly.
///
/// Blank (whitespace-only) lines are dropped and do not count towards `n`, unlike a plain
/// `readlines()` split, which would keep them as records and shift the fold sizes.
pub fn split_records(raw: &[u8]) -> Vec<Record> {
    let mut lines: Vec<&[u8]> = raw.split(|&b| b == b'\n').collect();
    if raw.ends_with(b"\n") {
        lines.pop();
    }
    lines
        .into_iter()
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(i, line)| Record {
            line_no: i + 1,
            bytes: line.to_vec(),
        })
        .collect()
}

pub fn parse_preference(line: &str, delimiter: &str) -> anyhow::Result<Preference> {
    let mut tokens = line.splitn(4, delimiter);
    let user = tokens.next().map(str::trim).unwrap_or("");
    let item = tokens.next().map(str::trim);
    let Some(item) = item else {
        anyhow::bail!("expected user{delimiter}item[{delimiter}value], got {line:?}");
    };
    if user.is_empty() {
        anyhow::bail!("empty user field");
    }
    if item.is_empty() {
        anyhow::bail!("empty item field");
    }

    let value = match tokens.next() {
        Some(raw) => {
            let v = raw
                .trim()
                .parse::<f64>()
                .with_context(|| format!("value {:?} is not a number", raw.trim()))?;
            if !v.is_finite() {
                anyhow::bail!("value {v} is not finite");
            }
            Some(v)
        }
        None => None,
    };
    let other = tokens.next().map(|s| s.to_string());

    Ok(Preference {
        user: user.to_string(),
        item: item.to_string(),
        value,
        other,
    })
}

pub fn summarize(
    records: &[Record],
    delimiter: &str,
    validate: bool,
) -> anyhow::Result<DatasetStats> {
    let mut users: HashSet<String> = HashSet::new();
    let mut items: HashSet<String> = HashSet::new();
    let mut preferences = 0u64;
    let mut unparsed = 0u64;

    for r in records {
        match parse_preference(&r.text(), delimiter) {
            Ok(p) => {
                preferences += 1;
                users.insert(p.user);
                items.insert(p.item);
            }
            Err(e) if validate => {
                return Err(e).with_context(|| format!("malformed rating at line {}", r.line_no));
            }
            Err(_) => unparsed += 1,
        }
    }

    Ok(DatasetStats {
        records: records.len() as u64,
        preferences,
        users: users.len() as u64,
        items: items.len() as u64,
        unparsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn split_keeps_line_numbers_and_skips_blanks() {
        let recs = split_records(b"1::10::5::978300760\n\n  \r\n2::20::3::978302109\r\n3::30::4");
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].line_no, 1);
        assert_eq!(recs[1].line_no, 4);
        assert_eq!(recs[1].bytes, b"2::20::3::978302109\r".to_vec());
        assert_eq!(recs[1].text(), "2::20::3::978302109");
        assert_eq!(recs[2].line_no, 5);
        assert_eq!(recs[2].bytes, b"3::30::4".to_vec());
    }

    #[test]
    fn split_accepts_non_utf8_bytes() {
        let recs = split_records(b"1::10::5\n2::Caf\xe9::4\n");
        assert_eq!(recs.len(), 2);
        assert_eq!(recs[1].bytes, b"2::Caf\xe9::4".to_vec());
        let p = parse_preference(&recs[1].text(), "::").expect("lossy parse");
        assert_eq!(p.user, "2");
        assert_eq!(p.value, Some(4.0));
    }

    #[test]
    fn parses_movielens_line() {
        let p = parse_preference("1::1193::5::978300760", "::").expect("parse");
        assert_eq!(p.user, "1");
        assert_eq!(p.item, "1193");
        assert_eq!(p.value, Some(5.0));
        assert_eq!(p.other.as_deref(), Some("978300760"));
    }

    #[test]
    fn value_and_other_are_optional() {
        let p = parse_preference("u\ti", "\t").expect("parse");
        assert_eq!(p.user, "u");
        assert_eq!(p.item, "i");
        assert_eq!(p.value, None);
        assert_eq!(p.other, None);
    }

    #[test]
    fn trailing_fields_stay_in_other() {
        let p = parse_preference("1::2::3.5::a::b", "::").expect("parse");
        assert_eq!(p.other.as_deref(), Some("a::b"));
    }

    #[test]
    fn rejects_bad_lines() {
        assert!(parse_preference("justone", "::").is_err());
        assert!(parse_preference("::10::5", "::").is_err());
        assert!(parse_preference("1::10::five", "::").is_err());
        assert!(parse_preference("1::10::NaN", "::").is_err());
    }

    #[test]
    fn summarize_counts_distinct_users_and_items() {
        let recs = split_records(b"1::10::5\n1::20::4\n2::10::3\ngarbage\n");
        let stats = summarize(&recs, "::", false).expect("stats");
        assert_eq!(
            stats,
            DatasetStats {
                records: 4,
                preferences: 3,
                users: 2,
                items: 2,
                unparsed: 1,
            }
        );
    }

    #[test]
    fn summarize_validate_reports_line_number() {
        let recs = split_records(b"1::10::5\n\n1::x::bad\n");
        let err = summarize(&recs, "::", true).unwrap_err();
        assert!(format!("{err:#}").contains("line 3"));
    }
}
