//! # Heuristic Pattern Classification
//!
//! Infers a column's semantic family (email, address, URL, phone, date)
//! by matching its sample values against fixed regular expressions. A
//! family is adopted only when at least 80% of the samples match it;
//! anything weaker falls through to the caller's generic default.
//!
//! Used for columns whose declared type and stats give no guidance, and
//! for columns whose family was pinned externally (config or an LLM
//! classification step upstream of this engine).

use std::sync::LazyLock;

use fake::faker::address::en::{BuildingNumber, CityName, StreetName};
use fake::faker::internet::en::{DomainSuffix, SafeEmail};
use fake::faker::lorem::en::Word;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::rngs::StdRng;
use regex::Regex;

use crate::generate::dates;
use crate::generate::value::Value;

/// Share of samples that must match one family for it to be adopted.
const MATCH_THRESHOLD: f64 = 0.8;

/// A recognizable semantic family of string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternFamily {
    Email,
    Address,
    Url,
    Phone,
    Date,
}

impl PatternFamily {
    /// Parse an externally pinned family name from a column's declared type.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "email" => Some(PatternFamily::Email),
            "address" => Some(PatternFamily::Address),
            "url" => Some(PatternFamily::Url),
            "phone_number" | "phone" => Some(PatternFamily::Phone),
            "date" | "date_time" | "time" => Some(PatternFamily::Date),
            _ => None,
        }
    }
}

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\w.\-]+@[\w.\-]+\.\w+$").unwrap());
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?i)https?://[a-z0-9.\-]+\.[a-z]{2,}(?:/\S*)?$").unwrap());
static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{6,}$").unwrap());
static DATE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}[-/]\d{1,2}[-/]\d{1,2}$").unwrap());

/// Address detection is keyword-based: a street-ish token anywhere in the
/// sample. Regexes are too brittle for postal formats.
const ADDRESS_KEYWORDS: &[&str] = &[
    " street", " st.", " ave", " avenue", " road", " rd.", " lane", " blvd", " boulevard",
    " drive", " suite", " apt", " court", " plaza",
];

/// Classify a set of sample values into a pattern family, if one family
/// matches at least [`MATCH_THRESHOLD`] of them.
pub fn classify_samples(samples: &[String]) -> Option<PatternFamily> {
    if samples.is_empty() {
        return None;
    }

    let families = [
        PatternFamily::Email,
        PatternFamily::Address,
        PatternFamily::Url,
        PatternFamily::Phone,
        PatternFamily::Date,
    ];

    let mut best: Option<(PatternFamily, usize)> = None;
    for family in families {
        let hits = samples.iter().filter(|s| matches_family(family, s)).count();
        if best.is_none_or(|(_, b)| hits > b) {
            best = Some((family, hits));
        }
    }

    let (family, hits) = best?;
    if hits as f64 / samples.len() as f64 >= MATCH_THRESHOLD {
        Some(family)
    } else {
        None
    }
}

fn matches_family(family: PatternFamily, sample: &str) -> bool {
    match family {
        PatternFamily::Email => EMAIL_RE.is_match(sample),
        PatternFamily::Url => URL_RE.is_match(sample),
        PatternFamily::Phone => PHONE_RE.is_match(sample),
        PatternFamily::Date => DATE_RE.is_match(sample),
        PatternFamily::Address => {
            let lower = sample.to_lowercase();
            ADDRESS_KEYWORDS.iter().any(|kw| lower.contains(kw))
        }
    }
}

/// Synthesize one value of the given family.
///
/// Date values honor the format detected from the column's own samples so
/// generated output blends in with the source shape.
pub fn generate_for_family(
    family: PatternFamily,
    samples: &[String],
    rng: &mut StdRng,
    base_time: chrono::NaiveDateTime,
) -> Value {
    match family {
        PatternFamily::Email => {
            let email: String = SafeEmail().fake_with_rng(rng);
            Value::String(email)
        }
        PatternFamily::Address => {
            let number: String = BuildingNumber().fake_with_rng(rng);
            let street: String = StreetName().fake_with_rng(rng);
            let city: String = CityName().fake_with_rng(rng);
            Value::String(format!("{} {} Street, {}", number, street, city))
        }
        PatternFamily::Url => {
            let word: String = Word().fake_with_rng(rng);
            let suffix: String = DomainSuffix().fake_with_rng(rng);
            Value::String(format!("https://{}.{}", word, suffix))
        }
        PatternFamily::Phone => {
            let phone: String = PhoneNumber().fake_with_rng(rng);
            Value::String(phone)
        }
        PatternFamily::Date => {
            let format = dates::detect_sample_format(samples).unwrap_or(dates::ISO_DATE);
            let epoch = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap();
            let instant = dates::random_instant(epoch, base_time, rng);
            Value::String(instant.format(format).to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_emails() {
        let samples = strings(&[
            "ana@example.com",
            "bo.b@mail.co",
            "carol-3@web.org",
            "dave@example.net",
        ]);
        assert_eq!(classify_samples(&samples), Some(PatternFamily::Email));
    }

    #[test]
    fn test_classify_below_threshold() {
        // 2 of 4 emails = 50%, under the 80% bar
        let samples = strings(&["ana@example.com", "bo.b@mail.co", "hello", "world"]);
        assert_eq!(classify_samples(&samples), None);
    }

    #[test]
    fn test_classify_urls_case_insensitive() {
        let samples = strings(&[
            "https://example.com/a",
            "HTTP://EXAMPLE.ORG",
            "https://a-b.io/x?y=1",
            "https://deep.example.co.uk/path",
        ]);
        assert_eq!(classify_samples(&samples), Some(PatternFamily::Url));
    }

    #[test]
    fn test_classify_phones() {
        let samples = strings(&["+1 (555) 010-7788", "020-7946-0018", "555 010 2030"]);
        assert_eq!(classify_samples(&samples), Some(PatternFamily::Phone));
    }

    #[test]
    fn test_classify_dates() {
        let samples = strings(&["2020-01-05", "2020/1/15", "2021-12-31"]);
        assert_eq!(classify_samples(&samples), Some(PatternFamily::Date));
    }

    #[test]
    fn test_classify_addresses() {
        let samples = strings(&[
            "12 Baker Street, London",
            "500 Fifth Avenue",
            "77 Sunset Blvd",
        ]);
        assert_eq!(classify_samples(&samples), Some(PatternFamily::Address));
    }

    #[test]
    fn test_classify_empty() {
        assert_eq!(classify_samples(&[]), None);
    }

    #[test]
    fn test_pinned_family_names() {
        assert_eq!(PatternFamily::from_name("email"), Some(PatternFamily::Email));
        assert_eq!(
            PatternFamily::from_name("phone_number"),
            Some(PatternFamily::Phone)
        );
        assert_eq!(PatternFamily::from_name("varchar"), None);
    }
}
