//! # Date Handling
//!
//! Three concerns: detecting the output format from a column's own sample
//! values, parsing stat bounds (with the `now` / `-30y` sentinels the
//! collector emits), and sampling a uniform random instant in a range.
//!
//! All "current time" arithmetic resolves against the `base_time` pinned
//! at run start, so a seeded run reproduces byte-identical output
//! regardless of when it executes.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::Rng;

/// Fallback output format when detection finds nothing.
pub const ISO_DATE: &str = "%Y-%m-%d";

/// A candidate date/time pattern. `has_time` decides whether the sample
/// is parsed as a full timestamp or as a bare date.
struct CandidateFormat {
    format: &'static str,
    has_time: bool,
}

/// Ordered candidate list; the first pattern that round-trips a sample is
/// adopted. Order matters: the compact `%Y%m%d` must run before separator
/// formats so it cannot shadow them, and date-only forms precede their
/// timestamped variants of the same separator.
const CANDIDATE_FORMATS: &[CandidateFormat] = &[
    CandidateFormat { format: "%Y%m%d", has_time: false },
    CandidateFormat { format: "%Y-%m-%d", has_time: false },
    CandidateFormat { format: "%Y-%m-%d %H:%M:%S", has_time: true },
    CandidateFormat { format: "%Y/%m/%d", has_time: false },
    CandidateFormat { format: "%Y/%m/%d %H:%M:%S", has_time: true },
    CandidateFormat { format: "%d-%m-%Y", has_time: false },
    CandidateFormat { format: "%d-%m-%Y %H:%M:%S", has_time: true },
    CandidateFormat { format: "%d/%m/%Y", has_time: false },
    CandidateFormat { format: "%d/%m/%Y %H:%M:%S", has_time: true },
    CandidateFormat { format: "%Y-%m-%dT%H:%M:%S", has_time: true },
];

/// Detect the format of a single date/time string.
pub fn detect_format(sample: &str) -> Option<&'static str> {
    for candidate in CANDIDATE_FORMATS {
        let ok = if candidate.has_time {
            NaiveDateTime::parse_from_str(sample, candidate.format).is_ok()
        } else {
            NaiveDate::parse_from_str(sample, candidate.format).is_ok()
        };
        if ok {
            return Some(candidate.format);
        }
    }
    None
}

/// Detect a format from a column's sample set: first sample that parses
/// wins. Returns `None` when no sample matches any candidate.
pub fn detect_sample_format(samples: &[String]) -> Option<&'static str> {
    samples.iter().find_map(|s| detect_format(s))
}

/// Days used for the `-30y` sentinel. Calendar-exact arithmetic is not
/// worth it for a statistical lower bound.
const THIRTY_YEARS_DAYS: i64 = 30 * 365;

/// Parse a stat bound (`min_date` / `max_date`). Sentinels `now` and
/// `-30y` resolve against `base_time`. Returns `None` when the string is
/// unparseable — the caller turns that into a fatal error with the
/// table/column context attached.
pub fn parse_bound(value: &str, base_time: NaiveDateTime) -> Option<NaiveDateTime> {
    // Collectors sometimes append a timezone offset; the engine works in
    // naive local time throughout.
    let value = value.split('+').next().unwrap_or(value).trim();

    match value {
        "now" => return Some(base_time),
        "-30y" => return Some(base_time - Duration::days(THIRTY_YEARS_DAYS)),
        _ => {}
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, ISO_DATE)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Uniformly sampled instant in `[start, end]` at second granularity.
/// An inverted range collapses to `start`.
pub fn random_instant(start: NaiveDateTime, end: NaiveDateTime, rng: &mut StdRng) -> NaiveDateTime {
    let span = (end - start).num_seconds();
    if span <= 0 {
        return start;
    }
    start + Duration::seconds(rng.random_range(0..=span))
}
