//! Natural-key generation — a stable content-addressed identifier that is
//! the same across repeated ingestions of one real-world event.

use chrono::{DateTime, Timelike, Utc};
use sha2::{Digest, Sha256};

/// Generate the deduplication key for a normalized alert.
///
/// Preferred path: when the source hands us its own identifier the key is
/// `sha256(source|provider_id)`. Fallback path: `sha256(source|title|area|
/// bucketed_effective_at)` with the timestamp floored to a 10-minute bucket
/// so re-fetches with small jitter collapse onto the same key.
pub fn natural_key(
    source: &str,
    provider_id: Option<&str>,
    title: Option<&str>,
    area: Option<&str>,
    effective_at: Option<DateTime<Utc>>,
) -> String {
    let key_string = match provider_id {
        Some(pid) if !pid.is_empty() => format!("{source}|{pid}"),
        _ => {
            let bucketed = effective_at
                .map(|t| bucket_timestamp(t).to_rfc3339())
                .unwrap_or_default();
            format!(
                "{source}|{}|{}|{bucketed}",
                title.unwrap_or(""),
                area.unwrap_or("")
            )
        }
    };

    let digest = Sha256::digest(key_string.as_bytes());
    hex::encode(digest)
}

/// Floor the minute to the nearest 10-minute boundary and zero the
/// seconds and sub-second components.
fn bucket_timestamp(t: DateTime<Utc>) -> DateTime<Utc> {
    let minute = t.minute() - (t.minute() % 10);
    t.with_minute(minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .expect("floored minute is always in range")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 15, h, m, s).unwrap()
    }

    #[test]
    fn provider_id_path_is_deterministic() {
        let a = natural_key("NWS", Some("urn:oid:2.49.0.1"), None, None, None);
        let b = natural_key("NWS", Some("urn:oid:2.49.0.1"), Some("ignored"), None, None);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn different_providers_differ() {
        let a = natural_key("NWS", Some("id-1"), None, None, None);
        let b = natural_key("USGS_Earthquakes", Some("id-1"), None, None, None);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_provider_id_falls_back_to_content_path() {
        let with_empty = natural_key("NWS", Some(""), Some("Flood"), Some("Old Town"), Some(ts(10, 5, 0)));
        let without = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 5, 0)));
        assert_eq!(with_empty, without);
    }

    #[test]
    fn jitter_within_bucket_collapses() {
        let a = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 0, 0)));
        let b = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 9, 59)));
        assert_eq!(a, b);
    }

    #[test]
    fn one_second_across_bucket_boundary_differs() {
        let a = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 9, 59)));
        let b = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 10, 0)));
        assert_ne!(a, b);
    }

    #[test]
    fn distinct_titles_and_areas_differ() {
        let base = natural_key("NWS", None, Some("Flood"), Some("Old Town"), Some(ts(10, 0, 0)));
        assert_ne!(
            base,
            natural_key("NWS", None, Some("Fire"), Some("Old Town"), Some(ts(10, 0, 0)))
        );
        assert_ne!(
            base,
            natural_key("NWS", None, Some("Flood"), Some("Del Ray"), Some(ts(10, 0, 0)))
        );
    }
}
