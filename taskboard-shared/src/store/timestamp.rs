//! Store-native timestamps
//!
//! Documents carry their timestamps in the store's own layout:
//!
//! ```json
//! { "seconds": 1680036254, "nanoseconds": 202000000 }
//! ```
//!
//! Conversion to and from `chrono::DateTime<Utc>` happens here and nowhere
//! else. Models hold `DateTime<Utc>`; only the document codecs see
//! `StoreTimestamp`.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Display format used by the public task page (day/month/year)
pub const DISPLAY_DATE_FORMAT: &str = "%d/%m/%Y";

/// Seconds + nanoseconds since the Unix epoch, as persisted by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StoreTimestamp {
    /// Whole seconds since the Unix epoch
    pub seconds: i64,

    /// Sub-second part, always `< 1_000_000_000`
    pub nanoseconds: u32,
}

impl StoreTimestamp {
    /// Timestamp for the current instant
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// Converts a chrono timestamp into the store layout
    pub fn from_datetime(value: DateTime<Utc>) -> Self {
        Self {
            seconds: value.timestamp(),
            nanoseconds: value.timestamp_subsec_nanos(),
        }
    }

    /// Converts back into a chrono timestamp
    ///
    /// Returns `None` when the stored value is outside chrono's range or the
    /// nanosecond part is not normalized.
    pub fn to_datetime(self) -> Option<DateTime<Utc>> {
        if self.nanoseconds >= 1_000_000_000 {
            return None;
        }
        Utc.timestamp_opt(self.seconds, self.nanoseconds).single()
    }

    /// Milliseconds since the Unix epoch
    pub fn as_millis(self) -> i64 {
        self.seconds * 1000 + i64::from(self.nanoseconds / 1_000_000)
    }
}

impl From<DateTime<Utc>> for StoreTimestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}

impl PartialOrd for StoreTimestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for StoreTimestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        self.seconds
            .cmp(&other.seconds)
            .then(self.nanoseconds.cmp(&other.nanoseconds))
    }
}

/// Formats a timestamp the way the public task page shows it
pub fn display_date(value: &DateTime<Utc>) -> String {
    value.format(DISPLAY_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip_keeps_nanoseconds() {
        let at = Utc.timestamp_opt(1_680_036_254, 202_000_000).unwrap();
        let stored = StoreTimestamp::from_datetime(at);

        assert_eq!(stored.seconds, 1_680_036_254);
        assert_eq!(stored.nanoseconds, 202_000_000);
        assert_eq!(stored.to_datetime(), Some(at));
    }

    #[test]
    fn test_as_millis() {
        let stored = StoreTimestamp {
            seconds: 1_680_036_254,
            nanoseconds: 202_000_000,
        };
        assert_eq!(stored.as_millis(), 1_680_036_254_202);
    }

    #[test]
    fn test_rejects_unnormalized_nanoseconds() {
        let stored = StoreTimestamp {
            seconds: 10,
            nanoseconds: 1_000_000_000,
        };
        assert!(stored.to_datetime().is_none());
    }

    #[test]
    fn test_ordering() {
        let earlier = StoreTimestamp { seconds: 5, nanoseconds: 999 };
        let later = StoreTimestamp { seconds: 5, nanoseconds: 1_000 };
        let latest = StoreTimestamp { seconds: 6, nanoseconds: 0 };

        assert!(earlier < later);
        assert!(later < latest);
    }

    #[test]
    fn test_serialized_layout() {
        let stored = StoreTimestamp { seconds: 42, nanoseconds: 7 };
        let json = serde_json::to_value(stored).unwrap();
        assert_eq!(json, serde_json::json!({"seconds": 42, "nanoseconds": 7}));
    }

    #[test]
    fn test_display_date() {
        let at = Utc.with_ymd_and_hms(2023, 3, 28, 20, 44, 14).unwrap();
        assert_eq!(display_date(&at), "28/03/2023");
    }
}
