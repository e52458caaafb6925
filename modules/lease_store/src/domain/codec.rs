//! Canonical encodings for identifiers, timestamps and durations.
//!
//! Identifiers become key fragments (32 lowercase hex digits) or raw 16-byte
//! values. Timestamps are stored as signed epoch milliseconds; in memory they
//! keep full precision. Durations are stored as whole seconds.

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Length of a non-empty id key fragment.
pub const ID_FRAGMENT_LEN: usize = 32;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("invalid id fragment '{fragment}'")]
    InvalidIdFragment { fragment: String },

    #[error("binary id must be 0 or 16 bytes, got {len}")]
    InvalidIdLength { len: usize },

    #[error("timestamp out of range: {millis} ms")]
    TimestampOutOfRange { millis: i64 },

    #[error("duration out of range: {seconds} s")]
    DurationOutOfRange { seconds: i64 },
}

/// Encode an id as a key fragment.
pub fn encode_id(id: Uuid) -> String {
    id.simple().to_string()
}

/// Decode a key fragment produced by [`encode_id`].
///
/// An empty fragment is the nil id. Only the canonical form is accepted, so
/// `encode_id(decode_id(x)?) == x` holds for every accepted `x`.
pub fn decode_id(fragment: &str) -> Result<Uuid, CodecError> {
    if fragment.is_empty() {
        return Ok(Uuid::nil());
    }
    let canonical = fragment.len() == ID_FRAGMENT_LEN
        && fragment
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
    if !canonical {
        return Err(CodecError::InvalidIdFragment {
            fragment: fragment.to_owned(),
        });
    }
    Uuid::try_parse(fragment).map_err(|_| CodecError::InvalidIdFragment {
        fragment: fragment.to_owned(),
    })
}

/// Raw 16-byte form of an id.
pub fn id_to_bytes(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Binary form for optional ids: nil encodes as zero bytes.
pub fn optional_id_to_bytes(id: Uuid) -> Vec<u8> {
    if id.is_nil() {
        Vec::new()
    } else {
        id_to_bytes(id)
    }
}

/// Decode a binary id. Zero bytes decode to the nil id.
pub fn id_from_bytes(bytes: &[u8]) -> Result<Uuid, CodecError> {
    if bytes.is_empty() {
        return Ok(Uuid::nil());
    }
    Uuid::from_slice(bytes).map_err(|_| CodecError::InvalidIdLength { len: bytes.len() })
}

pub fn encode_timestamp(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_millis()
}

pub fn decode_timestamp(millis: i64) -> Result<DateTime<Utc>, CodecError> {
    DateTime::from_timestamp_millis(millis).ok_or(CodecError::TimestampOutOfRange { millis })
}

/// Whole seconds since epoch, used for native-expiry attributes.
pub fn epoch_seconds(ts: DateTime<Utc>) -> i64 {
    ts.timestamp()
}

/// Sub-second parts are truncated.
pub fn encode_duration(d: Duration) -> i64 {
    d.num_seconds()
}

pub fn decode_duration(seconds: i64) -> Result<Duration, CodecError> {
    Duration::try_seconds(seconds).ok_or(CodecError::DurationOutOfRange { seconds })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn empty_fragment_decodes_to_nil() {
        assert_eq!(decode_id("").unwrap(), Uuid::nil());
        assert_eq!(id_from_bytes(&[]).unwrap(), Uuid::nil());
    }

    #[test]
    fn generated_ids_round_trip_through_fragments() {
        for _ in 0..64 {
            let id = Uuid::new_v4();
            let fragment = encode_id(id);
            assert_eq!(fragment.len(), ID_FRAGMENT_LEN);
            assert_eq!(decode_id(&fragment).unwrap(), id);
            assert_eq!(encode_id(decode_id(&fragment).unwrap()), fragment);
        }
    }

    #[test]
    fn non_canonical_fragments_are_rejected() {
        let id = Uuid::new_v4();
        let hyphenated = id.hyphenated().to_string();
        let upper = encode_id(id).to_uppercase();
        for bad in [hyphenated.as_str(), upper.as_str(), "abc", "zz"] {
            assert!(
                matches!(decode_id(bad), Err(CodecError::InvalidIdFragment { .. })),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn binary_ids_reject_wrong_length() {
        assert_eq!(
            id_from_bytes(&[1, 2, 3]),
            Err(CodecError::InvalidIdLength { len: 3 })
        );
        let id = Uuid::new_v4();
        assert_eq!(id_from_bytes(&id_to_bytes(id)).unwrap(), id);
        assert!(optional_id_to_bytes(Uuid::nil()).is_empty());
    }

    #[test]
    fn timestamps_are_stored_with_millisecond_precision() {
        let ts = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let millis = encode_timestamp(ts);
        assert_eq!(millis, 1_700_000_000_123);
        let back = decode_timestamp(millis).unwrap();
        assert_eq!(back, Utc.timestamp_opt(1_700_000_000, 123_000_000).unwrap());
        assert_eq!(epoch_seconds(ts), 1_700_000_000);
    }

    #[test]
    fn durations_are_whole_seconds() {
        assert_eq!(encode_duration(Duration::milliseconds(10_999)), 10);
        assert_eq!(decode_duration(-5).unwrap(), Duration::seconds(-5));
        assert!(decode_duration(i64::MAX).is_err());
    }
}
