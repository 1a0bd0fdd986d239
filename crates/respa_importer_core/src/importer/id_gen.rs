//! Compact time-ordered identifiers for units without an external id.
//!
//! The current time in microseconds is packed as a big-endian `u64`, leading
//! zero bytes are dropped and the rest is encoded as unpadded lowercase
//! base-32. The extended-hex alphabet (`0-9a-v`) keeps byte order and string
//! order identical, so later ids sort after earlier ones.

use data_encoding::BASE32HEX_NOPAD;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static LAST_ISSUED_MICROS: AtomicU64 = AtomicU64::new(0);

/// Generates an id from the current time.
///
/// Ids issued by one process are strictly increasing even when the clock
/// does not advance between calls.
pub fn generate_id() -> String {
    let now = now_micros();
    let previous = LAST_ISSUED_MICROS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last.saturating_add(1)))
        })
        .unwrap_or(now);
    generate_id_at(now.max(previous.saturating_add(1)))
}

/// Encodes the given microsecond timestamp.
pub fn generate_id_at(micros: u64) -> String {
    let bytes = micros.to_be_bytes();
    let first_significant = bytes
        .iter()
        .position(|byte| *byte != 0)
        .unwrap_or(bytes.len());
    BASE32HEX_NOPAD
        .encode(&bytes[first_significant..])
        .to_ascii_lowercase()
}

fn now_micros() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::{generate_id, generate_id_at};

    #[test]
    fn encodes_without_padding_in_lowercase() {
        // 2016-01-01T00:00:00Z in microseconds: seven significant bytes.
        let id = generate_id_at(1_451_606_400_000_000);
        assert_eq!(id.len(), 12);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_digit() || ('a'..='v').contains(&c)));
        assert!(!id.contains('='));
    }

    #[test]
    fn leading_zero_bytes_are_stripped() {
        assert_eq!(generate_id_at(1), "04");
        assert_eq!(generate_id_at(0x0100), "0400");
        assert_eq!(generate_id_at(0), "");
    }

    #[test]
    fn later_timestamps_sort_after_earlier_ones() {
        let start = 1_700_000_000_000_000_u64;
        let mut previous = generate_id_at(start);
        for step in [1_u64, 2, 31, 32, 33, 1_000, 65_535, 1_000_000, 86_400_000_000] {
            let next = generate_id_at(start + step);
            assert!(next > previous, "{next} should sort after {previous}");
            previous = next;
        }
    }

    #[test]
    fn generated_ids_strictly_increase_within_process() {
        let ids: Vec<String> = (0..200).map(|_| generate_id()).collect();
        for pair in ids.windows(2) {
            assert!(pair[1] > pair[0], "{} should sort after {}", pair[1], pair[0]);
        }
    }
}
