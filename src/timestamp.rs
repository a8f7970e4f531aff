//! Archive timestamps and their two on-disk encodings.
//!
//! In memory a timestamp is always (sec: i64, nsec: u32) with
//! lexicographic ordering. Legacy (V2) records carry (sec: i32,
//! usec: i32) on disk; current (V3) records carry the full form with
//! the 64-bit seconds transmitted big-endian.

use serde::{Deserialize, Serialize};

/// A point in archive time. Ordering is lexicographic on (sec, nsec).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Timestamp {
    pub sec: i64,
    pub nsec: u32,
}

impl Timestamp {
    pub fn new(sec: i64, nsec: u32) -> Self {
        Self { sec, nsec }
    }

    /// Normalize a legacy (seconds, microseconds) pair.
    pub fn from_sec_usec(sec: i32, usec: i32) -> Self {
        Self {
            sec: sec as i64,
            nsec: (usec as u32) * 1000,
        }
    }

    /// Legacy wire form: (sec: i32 BE, usec: i32 BE). Sub-microsecond
    /// precision is dropped.
    pub fn encode_v2(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&(self.sec as i32).to_be_bytes());
        out.extend_from_slice(&((self.nsec / 1000) as i32).to_be_bytes());
    }

    /// Current wire form: (sec: i64 BE, nsec: u32 BE).
    pub fn encode_v3(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.sec.to_be_bytes());
        out.extend_from_slice(&self.nsec.to_be_bytes());
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:09}", self.sec, self.nsec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering_is_lexicographic() {
        let a = Timestamp::new(100, 0);
        let b = Timestamp::new(100, 1);
        let c = Timestamp::new(101, 0);
        assert!(a < b);
        assert!(b < c);
        assert!(a < c);
        assert_eq!(a, Timestamp::new(100, 0));
    }

    #[test]
    fn test_legacy_normalization() {
        let t = Timestamp::from_sec_usec(42, 123456);
        assert_eq!(t.sec, 42);
        assert_eq!(t.nsec, 123_456_000);
    }

    #[test]
    fn test_legacy_negative_seconds() {
        let t = Timestamp::from_sec_usec(-1, 500000);
        assert_eq!(t.sec, -1);
        assert_eq!(t.nsec, 500_000_000);
    }

    #[test]
    fn test_encode_v2_truncates_sub_microsecond() {
        let t = Timestamp::new(7, 1999);
        let mut buf = Vec::new();
        t.encode_v2(&mut buf);
        assert_eq!(buf.len(), 8);
        let sec = i32::from_be_bytes(buf[0..4].try_into().unwrap());
        let usec = i32::from_be_bytes(buf[4..8].try_into().unwrap());
        assert_eq!(sec, 7);
        assert_eq!(usec, 1);
    }

    #[test]
    fn test_encode_v3_layout() {
        let t = Timestamp::new(0x0102_0304_0506_0708, 9);
        let mut buf = Vec::new();
        t.encode_v3(&mut buf);
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[0..8], &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert_eq!(u32::from_be_bytes(buf[8..12].try_into().unwrap()), 9);
    }
}
