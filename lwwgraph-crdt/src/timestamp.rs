use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

#[cfg(feature = "rkyv-support")]
use bytecheck::CheckBytes;
#[cfg(feature = "rkyv-support")]
use rkyv::{Archive, Deserialize, Serialize};

/// The point in time an add or remove event was recorded at.
///
/// Timestamps are ordered by their wall clock `millis` first and then
/// by the logical `counter`, which separates events that happen within
/// the same millisecond on a single replica.
///
/// Nothing about the replica which produced the timestamp is recorded,
/// two replicas may produce identical timestamps. How such ties are
/// resolved is described on [ElementSet](crate::ElementSet).
#[derive(Debug, Default, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "rkyv-support", derive(Serialize, Deserialize, Archive))]
#[cfg_attr(feature = "rkyv-support", archive(compare(PartialEq)))]
#[cfg_attr(feature = "rkyv-support", archive_attr(derive(CheckBytes, Debug)))]
pub struct Timestamp {
    millis: u64,
    counter: u16,
}

impl Timestamp {
    pub const fn new(millis: u64, counter: u16) -> Self {
        Self { millis, counter }
    }

    #[inline]
    pub fn millis(&self) -> u64 {
        self.millis
    }

    /// Produces the next timestamp which is strictly greater than `self`
    /// and not behind the given physical time.
    ///
    /// If the physical time has not advanced past `self` the counter is
    /// incremented instead, once the counter is exhausted the logical
    /// time is pushed one millisecond ahead of the physical time.
    pub fn tick(&self, physical_ms: u64) -> Self {
        if physical_ms > self.millis {
            return Self::new(physical_ms, 0);
        }

        match self.counter.checked_add(1) {
            Some(counter) => Self::new(self.millis, counter),
            None => Self::new(self.millis + 1, 0),
        }
    }
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{:0>4X}", self.millis, self.counter)
    }
}

impl FromStr for Timestamp {
    type Err = InvalidFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (millis, counter) = s.split_once('-').ok_or(InvalidFormat)?;
        let millis = millis.parse::<u64>().map_err(|_| InvalidFormat)?;
        let counter = u16::from_str_radix(counter, 16).map_err(|_| InvalidFormat)?;

        Ok(Self::new(millis, counter))
    }
}

#[derive(Debug, Copy, Clone, thiserror::Error)]
#[error("The provided string is not a valid timestamp.")]
pub struct InvalidFormat;

/// The current unix time in milliseconds.
///
/// A system clock set before the unix epoch is reported as `0`.
pub fn get_unix_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordering() {
        let a = Timestamp::new(10, 0);
        let b = Timestamp::new(10, 1);
        let c = Timestamp::new(11, 0);

        assert!(a < b, "Counter should order events within the same millisecond.");
        assert!(b < c, "Millis should take priority over the counter.");
        assert_eq!(a, Timestamp::new(10, 0));
    }

    #[test]
    fn test_tick() {
        let ts = Timestamp::new(100, 4);

        assert_eq!(ts.tick(200), Timestamp::new(200, 0));
        assert_eq!(ts.tick(100), Timestamp::new(100, 5));
        assert_eq!(
            ts.tick(50),
            Timestamp::new(100, 5),
            "Logical time should never go backwards."
        );

        let exhausted = Timestamp::new(100, u16::MAX);
        assert_eq!(exhausted.tick(100), Timestamp::new(101, 0));
    }

    #[test]
    fn test_display_parse() {
        let ts = Timestamp::new(1_666_000_000_000, 26);
        let rendered = ts.to_string();
        assert_eq!(rendered, "1666000000000-001A");

        let parsed: Timestamp = rendered.parse().expect("Parse rendered timestamp");
        assert_eq!(parsed, ts);

        assert!("nonsense".parse::<Timestamp>().is_err());
        assert!("12-zz".parse::<Timestamp>().is_err());
        assert!("-0001".parse::<Timestamp>().is_err());
    }
}
