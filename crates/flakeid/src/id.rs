use core::{fmt, str::FromStr, time::Duration};

use crate::Error;

/// A 64-bit Snowflake ID.
///
/// - 1 bit reserved (always zero, so every ID is a non-negative `i64`)
/// - 41 bits timestamp (ms since the generator's epoch)
/// - 10 bits node ID
/// - 12 bits sequence
///
/// ```text
///  Bit Index:  63           63 62            22 21             12 11             0
///              +--------------+----------------+-----------------+---------------+
///  Field:      | reserved (1) | timestamp (41) |   node ID (10)  | sequence (12) |
///              +--------------+----------------+-----------------+---------------+
///              |<----------- MSB ---------- 64 bits ----------- LSB ------------>|
/// ```
///
/// Capacity per node is 4096 IDs per millisecond. With 41 timestamp bits the
/// layout lasts 2^41 ms (roughly 69.7 years) past its epoch; with the default
/// [`CUSTOM_EPOCH`] that is until 2094.
///
/// IDs order by timestamp first, then node ID, then sequence, which is the
/// same as ordering the raw integers.
///
/// # Example
///
/// ```
/// use flakeid::SnowflakeId;
///
/// let id = SnowflakeId::from_components(1000, 2, 1);
/// assert_eq!(id.timestamp(), 1000);
/// assert_eq!(id.node_id(), 2);
/// assert_eq!(id.sequence(), 1);
/// ```
///
/// [`CUSTOM_EPOCH`]: crate::CUSTOM_EPOCH
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u64", into = "u64"))]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId {
    id: u64,
}

impl SnowflakeId {
    /// Width of the timestamp field.
    pub const TIMESTAMP_BITS: u32 = 41;

    /// Width of the node ID field.
    pub const NODE_ID_BITS: u32 = 10;

    /// Width of the sequence field.
    pub const SEQUENCE_BITS: u32 = 12;

    /// Bitmask for extracting the 41-bit timestamp field. Occupies bits 22
    /// through 62.
    pub const TIMESTAMP_MASK: u64 = (1 << Self::TIMESTAMP_BITS) - 1;

    /// Bitmask for extracting the 10-bit node ID field. Occupies bits 12
    /// through 21.
    pub const NODE_ID_MASK: u64 = (1 << Self::NODE_ID_BITS) - 1;

    /// Bitmask for extracting the 12-bit sequence field. Occupies bits 0
    /// through 11.
    pub const SEQUENCE_MASK: u64 = (1 << Self::SEQUENCE_BITS) - 1;

    /// Number of bits to shift the timestamp to its position (bit 22).
    pub const TIMESTAMP_SHIFT: u32 = Self::NODE_ID_BITS + Self::SEQUENCE_BITS;

    /// Number of bits to shift the node ID to its position (bit 12).
    pub const NODE_ID_SHIFT: u32 = Self::SEQUENCE_BITS;

    /// Number of bits to shift the sequence field (bit 0).
    pub const SEQUENCE_SHIFT: u32 = 0;

    /// The reserved top bit. Never set on a valid ID.
    pub const RESERVED_MASK: u64 = 1 << 63;

    /// Packs the three fields into an ID. Each field is masked to its width.
    pub const fn from_components(timestamp: u64, node_id: u64, sequence: u64) -> Self {
        debug_assert!(timestamp <= Self::TIMESTAMP_MASK, "timestamp overflow");
        debug_assert!(node_id <= Self::NODE_ID_MASK, "node_id overflow");
        debug_assert!(sequence <= Self::SEQUENCE_MASK, "sequence overflow");
        let timestamp = (timestamp & Self::TIMESTAMP_MASK) << Self::TIMESTAMP_SHIFT;
        let node_id = (node_id & Self::NODE_ID_MASK) << Self::NODE_ID_SHIFT;
        let sequence = (sequence & Self::SEQUENCE_MASK) << Self::SEQUENCE_SHIFT;
        Self {
            id: timestamp | node_id | sequence,
        }
    }

    /// Extracts the timestamp (ms since the generator's epoch).
    pub const fn timestamp(&self) -> u64 {
        (self.id >> Self::TIMESTAMP_SHIFT) & Self::TIMESTAMP_MASK
    }

    /// Extracts the node ID.
    pub const fn node_id(&self) -> u64 {
        (self.id >> Self::NODE_ID_SHIFT) & Self::NODE_ID_MASK
    }

    /// Extracts the sequence number.
    pub const fn sequence(&self) -> u64 {
        (self.id >> Self::SEQUENCE_SHIFT) & Self::SEQUENCE_MASK
    }

    /// Largest value the timestamp field can hold.
    pub const fn max_timestamp() -> u64 {
        Self::TIMESTAMP_MASK
    }

    /// Largest node ID the layout can encode (1023).
    pub const fn max_node_id() -> u64 {
        Self::NODE_ID_MASK
    }

    /// Largest sequence number within one millisecond (4095).
    pub const fn max_sequence() -> u64 {
        Self::SEQUENCE_MASK
    }

    /// The raw integer.
    pub const fn to_raw(&self) -> u64 {
        self.id
    }

    /// The raw integer as a signed value. Always non-negative.
    #[allow(clippy::cast_possible_wrap)]
    pub const fn to_i64(&self) -> i64 {
        self.id as i64
    }

    /// Wraps a raw integer without validating the reserved bit.
    ///
    /// Prefer [`TryFrom<u64>`] for values received from outside the process.
    pub const fn from_raw(raw: u64) -> Self {
        Self { id: raw }
    }

    /// Absolute wall-clock time of the timestamp field, in milliseconds since
    /// the UNIX epoch, given the epoch the ID was generated against.
    ///
    /// Returns `None` if the sum does not fit in a `u64`.
    #[allow(clippy::cast_possible_truncation)]
    pub const fn unix_millis(&self, epoch: Duration) -> Option<u64> {
        let epoch = epoch.as_millis();
        if epoch > u64::MAX as u128 {
            return None;
        }
        self.timestamp().checked_add(epoch as u64)
    }

    /// Returns the ID as a zero-padded 20-digit string, which sorts
    /// lexicographically in ID order.
    pub fn to_padded_string(&self) -> String {
        format!("{:020}", self.id)
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)
    }
}

impl fmt::Debug for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnowflakeId")
            .field("id", &self.id)
            .field("timestamp", &self.timestamp())
            .field("node_id", &self.node_id())
            .field("sequence", &self.sequence())
            .finish()
    }
}

impl From<SnowflakeId> for u64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_raw()
    }
}

impl From<SnowflakeId> for i64 {
    fn from(id: SnowflakeId) -> Self {
        id.to_i64()
    }
}

impl TryFrom<u64> for SnowflakeId {
    type Error = Error;

    fn try_from(raw: u64) -> Result<Self, Self::Error> {
        if raw & Self::RESERVED_MASK != 0 {
            return Err(Error::InvalidId {
                reason: "reserved bit is set",
            });
        }
        Ok(Self::from_raw(raw))
    }
}

impl TryFrom<i64> for SnowflakeId {
    type Error = Error;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        u64::try_from(raw)
            .map(Self::from_raw)
            .map_err(|_| Error::InvalidId {
                reason: "negative value",
            })
    }
}

impl FromStr for SnowflakeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u64 = s.trim().parse().map_err(|_| Error::InvalidId {
            reason: "not a decimal integer",
        })?;
        Self::try_from(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_capacities() {
        assert_eq!(SnowflakeId::max_node_id(), 1023);
        assert_eq!(SnowflakeId::max_sequence(), 4095);
        assert_eq!(SnowflakeId::max_timestamp(), (1u64 << 41) - 1);
        assert_eq!(
            SnowflakeId::TIMESTAMP_BITS + SnowflakeId::NODE_ID_BITS + SnowflakeId::SEQUENCE_BITS,
            63
        );
    }

    #[test]
    fn layout_lifetime_is_about_69_years() {
        let millis_per_year = 1000 * 60 * 60 * 24 * 365;
        assert_eq!(SnowflakeId::max_timestamp() / millis_per_year, 69);
    }

    #[test]
    fn fields_decode_to_their_inputs() {
        let id = SnowflakeId::from_components(
            SnowflakeId::max_timestamp(),
            SnowflakeId::max_node_id(),
            SnowflakeId::max_sequence(),
        );
        assert_eq!(id.timestamp(), SnowflakeId::max_timestamp());
        assert_eq!(id.node_id(), SnowflakeId::max_node_id());
        assert_eq!(id.sequence(), SnowflakeId::max_sequence());
        assert_eq!(id.to_raw(), u64::MAX >> 1);
        assert!(id.to_i64() > 0);
    }

    #[test]
    fn raw_value_matches_shift_formula() {
        let id = SnowflakeId::from_components(5, 3, 7);
        assert_eq!(id.to_raw(), (5 << 22) | (3 << 12) | 7);
    }

    #[test]
    fn ordering_follows_timestamp_then_node_then_sequence() {
        let a = SnowflakeId::from_components(1, 1023, 4095);
        let b = SnowflakeId::from_components(2, 0, 0);
        let c = SnowflakeId::from_components(2, 0, 1);
        let d = SnowflakeId::from_components(2, 1, 0);
        assert!(a < b && b < c && c < d);
        assert!(a.to_padded_string() < b.to_padded_string());
    }

    #[test]
    fn padded_string_is_twenty_digits() {
        let id = SnowflakeId::from_raw(42);
        assert_eq!(id.to_padded_string(), "00000000000000000042");
        assert_eq!(id.to_string(), "42");
    }

    #[test]
    fn unix_millis_adds_epoch() {
        let id = SnowflakeId::from_components(250, 0, 0);
        assert_eq!(id.unix_millis(Duration::from_millis(1_000)), Some(1_250));
    }

    #[test]
    fn unix_millis_does_not_overflow() {
        let id = SnowflakeId::from_components(1, 0, 0);
        assert_eq!(id.unix_millis(Duration::from_millis(u64::MAX)), None);
        assert_eq!(id.unix_millis(Duration::MAX), None);
        assert_eq!(
            id.unix_millis(Duration::from_millis(u64::MAX - 1)),
            Some(u64::MAX)
        );
        let zero = SnowflakeId::from_raw(0);
        assert_eq!(zero.unix_millis(Duration::from_millis(u64::MAX)), Some(u64::MAX));
    }

    #[test]
    fn parse_and_convert() {
        let id = SnowflakeId::from_components(77, 12, 3);
        let parsed: SnowflakeId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
        assert_eq!(SnowflakeId::try_from(id.to_i64()).unwrap(), id);

        assert!(matches!(
            "abc".parse::<SnowflakeId>(),
            Err(Error::InvalidId { .. })
        ));
        assert!(matches!(
            SnowflakeId::try_from(-1i64),
            Err(Error::InvalidId { .. })
        ));
        assert!(matches!(
            SnowflakeId::try_from(u64::MAX),
            Err(Error::InvalidId { .. })
        ));
    }

    #[test]
    fn debug_shows_fields() {
        let id = SnowflakeId::from_components(9, 8, 7);
        let dbg = format!("{id:?}");
        assert!(dbg.contains("timestamp: 9"));
        assert!(dbg.contains("node_id: 8"));
        assert!(dbg.contains("sequence: 7"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_uses_the_integer() {
        let id = SnowflakeId::from_components(1, 2, 3);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, id.to_raw().to_string());
        let back: SnowflakeId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<SnowflakeId>(&u64::MAX.to_string()).is_err());
    }
}
