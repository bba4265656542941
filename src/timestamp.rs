//! Standard extension type -1: timestamps.
//!
//! Payload forms, big-endian:
//!
//! - 4 bytes: u32 seconds since the epoch, nanoseconds 0;
//! - 8 bytes: u64 with nanoseconds in the top 30 bits and seconds in the low 34;
//! - 12 bytes: u32 nanoseconds followed by i64 seconds.

use crate::codec::CodecError;
use crate::value::{Extension, Value};
use byteorder::{BigEndian, ByteOrder};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const NANOS_PER_SEC: u32 = 1_000_000_000;
const SECONDS_34_BITS: u64 = (1 << 34) - 1;

/// Seconds and nanoseconds relative to the Unix epoch. `nanos` is always below 10^9;
/// instants before the epoch have negative `seconds` and non-negative `nanos`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    seconds: i64,
    nanos: u32,
}

impl Timestamp {
    pub const EXT_TYPE: i8 = -1;

    pub fn new(seconds: i64, nanos: u32) -> Result<Self, CodecError> {
        if nanos >= NANOS_PER_SEC {
            return Err(CodecError::InvalidTimestamp);
        }
        Ok(Timestamp { seconds, nanos })
    }

    pub fn seconds(&self) -> i64 {
        self.seconds
    }

    pub fn nanos(&self) -> u32 {
        self.nanos
    }

    /// Smallest payload form that holds this timestamp.
    pub fn to_payload(&self) -> Vec<u8> {
        match u64::try_from(self.seconds) {
            Ok(s) if self.nanos == 0 && s <= u32::MAX as u64 => {
                let mut buf = [0u8; 4];
                BigEndian::write_u32(&mut buf, s as u32);
                buf.to_vec()
            }
            Ok(s) if s <= SECONDS_34_BITS => {
                let mut buf = [0u8; 8];
                BigEndian::write_u64(&mut buf, (u64::from(self.nanos) << 34) | s);
                buf.to_vec()
            }
            _ => {
                let mut buf = [0u8; 12];
                BigEndian::write_u32(&mut buf[..4], self.nanos);
                BigEndian::write_i64(&mut buf[4..], self.seconds);
                buf.to_vec()
            }
        }
    }

    pub fn from_payload(data: &[u8]) -> Result<Self, CodecError> {
        let (seconds, nanos) = match data.len() {
            4 => (i64::from(BigEndian::read_u32(data)), 0),
            8 => {
                let packed = BigEndian::read_u64(data);
                ((packed & SECONDS_34_BITS) as i64, (packed >> 34) as u32)
            }
            12 => (BigEndian::read_i64(&data[4..]), BigEndian::read_u32(&data[..4])),
            _ => return Err(CodecError::InvalidTimestamp),
        };
        Timestamp::new(seconds, nanos)
    }

    /// None if the instant is outside what `SystemTime` can represent on this platform.
    pub fn to_system_time(&self) -> Option<SystemTime> {
        let base = if self.seconds >= 0 {
            UNIX_EPOCH.checked_add(Duration::from_secs(self.seconds as u64))?
        } else {
            UNIX_EPOCH.checked_sub(Duration::from_secs(self.seconds.unsigned_abs()))?
        };
        base.checked_add(Duration::from_nanos(u64::from(self.nanos)))
    }
}

impl TryFrom<SystemTime> for Timestamp {
    type Error = CodecError;

    /// Fails with `InvalidTimestamp` if the seconds do not fit an `i64`.
    fn try_from(t: SystemTime) -> Result<Self, Self::Error> {
        let (after, d) = match t.duration_since(UNIX_EPOCH) {
            Ok(d) => (true, d),
            Err(e) => (false, e.duration()),
        };
        let secs = i64::try_from(d.as_secs()).map_err(|_| CodecError::InvalidTimestamp)?;
        Ok(match (after, d.subsec_nanos()) {
            (true, n) => Timestamp { seconds: secs, nanos: n },
            (false, 0) => Timestamp { seconds: -secs, nanos: 0 },
            (false, n) => Timestamp {
                seconds: (-secs).checked_sub(1).ok_or(CodecError::InvalidTimestamp)?,
                nanos: NANOS_PER_SEC - n,
            },
        })
    }
}

impl From<Timestamp> for Value {
    fn from(ts: Timestamp) -> Self {
        Value::hashable_host(ts)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:09}", self.seconds, self.nanos)
    }
}

/// Claims host `Timestamp` and `SystemTime` values.
pub(crate) fn encode_extension(v: &Value) -> Result<Option<Extension>, CodecError> {
    let Value::Host(h) = v else {
        return Ok(None);
    };
    let ts = if let Some(ts) = h.downcast_ref::<Timestamp>() {
        *ts
    } else if let Some(t) = h.downcast_ref::<SystemTime>() {
        Timestamp::try_from(*t)?
    } else {
        return Ok(None);
    };
    Ok(Some(Extension::new(Timestamp::EXT_TYPE, ts.to_payload())))
}

pub(crate) fn decode_extension(data: &[u8]) -> Result<(Value, bool), CodecError> {
    Ok((Value::hashable_host(Timestamp::from_payload(data)?), true))
}
