//! BSON ObjectIds.
//!
//! See the documentation for [`ObjectId`] for details on the wire and textual representations.

use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        LazyLock,
    },
    time::SystemTime,
};

use rand::{random, rng, Rng};

use crate::error::{Error, Result};

const TIMESTAMP_SIZE: usize = 4;
const PROCESS_ID_SIZE: usize = 5;
const COUNTER_SIZE: usize = 3;

const TIMESTAMP_OFFSET: usize = 0;
const PROCESS_ID_OFFSET: usize = TIMESTAMP_OFFSET + TIMESTAMP_SIZE;
const COUNTER_OFFSET: usize = PROCESS_ID_OFFSET + PROCESS_ID_SIZE;

const MAX_U24: usize = 0xFF_FFFF;

static OID_COUNTER: LazyLock<AtomicUsize> =
    LazyLock::new(|| AtomicUsize::new(rng().random_range(0..=MAX_U24)));

/// A 12-byte BSON ObjectId: a 4-byte seconds-since-epoch timestamp, a 5-byte random process
/// identifier and a 3-byte big-endian counter.
#[derive(Clone, Copy, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub struct ObjectId {
    id: [u8; 12],
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl From<[u8; 12]> for ObjectId {
    fn from(bytes: [u8; 12]) -> Self {
        Self { id: bytes }
    }
}

impl ObjectId {
    /// Generates a new `ObjectId` from the current time, this process's generated id, and a
    /// shared monotonic counter.
    pub fn new() -> Self {
        let timestamp = Self::gen_timestamp();
        let process_id = Self::gen_process_id();
        let counter = Self::gen_count();

        Self::from_parts(timestamp, process_id, counter)
    }

    /// Wraps a raw 12-byte representation.
    pub const fn from_bytes(bytes: [u8; 12]) -> ObjectId {
        ObjectId { id: bytes }
    }

    /// Builds an `ObjectId` from its three fields.
    pub fn from_parts(seconds_since_epoch: u32, process_id: [u8; 5], counter: [u8; 3]) -> Self {
        let mut bytes = [0; 12];

        bytes[TIMESTAMP_OFFSET..(TIMESTAMP_OFFSET + TIMESTAMP_SIZE)]
            .clone_from_slice(&u32::to_be_bytes(seconds_since_epoch));
        bytes[PROCESS_ID_OFFSET..(PROCESS_ID_OFFSET + PROCESS_ID_SIZE)]
            .clone_from_slice(&process_id);
        bytes[COUNTER_OFFSET..(COUNTER_OFFSET + COUNTER_SIZE)].clone_from_slice(&counter);

        Self::from_bytes(bytes)
    }

    /// Parses a 24-character hex string (the textual / extended-JSON `$oid` form) into an
    /// `ObjectId`.
    pub fn parse_str(s: impl AsRef<str>) -> Result<ObjectId> {
        let s = s.as_ref();

        let bytes: Vec<u8> = hex::decode(s.as_bytes())
            .map_err(|e| Error::invalid_element_size(format!("invalid oid hex string: {e}")))?;
        if bytes.len() != 12 {
            return Err(Error::invalid_element_size(format!(
                "oid must be 12 bytes, got {}",
                bytes.len()
            )));
        }
        let mut byte_array: [u8; 12] = [0; 12];
        byte_array[..].copy_from_slice(&bytes[..]);
        Ok(ObjectId::from_bytes(byte_array))
    }

    /// The seconds-since-epoch portion of this id, as a Unix timestamp.
    pub fn timestamp(&self) -> i64 {
        let mut buf = [0; 4];
        buf.copy_from_slice(&self.id[0..4]);
        u32::from_be_bytes(buf) as i64
    }

    /// The raw 12-byte representation.
    pub const fn bytes(&self) -> [u8; 12] {
        self.id
    }

    /// The 24-character lowercase hex representation used in extended JSON.
    pub fn to_hex(self) -> String {
        hex::encode(self.id)
    }

    fn gen_timestamp() -> u32 {
        SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .expect("system clock is before 1970")
            .as_secs()
            .try_into()
            .unwrap() // succeeds until 2106 since timestamp is unsigned
    }

    fn gen_process_id() -> [u8; 5] {
        static BUF: LazyLock<[u8; 5]> = LazyLock::new(random);
        *BUF
    }

    /// Gets an incremental 3-byte count, represented big-endian.
    fn gen_count() -> [u8; 3] {
        let u_counter = OID_COUNTER.fetch_add(1, Ordering::SeqCst);
        let u = u_counter % (MAX_U24 + 1);
        let buf = (u as u64).to_be_bytes();
        [buf[5], buf[6], buf[7]]
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_tuple("ObjectId").field(&self.to_hex()).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    // OID_COUNTER is a process-wide static; serialize the test that pins its value against
    // anything else that might call ObjectId::new() concurrently.
    static COUNTER_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn count_generated_is_big_endian() {
        let _guard = COUNTER_TEST_LOCK.lock().unwrap();
        let start = 1_122_866;
        OID_COUNTER.store(start, Ordering::SeqCst);

        let count_bytes = ObjectId::gen_count();
        let mut buf: [u8; 4] = [0; 4];
        buf[1..=COUNTER_SIZE].clone_from_slice(&count_bytes[..COUNTER_SIZE]);
        assert_eq!(start as u32, u32::from_be_bytes(buf));
    }

    #[test]
    fn hex_round_trip() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(hex.len(), 24);
        assert_eq!(ObjectId::parse_str(&hex).unwrap(), oid);
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(ObjectId::parse_str("abcd").is_err());
    }

    #[test]
    fn rejects_non_hex() {
        assert!(ObjectId::parse_str("zz00000000000000000000zz").is_err());
    }
}
