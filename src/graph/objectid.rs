//! Commit identifiers.
//!
//! An [`ObjectId`] is the opaque, fixed-size hash identifying a commit. The layout engine
//! never interprets it beyond equality, hashing and deriving a color seed.

use std::{fmt, str::FromStr};

use crate::{Error, Result};

/// Length of an [`ObjectId`] in bytes
pub const OBJECT_ID_LEN: usize = 20;

/// The 20 byte hash identifying a commit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Id of the artificial "working tree" row (`1111...`).
    pub const WORK_TREE: ObjectId = ObjectId([0x11; OBJECT_ID_LEN]);

    /// Id of the artificial "index" row (`2222...`).
    pub const INDEX: ObjectId = ObjectId([0x22; OBJECT_ID_LEN]);

    /// Creates an id from its raw bytes.
    #[must_use]
    pub const fn new(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        ObjectId(bytes)
    }

    /// The raw bytes of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; OBJECT_ID_LEN] {
        &self.0
    }

    /// Whether this is one of the ids reserved for artificial rows.
    #[must_use]
    pub fn is_artificial(&self) -> bool {
        *self == Self::WORK_TREE || *self == Self::INDEX
    }

    /// A stable 32 bit value derived from the id, used to seed lane colors.
    #[must_use]
    pub fn seed(&self) -> u32 {
        u32::from_le_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// The first 8 hex digits of the id.
    #[must_use]
    pub fn to_short_string(&self) -> String {
        let mut text = self.to_string();
        text.truncate(8);
        text
    }
}

impl From<[u8; OBJECT_ID_LEN]> for ObjectId {
    fn from(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        ObjectId(bytes)
    }
}

impl FromStr for ObjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.len() != OBJECT_ID_LEN * 2 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(Error::InvalidObjectId(s.to_string()));
        }

        let mut bytes = [0_u8; OBJECT_ID_LEN];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16)
                .map_err(|_| Error::InvalidObjectId(s.to_string()))?;
        }

        Ok(ObjectId(bytes))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_short_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let text = "0123456789abcdef0123456789abcdef01234567";
        let id: ObjectId = text.parse().unwrap();
        assert_eq!(id.to_string(), text);
        assert_eq!(id.to_short_string(), "01234567");
        assert_eq!(id.as_bytes()[1], 0x23);
    }

    #[test]
    fn test_parse_uppercase() {
        let id: ObjectId = "ABCDEF0123456789ABCDEF0123456789ABCDEF01".parse().unwrap();
        assert_eq!(id.to_string(), "abcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!(matches!(
            "1234".parse::<ObjectId>(),
            Err(Error::InvalidObjectId(_))
        ));
        assert!(matches!(
            "zz23456789abcdef0123456789abcdef01234567".parse::<ObjectId>(),
            Err(Error::InvalidObjectId(_))
        ));
        // Signs are not hex digits, even where the integer parser would take them
        assert!(matches!(
            "+1".repeat(OBJECT_ID_LEN).parse::<ObjectId>(),
            Err(Error::InvalidObjectId(_))
        ));
    }

    #[test]
    fn test_artificial_ids() {
        assert!(ObjectId::WORK_TREE.is_artificial());
        assert!(ObjectId::INDEX.is_artificial());
        assert!(!ObjectId::new([0x33; OBJECT_ID_LEN]).is_artificial());
        assert_eq!(
            ObjectId::WORK_TREE.to_string(),
            "1111111111111111111111111111111111111111"
        );
    }
}
