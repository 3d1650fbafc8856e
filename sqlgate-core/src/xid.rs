//! XA transaction-branch identifiers.

use bytes::{BufMut, Bytes, BytesMut};
use uuid::Uuid;

use crate::error::{Result, SqlGateError};

/// An X/Open XA transaction-branch identifier.
///
/// An `Xid` names one resource manager's piece of a global transaction: the
/// global transaction identifier is shared by every branch of the
/// transaction, and the branch qualifier distinguishes this resource
/// manager's branch from its siblings. The transaction coordinator issues
/// these; the driver only carries them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Xid {
    format_id: i32,
    global_transaction_id: Vec<u8>,
    branch_qualifier: Vec<u8>,
}

impl Xid {
    /// Maximum length of the global transaction identifier.
    pub const MAXGTRIDSIZE: usize = 64;
    /// Maximum length of the branch qualifier.
    pub const MAXBQUALSIZE: usize = 64;

    /// Creates a new transaction-branch identifier.
    ///
    /// # Panics
    ///
    /// Panics if `global_transaction_id` or `branch_qualifier` exceeds the
    /// maximum size permitted by the XA specification.
    pub fn new(format_id: i32, global_transaction_id: &[u8], branch_qualifier: &[u8]) -> Self {
        assert!(
            global_transaction_id.len() <= Self::MAXGTRIDSIZE,
            "global transaction ID exceeds maximum size of {} bytes",
            Self::MAXGTRIDSIZE
        );
        assert!(
            branch_qualifier.len() <= Self::MAXBQUALSIZE,
            "branch qualifier exceeds maximum size of {} bytes",
            Self::MAXBQUALSIZE
        );

        Self {
            format_id,
            global_transaction_id: global_transaction_id.to_vec(),
            branch_qualifier: branch_qualifier.to_vec(),
        }
    }

    /// Generates a fresh identifier with a random global transaction ID.
    ///
    /// Useful in tests and in coordinators that mint their own identifiers.
    pub fn generate() -> Self {
        let uuid = Uuid::new_v4();
        Self::new(0, uuid.as_bytes(), &[0u8; 8])
    }

    /// Returns the format identifier.
    pub fn format_id(&self) -> i32 {
        self.format_id
    }

    /// Returns the global transaction identifier.
    pub fn global_transaction_id(&self) -> &[u8] {
        &self.global_transaction_id
    }

    /// Returns the branch qualifier.
    pub fn branch_qualifier(&self) -> &[u8] {
        &self.branch_qualifier
    }

    /// Serializes this identifier into its length-prefixed wire image.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(
            4 + 4 + self.global_transaction_id.len() + 4 + self.branch_qualifier.len(),
        );
        buf.put_i32_le(self.format_id);
        buf.put_i32_le(self.global_transaction_id.len() as i32);
        buf.put_slice(&self.global_transaction_id);
        buf.put_i32_le(self.branch_qualifier.len() as i32);
        buf.put_slice(&self.branch_qualifier);
        buf.freeze()
    }

    /// Deserializes an identifier from its length-prefixed wire image.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 12 {
            return Err(SqlGateError::Serialization(
                "xid data too short".to_string(),
            ));
        }

        let format_id = i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let gtrid_len = i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

        if gtrid_len > Self::MAXGTRIDSIZE || bytes.len() < 8 + gtrid_len + 4 {
            return Err(SqlGateError::Serialization(
                "xid data too short for global transaction ID".to_string(),
            ));
        }

        let global_transaction_id = bytes[8..8 + gtrid_len].to_vec();
        let bqual_offset = 8 + gtrid_len;
        let bqual_len = i32::from_le_bytes([
            bytes[bqual_offset],
            bytes[bqual_offset + 1],
            bytes[bqual_offset + 2],
            bytes[bqual_offset + 3],
        ]) as usize;

        if bqual_len > Self::MAXBQUALSIZE || bytes.len() < bqual_offset + 4 + bqual_len {
            return Err(SqlGateError::Serialization(
                "xid data too short for branch qualifier".to_string(),
            ));
        }

        let branch_qualifier = bytes[bqual_offset + 4..bqual_offset + 4 + bqual_len].to_vec();

        Ok(Self {
            format_id,
            global_transaction_id,
            branch_qualifier,
        })
    }
}

impl std::fmt::Display for Xid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "xid:{:x}:", self.format_id)?;
        for b in &self.global_transaction_id {
            write!(f, "{:02x}", b)?;
        }
        write!(f, ":")?;
        for b in &self.branch_qualifier {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}
