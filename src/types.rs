//! Core key types.

use bytes::Bytes;
use std::cmp::Ordering;

/// Value type indicator in internal keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ValueType {
    /// Normal value.
    Value = 1,
    /// Deletion marker (tombstone).
    Deletion = 2,
}

impl ValueType {
    /// Check if this is a deletion marker.
    pub fn is_deletion(&self) -> bool {
        matches!(self, ValueType::Deletion)
    }
}

/// Internal key format used for ordering inside the engine.
///
/// An internal key combines:
/// - User key (the key provided by the user)
/// - Sequence number (version for MVCC)
/// - Value type (Value or Deletion)
///
/// A single user key may span sequence numbers across files, so range
/// arithmetic over files compares the user-key portion only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalKey {
    /// The user-provided key.
    user_key: Bytes,
    /// Sequence number (version).
    sequence: u64,
    /// Value type.
    value_type: ValueType,
}

impl InternalKey {
    /// Maximum sequence number (56 bits).
    pub const MAX_SEQUENCE: u64 = (1 << 56) - 1;

    /// Create a new internal key.
    pub fn new(user_key: impl Into<Bytes>, sequence: u64, value_type: ValueType) -> Self {
        debug_assert!(sequence <= Self::MAX_SEQUENCE);
        Self {
            user_key: user_key.into(),
            sequence,
            value_type,
        }
    }

    /// Create an internal key for a put operation.
    pub fn for_value(user_key: impl Into<Bytes>, sequence: u64) -> Self {
        Self::new(user_key, sequence, ValueType::Value)
    }

    /// Create an internal key for a delete operation.
    pub fn for_deletion(user_key: impl Into<Bytes>, sequence: u64) -> Self {
        Self::new(user_key, sequence, ValueType::Deletion)
    }

    /// Get the user key.
    pub fn user_key(&self) -> &[u8] {
        &self.user_key
    }

    /// Get the user key as shared bytes.
    pub fn user_key_bytes(&self) -> Bytes {
        self.user_key.clone()
    }

    /// Get the sequence number.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Get the value type.
    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    /// Check if this is a deletion marker.
    pub fn is_deletion(&self) -> bool {
        self.value_type.is_deletion()
    }
}

impl Ord for InternalKey {
    fn cmp(&self, other: &Self) -> Ordering {
        // First compare user keys
        match self.user_key.cmp(&other.user_key) {
            Ordering::Equal => {
                // For same user key, newer sequence comes first (descending)
                other.sequence.cmp(&self.sequence)
            }
            ord => ord,
        }
    }
}

impl PartialOrd for InternalKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
