//! Spill payload encoding.
//!
//! Every buffered value crosses the spill boundary as one CBOR payload.
//! Size limits are passed in by the caller; run framing and segment
//! bookkeeping live in `sort::codec`.

mod cbor;

use crate::error::{ErrorClass, ErrorOrigin, InternalError};
use serde::{Serialize, de::DeserializeOwned};
use std::any::type_name;
use thiserror::Error as ThisError;

///
/// PayloadError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum PayloadError {
    #[error("could not encode {type_name}: {reason}")]
    Encode {
        type_name: &'static str,
        reason: String,
    },

    #[error("could not decode {type_name}: {reason}")]
    Decode {
        type_name: &'static str,
        reason: String,
    },

    #[error("{len}-byte payload exceeds the {limit}-byte limit")]
    TooLarge { len: usize, limit: usize },
}

impl PayloadError {
    /// Whether stored bytes are at fault rather than the value being written.
    #[must_use]
    pub const fn is_corrupt_input(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }
}

impl From<PayloadError> for InternalError {
    fn from(err: PayloadError) -> Self {
        let class = if err.is_corrupt_input() {
            ErrorClass::Corruption
        } else {
            ErrorClass::Internal
        };

        Self::new(class, ErrorOrigin::Serialize, err.to_string())
    }
}

/// Encode one value, refusing payloads over `limit` bytes.
pub fn encode<T: Serialize>(value: &T, limit: usize) -> Result<Vec<u8>, PayloadError> {
    let bytes = cbor::to_cbor(value).map_err(|reason| PayloadError::Encode {
        type_name: type_name::<T>(),
        reason,
    })?;
    check_len(bytes.len(), limit)?;

    Ok(bytes)
}

/// Decode one payload produced by [`encode`]. Oversized input is rejected
/// before any parsing.
pub fn decode<T: DeserializeOwned>(bytes: &[u8], limit: usize) -> Result<T, PayloadError> {
    check_len(bytes.len(), limit)?;

    cbor::from_cbor(bytes).map_err(|reason| PayloadError::Decode {
        type_name: type_name::<T>(),
        reason,
    })
}

const fn check_len(len: usize, limit: usize) -> Result<(), PayloadError> {
    if len > limit {
        return Err(PayloadError::TooLarge { len, limit });
    }

    Ok(())
}
