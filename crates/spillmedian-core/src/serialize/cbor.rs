use serde::{Serialize, de::DeserializeOwned};
use std::panic::{AssertUnwindSafe, catch_unwind};

pub(super) fn to_cbor<T: Serialize>(value: &T) -> Result<Vec<u8>, String> {
    serde_cbor::to_vec(value).map_err(|err| err.to_string())
}

/// Parse CBOR, reporting a decoder panic as an ordinary failure.
pub(super) fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    match catch_unwind(AssertUnwindSafe(|| serde_cbor::from_slice(bytes))) {
        Ok(decoded) => decoded.map_err(|err| err.to_string()),
        Err(_) => Err("decoder panicked".to_string()),
    }
}

///
/// TESTS
///
