//! MessagePack encoding of checkpointed state.
//!
//! Structs are written with field names so the encoding tolerates fields
//! being added to a state type.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::Result;

pub fn dumps<S: Serialize>(state: &S) -> Result<Vec<u8>> {
    Ok(rmp_serde::to_vec_named(state)?)
}

pub fn loads<S: DeserializeOwned>(payload: &[u8]) -> Result<S> {
    Ok(rmp_serde::from_slice(payload)?)
}
