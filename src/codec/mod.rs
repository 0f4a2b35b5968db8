//! Value model and MessagePack codec adapter.
//!
//! The registry declares a [`TypeDesc`] for every parameter and return
//! position; [`decode_value`]/[`encode_value`] carry single [`Value`]s
//! between those descriptors and their MessagePack wire form.

mod msgpack;
mod types;
mod value;

pub use msgpack::{decode_value, encode_value, DecodeError, EncodeError, TIMESTAMP_EXT_TYPE};
pub use types::TypeDesc;
pub use value::Value;
