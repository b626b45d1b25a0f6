//! A-XDR decoding module

pub mod decoder;
pub mod type_description;
pub mod types;

pub use decoder::{AxdrDecoder, MAX_NESTING_DEPTH};
pub use type_description::type_description_length;
pub use types::LengthEncoding;
