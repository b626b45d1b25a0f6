//! BER (Basic Encoding Rules) decoding for the ACSE layer
//!
//! Each ASN.1 value is encoded as a TLV (Tag-Length-Value) triplet:
//!
//! ```text
//! [Tag] [Length] [Value]
//! ```
//!
//! Lengths use the same definite form as A-XDR, see
//! [`LengthEncoding`](crate::axdr::LengthEncoding).

pub mod decoder;
pub mod types;

pub use decoder::{
    BerDecoder, BerElement, decode_integer_value, decode_object_identifier,
    format_object_identifier,
};
pub use types::{BerTag, BerTagClass};
