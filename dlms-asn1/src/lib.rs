//! ASN.1 decoding for DLMS/COSEM
//!
//! - [`axdr`]: A-XDR cursor, BER lengths, the `Data` value decoder and
//!   compact array type descriptions
//! - [`ber`]: BER element walker used for ACSE (AARQ/AARE) APDUs

pub mod axdr;
pub mod ber;

pub use axdr::{AxdrDecoder, LengthEncoding, type_description_length};
pub use ber::{BerDecoder, BerElement, BerTag, BerTagClass};
