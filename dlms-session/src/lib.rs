//! Link layer framing for DLMS/COSEM
//!
//! This crate locates the APDU inside each of the supported encapsulations:
//!
//! - [`hdlc`]: HDLC frames with variable-length addresses, HCS/FCS and
//!   SNRM/UA parameter negotiation
//! - [`llc`]: the LLC header in front of HDLC and IEC 61334-4-32 APDUs
//! - [`wrapper`]: the 8-byte wrapper header of TCP/UDP transport
//!
//! Nothing here keeps state; segment reassembly lives in
//! `dlms_core::reassembly`.

pub mod hdlc;
pub mod llc;
pub mod wrapper;

pub use hdlc::*;
pub use llc::{IEC_432_LSAP, LLC_HEADER_LENGTH, LLC_REQUEST, LLC_RESPONSE, LlcDirection, LlcHeader};
pub use wrapper::{WRAPPER_HEADER_LENGTH, WRAPPER_VERSION, WrapperHeader};
