//! Core types for DLMS/COSEM decoding
//!
//! This crate provides the types shared by every decoding layer:
//!
//! - [`DlmsError`]: structural decoding errors
//! - [`ObisCode`]: COSEM instance identifiers
//! - [`datatypes`]: the DLMS `Data` value model
//! - [`tree`]: labeled field tree and annotations produced by the decoders
//! - [`reassembly`]: per-conversation HDLC segment and datablock reassembly

pub mod datatypes;
pub mod error;
pub mod obis_code;
pub mod reassembly;
pub mod tree;

pub use error::{DlmsError, DlmsResult};
pub use obis_code::ObisCode;
pub use reassembly::{
    ConversationId, FragmentStatus, FrameNumber, Reassembled, Reassembler, ReassemblyConfig,
    StreamKey, StreamKind,
};
pub use tree::{Annotation, AnnotationKind, Field, FieldValue, Severity};
