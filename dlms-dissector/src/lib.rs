//! DLMS/COSEM protocol dissector
//!
//! Decodes captured DLMS/COSEM traffic into a labeled field tree, a
//! one-line summary and a list of annotations for anything notable.
//!
//! # Architecture
//!
//! The decoder is organized as a workspace with multiple crates:
//!
//! - `dlms-core`: error type, OBIS codes, the `Data` value model, the field
//!   tree and the reassembly tables
//! - `dlms-asn1`: A-XDR and BER readers
//! - `dlms-session`: HDLC, LLC and wrapper framing
//! - `dlms-application`: APDU decoding and the COSEM class registry
//! - `dlms-dissector`: encapsulation dispatch, configuration and the
//!   `dlms-decode` command line tool
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_dissector::{ConversationId, Dissector, DissectorConfig};
//!
//! let config = DissectorConfig::from_file("dlms.toml")?;
//! let dissector = Dissector::builder().config(config).build()?;
//! let frame = [0x7E, 0xA0, 0x07, 0x03, 0x21, 0x93, 0x0F, 0x01, 0x7E];
//! let dissection = dissector.dissect(ConversationId(1), 1, &frame);
//! print!("{}", dissection.render());
//! # Ok::<(), dlms_dissector::DlmsError>(())
//! ```

pub mod config;
pub mod dissector;
mod link;

pub use config::DissectorConfig;
pub use dissector::{DLMS_UDP_PORT, Dissection, Dissector, DissectorBuilder, Encapsulation};

// Re-export the types a dissection is made of
pub use dlms_application::{CosemClass, CosemLookup, CosemRegistry};
pub use dlms_core::tree::render_tree;
pub use dlms_core::{
    Annotation, AnnotationKind, ConversationId, DlmsError, DlmsResult, Field, FieldValue,
    FrameNumber, ObisCode, ReassemblyConfig, Severity,
};
