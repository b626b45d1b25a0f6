//! Application layer decoding for DLMS/COSEM
//!
//! [`decode_apdu`] dispatches on the APDU tag and appends an "APDU" node to
//! the tree. Service-specific grammars live in [`service`] and
//! [`association`]; COSEM attribute and method references are resolved
//! against a [`CosemLookup`] carried by the [`DecodeContext`].

pub mod association;
pub mod choice;
pub mod context;
pub mod cosem;
pub mod datablock;
pub mod pdu;
pub mod results;
pub mod service;

pub use association::Conformance;
pub use choice::{NamedValue, describe};
pub use context::DecodeContext;
pub use cosem::{CosemClass, CosemDescriptor, CosemLookup, CosemRegistry, DescriptorKind};
pub use datablock::Datablock;
pub use pdu::{ApduTag, InvokeIdAndPriority, LongInvokeIdAndPriority, decode_apdu};
pub use results::{ActionResult, DataAccessResult, ServiceError, StateError};
