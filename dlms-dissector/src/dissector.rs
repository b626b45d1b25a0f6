//! Dissector facade
//!
//! A [`Dissector`] owns the reassembly tables and the COSEM registry and
//! turns one captured buffer into a [`Dissection`]. It is shared between
//! threads; frames of one conversation must be fed in capture order.
//!
//! ```rust,no_run
//! use dlms_dissector::{ConversationId, Dissector};
//!
//! let dissector = Dissector::builder().build()?;
//! let bytes = [0xC0, 0x01, 0xC1, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02, 0x00];
//! let dissection = dissector.dissect(ConversationId(1), 1, &bytes);
//! println!("{}", dissection.summary);
//! # Ok::<(), dlms_dissector::DlmsError>(())
//! ```

use crate::config::DissectorConfig;
use crate::link;
use dlms_application::{CosemLookup, CosemRegistry, DecodeContext, decode_apdu};
use dlms_core::tree::render_tree;
use dlms_core::{
    Annotation, ConversationId, DlmsError, DlmsResult, Field, FrameNumber, Reassembler,
};
use dlms_session::{FLAG, IEC_432_LSAP};
use serde::{Serialize, Serializer};
use std::fmt;
use std::ops::Range;
use std::sync::Arc;

/// Well-known UDP port of DLMS/COSEM wrapper traffic
pub const DLMS_UDP_PORT: u16 = 4059;

/// Framing in front of the APDU, chosen from the first byte of a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Encapsulation {
    /// HDLC frame, starting with the 0x7E flag
    Hdlc,
    /// IEC 61334-4-32 LLC header, destination LSAP 0x90
    Iec432,
    /// Wrapper header, whose version word starts with 0x00
    Wrapper,
    /// Bare APDU
    Apdu,
}

impl Encapsulation {
    pub fn detect(first_byte: u8) -> Self {
        match first_byte {
            FLAG => Encapsulation::Hdlc,
            IEC_432_LSAP => Encapsulation::Iec432,
            0x00 => Encapsulation::Wrapper,
            _ => Encapsulation::Apdu,
        }
    }
}

impl fmt::Display for Encapsulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Encapsulation::Hdlc => "HDLC",
            Encapsulation::Iec432 => "IEC 61334-4-32",
            Encapsulation::Wrapper => "Wrapper",
            Encapsulation::Apdu => "APDU",
        })
    }
}

/// Result of dissecting one buffer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dissection {
    pub frame: FrameNumber,
    pub encapsulation: Encapsulation,
    /// One-line description of the frame
    pub summary: String,
    pub tree: Vec<Field>,
    pub annotations: Vec<Annotation>,
    /// Error that stopped decoding; `tree` holds what was decoded before it
    #[serde(serialize_with = "serialize_error")]
    pub error: Option<DlmsError>,
}

fn serialize_error<S: Serializer>(error: &Option<DlmsError>, serializer: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(err) => serializer.serialize_some(&err.to_string()),
        None => serializer.serialize_none(),
    }
}

impl Dissection {
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// Summary, indented tree and annotations as text
    pub fn render(&self) -> String {
        let mut out = format!("Frame {}: {}\n", self.frame, self.summary);
        out.push_str(&render_tree(&self.tree));
        for annotation in &self.annotations {
            out.push_str(&format!("{}\n", annotation));
        }
        out
    }
}

/// Stateful DLMS/COSEM decoder
pub struct Dissector {
    config: DissectorConfig,
    registry: Arc<dyn CosemLookup>,
    reassembler: Reassembler,
}

impl fmt::Debug for Dissector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dissector")
            .field("config", &self.config)
            .field("reassembler", &self.reassembler)
            .finish_non_exhaustive()
    }
}

impl Dissector {
    pub fn builder() -> DissectorBuilder {
        DissectorBuilder::new()
    }

    pub fn config(&self) -> &DissectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &dyn CosemLookup {
        self.registry.as_ref()
    }

    /// Decode one captured buffer of `conversation`
    ///
    /// `frame` must increase across calls; it orders reassembly fragments
    /// and measures idle time for eviction.
    pub fn dissect(&self, conversation: ConversationId, frame: FrameNumber, buffer: &[u8]) -> Dissection {
        if self.config.auto_evict {
            self.reassembler.evict_idle(frame);
        }

        let encapsulation = buffer
            .first()
            .map_or(Encapsulation::Apdu, |&b| Encapsulation::detect(b));
        log::debug!(
            "frame {} of conversation {}: {} bytes, {}",
            frame,
            conversation.0,
            buffer.len(),
            encapsulation
        );

        let mut ctx = DecodeContext::new(self.registry.as_ref(), &self.reassembler, conversation, frame);
        let mut tree = Vec::new();
        let result = self.dispatch(encapsulation, buffer, &mut ctx, &mut tree);

        let error = match result {
            Ok(()) => None,
            Err(err) => {
                log::debug!("frame {}: decoding stopped: {}", frame, err);
                ctx.annotate(Annotation::malformed(err.to_string(), error_span(&err, buffer.len())));
                Some(err)
            }
        };
        let (summary, annotations) = ctx.into_parts();
        Dissection {
            frame,
            encapsulation,
            summary,
            tree,
            annotations,
            error,
        }
    }

    fn dispatch(
        &self,
        encapsulation: Encapsulation,
        buffer: &[u8],
        ctx: &mut DecodeContext<'_>,
        tree: &mut Vec<Field>,
    ) -> DlmsResult<()> {
        match encapsulation {
            Encapsulation::Hdlc => link::dissect_hdlc(buffer, ctx, tree, self.config.verify_check_sequences),
            Encapsulation::Iec432 => link::dissect_iec_432(buffer, ctx, tree),
            Encapsulation::Wrapper => link::dissect_wrapper(buffer, ctx, tree),
            Encapsulation::Apdu => decode_apdu(buffer, 0, ctx, tree),
        }
    }

    /// Drop reassembly streams idle for longer than the configured horizon
    pub fn evict_idle(&self, current_frame: FrameNumber) -> usize {
        self.reassembler.evict_idle(current_frame)
    }

    /// Forget every partial message of `conversation`
    pub fn reset_conversation(&self, conversation: ConversationId) {
        self.reassembler.discard_conversation(conversation);
    }

    /// Number of reassembly streams in progress
    pub fn pending_reassemblies(&self) -> usize {
        self.reassembler.len()
    }
}

/// Byte range named by a framing error, clamped to the buffer
fn error_span(err: &DlmsError, len: usize) -> Range<usize> {
    let start = match err {
        DlmsError::Truncated { offset, .. }
        | DlmsError::UnknownDataTag { offset, .. }
        | DlmsError::InvalidLength { offset, .. } => *offset,
        DlmsError::CompactArrayOverrun { element_start, .. } => *element_start,
        _ => 0,
    };
    let start = start.min(len);
    start..len
}

/// Builder for [`Dissector`]
///
/// Without a registry the standard COSEM classes and instance names are
/// used.
#[derive(Default)]
pub struct DissectorBuilder {
    config: DissectorConfig,
    registry: Option<Arc<dyn CosemLookup>>,
}

impl DissectorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: DissectorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(mut self, registry: Arc<dyn CosemLookup>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// # Errors
    ///
    /// `Config` when the configuration does not validate.
    pub fn build(self) -> DlmsResult<Dissector> {
        self.config.validate()?;
        let registry = self
            .registry
            .unwrap_or_else(|| Arc::new(CosemRegistry::standard()));
        Ok(Dissector {
            reassembler: Reassembler::new(self.config.reassembly.clone()),
            config: self.config,
            registry,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlms_core::{AnnotationKind, ObisCode};

    const GET_REQUEST: [u8; 13] = [
        0xC0, 0x01, 0xC1, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02, 0x00,
    ];

    #[test]
    fn test_detect() {
        assert_eq!(Encapsulation::detect(0x7E), Encapsulation::Hdlc);
        assert_eq!(Encapsulation::detect(0x90), Encapsulation::Iec432);
        assert_eq!(Encapsulation::detect(0x00), Encapsulation::Wrapper);
        assert_eq!(Encapsulation::detect(0xC0), Encapsulation::Apdu);
        assert_eq!(Encapsulation::detect(0x61), Encapsulation::Apdu);
    }

    #[test]
    fn test_bare_apdu() {
        let dissector = Dissector::builder().build().unwrap();
        let dissection = dissector.dissect(ConversationId(1), 1, &GET_REQUEST);
        assert!(dissection.is_complete());
        assert_eq!(dissection.encapsulation, Encapsulation::Apdu);
        assert_eq!(dissection.summary, "Get-Request-Normal register.value 1.0.1.8.0.255");
        assert_eq!(dissection.tree.len(), 1);
        assert!(dissection.render().starts_with("Frame 1: Get-Request-Normal"));
    }

    #[test]
    fn test_fatal_error_keeps_partial_tree() {
        let dissector = Dissector::builder().build().unwrap();
        let dissection = dissector.dissect(ConversationId(1), 1, &GET_REQUEST[..8]);
        assert!(matches!(dissection.error, Some(DlmsError::Truncated { .. })));
        assert_eq!(dissection.tree.len(), 1);
        let malformed = dissection.annotations.last().unwrap();
        assert_eq!(malformed.kind, AnnotationKind::Malformed);
        assert!(malformed.span.end <= 8);
    }

    #[test]
    fn test_empty_buffer() {
        let dissector = Dissector::builder().build().unwrap();
        let dissection = dissector.dissect(ConversationId(1), 1, &[]);
        assert_eq!(dissection.encapsulation, Encapsulation::Apdu);
        assert!(dissection.error.is_some());
        assert_eq!(dissection.annotations[0].span, 0..0);
    }

    #[test]
    fn test_custom_registry() {
        let mut registry = CosemRegistry::standard();
        registry.register_instance(ObisCode::new(1, 0, 1, 8, 0, 255), "Active energy import");
        let dissector = Dissector::builder().registry(Arc::new(registry)).build().unwrap();
        let dissection = dissector.dissect(ConversationId(1), 1, &GET_REQUEST);
        assert!(dissection.summary.contains("Active energy import"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = DissectorConfig::default();
        config.reassembly.shards = 0;
        assert!(matches!(
            Dissector::builder().config(config).build(),
            Err(DlmsError::Config(_))
        ));
    }

    #[test]
    fn test_json_output() {
        let dissector = Dissector::builder().build().unwrap();
        let dissection = dissector.dissect(ConversationId(1), 3, &[0xC0, 0x01]);
        let json = serde_json::to_value(&dissection).unwrap();
        assert_eq!(json["frame"], 3);
        assert_eq!(json["encapsulation"], "apdu");
        assert!(json["error"].as_str().unwrap().starts_with("Buffer exhausted"));
        assert_eq!(json["tree"][0]["name"], "APDU");
    }

    #[test]
    fn test_dissector_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Dissector>();
    }
}
