//! Per-call decoding state

use crate::cosem::CosemLookup;
use dlms_core::{Annotation, ConversationId, FrameNumber, Reassembler};

/// State threaded through the decoders of one captured frame
///
/// Holds the collaborators (class registry, reassembly table) and collects
/// the frame summary and the annotations while the tree is built.
pub struct DecodeContext<'a> {
    registry: &'a dyn CosemLookup,
    reassembler: &'a Reassembler,
    conversation: ConversationId,
    frame: FrameNumber,
    summary: String,
    annotations: Vec<Annotation>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(
        registry: &'a dyn CosemLookup,
        reassembler: &'a Reassembler,
        conversation: ConversationId,
        frame: FrameNumber,
    ) -> Self {
        Self {
            registry,
            reassembler,
            conversation,
            frame,
            summary: String::new(),
            annotations: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a dyn CosemLookup {
        self.registry
    }

    pub fn reassembler(&self) -> &'a Reassembler {
        self.reassembler
    }

    pub fn conversation(&self) -> ConversationId {
        self.conversation
    }

    pub fn frame(&self) -> FrameNumber {
        self.frame
    }

    /// Replace the summary line
    pub fn set_summary(&mut self, summary: impl Into<String>) {
        self.summary = summary.into();
    }

    /// Append to the summary line
    pub fn append_summary(&mut self, text: &str) {
        self.summary.push_str(text);
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn annotate(&mut self, annotation: Annotation) {
        log::debug!("frame {}: {}", self.frame, annotation);
        self.annotations.push(annotation);
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    /// Summary and annotations collected so far
    pub fn into_parts(self) -> (String, Vec<Annotation>) {
        (self.summary, self.annotations)
    }
}
