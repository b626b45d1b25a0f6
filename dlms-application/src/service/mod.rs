//! Service APDU decoders
//!
//! One module per service family:
//! - **get**: Get-Request / Get-Response
//! - **set**: Set-Request / Set-Response
//! - **action**: Action-Request / Action-Response
//! - **event**: Event-Notification-Request and Data-Notification
//! - **access**: Access-Request / Access-Response
//! - **exception**: Exception-Response
//!
//! The request/response services start with a one byte inner choice and
//! an Invoke-Id-And-Priority. Inner choices that are valid but not decoded
//! leave the outer kind as summary and are annotated as unsupported.

pub mod access;
pub mod action;
pub mod event;
pub mod exception;
pub mod get;
pub mod set;

use crate::context::DecodeContext;
use dlms_core::Annotation;

pub(crate) fn unsupported_choice(ctx: &mut DecodeContext<'_>, apdu: &str, choice: u8, offset: usize) {
    ctx.annotate(Annotation::unsupported_choice(
        format!("{} choice {} is not decoded", apdu, choice),
        offset..offset + 1,
    ));
}

#[cfg(test)]
pub(crate) mod testing {
    use crate::context::DecodeContext;
    use crate::cosem::CosemRegistry;
    use crate::pdu::decode_apdu;
    use dlms_core::{Annotation, ConversationId, DlmsResult, Field, Reassembler};

    pub(crate) struct Decoded {
        pub result: DlmsResult<()>,
        pub apdu: Field,
        pub summary: String,
        pub annotations: Vec<Annotation>,
    }

    pub(crate) fn decode(bytes: &[u8]) -> Decoded {
        decode_with(&Reassembler::default(), 1, bytes)
    }

    pub(crate) fn decode_with(reassembler: &Reassembler, frame: u64, bytes: &[u8]) -> Decoded {
        let registry = CosemRegistry::standard();
        let mut ctx = DecodeContext::new(&registry, reassembler, ConversationId(1), frame);
        let mut tree = Vec::new();
        let result = decode_apdu(bytes, 0, &mut ctx, &mut tree);
        let (summary, annotations) = ctx.into_parts();
        Decoded {
            result,
            apdu: tree.remove(0),
            summary,
            annotations,
        }
    }
}
