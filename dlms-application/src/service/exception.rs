//! Exception-Response

use crate::context::DecodeContext;
use crate::pdu::decode_named_field;
use crate::results::{ServiceError, StateError};
use dlms_asn1::AxdrDecoder;
use dlms_core::{Annotation, DlmsResult, Field};

/// State-error and service-error, both reported as no-success
pub fn decode_exception_response(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let start = decoder.position();
    let (_, state) = decode_named_field::<StateError>(decoder, "State Error", fields)?;
    ctx.annotate(Annotation::no_success(
        format!("State error: {}", state.map_or("unknown", StateError::name)),
        start..start + 1,
    ));

    let start = decoder.position();
    let (_, service) = decode_named_field::<ServiceError>(decoder, "Service Error", fields)?;
    ctx.annotate(Annotation::no_success(
        format!("Service error: {}", service.map_or("unknown", ServiceError::name)),
        start..start + 1,
    ));
    Ok(())
}
