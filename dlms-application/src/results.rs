//! Result and error enumerations carried by responses

use crate::choice::named_values;
use crate::context::DecodeContext;
use crate::pdu::decode_named_field;
use dlms_asn1::AxdrDecoder;
use dlms_core::{Annotation, DlmsResult, Field};

named_values! {
    /// Data-Access-Result
    pub enum DataAccessResult {
        Success = 0 => "success",
        HardwareFault = 1 => "hardware-fault",
        TemporaryFailure = 2 => "temporary-failure",
        ReadWriteDenied = 3 => "read-write-denied",
        ObjectUndefined = 4 => "object-undefined",
        ObjectClassInconsistent = 9 => "object-class-inconsistent",
        ObjectUnavailable = 11 => "object-unavailable",
        TypeUnmatched = 12 => "type-unmatched",
        ScopeOfAccessViolated = 13 => "scope-of-access-violated",
        DataBlockUnavailable = 14 => "data-block-unavailable",
        LongGetAborted = 15 => "long-get-aborted",
        NoLongGetInProgress = 16 => "no-long-get-in-progress",
        LongSetAborted = 17 => "long-set-aborted",
        NoLongSetInProgress = 18 => "no-long-set-in-progress",
        DataBlockNumberInvalid = 19 => "data-block-number-invalid",
        OtherReason = 250 => "other-reason",
    }
}

named_values! {
    /// Action-Result
    pub enum ActionResult {
        Success = 0 => "success",
        HardwareFault = 1 => "hardware-fault",
        TemporaryFailure = 2 => "temporary-failure",
        ReadWriteDenied = 3 => "read-write-denied",
        ObjectUndefined = 4 => "object-undefined",
        ObjectClassInconsistent = 9 => "object-class-inconsistent",
        ObjectUnavailable = 11 => "object-unavailable",
        TypeUnmatched = 12 => "type-unmatched",
        ScopeOfAccessViolated = 13 => "scope-of-access-violated",
        DataBlockUnavailable = 14 => "data-block-unavailable",
        LongActionAborted = 15 => "long-action-aborted",
        NoLongActionInProgress = 16 => "no-long-action-in-progress",
        OtherReason = 250 => "other-reason",
    }
}

named_values! {
    /// State-error of an Exception-Response
    pub enum StateError {
        ServiceNotAllowed = 1 => "service-not-allowed",
        ServiceUnknown = 2 => "service-unknown",
    }
}

named_values! {
    /// Service-error of an Exception-Response
    pub enum ServiceError {
        OperationNotPossible = 1 => "operation-not-possible",
        ServiceNotSupported = 2 => "service-not-supported",
        OtherReason = 3 => "other-reason",
    }
}

/// Decode a Data-Access-Result
///
/// A non-success result is appended to the summary and annotated.
pub(crate) fn decode_data_access_result(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<u8> {
    let start = decoder.position();
    let (value, result) = decode_named_field::<DataAccessResult>(decoder, "Data Access Result", fields)?;
    if value != 0 {
        report_failure(ctx, "Data access", result.map(DataAccessResult::name), start);
    }
    Ok(value)
}

/// Decode an Action-Result, reported like a Data-Access-Result
pub(crate) fn decode_action_result(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<u8> {
    let start = decoder.position();
    let (value, result) = decode_named_field::<ActionResult>(decoder, "Action Result", fields)?;
    if value != 0 {
        report_failure(ctx, "Action", result.map(ActionResult::name), start);
    }
    Ok(value)
}

fn report_failure(ctx: &mut DecodeContext<'_>, what: &str, name: Option<&str>, offset: usize) {
    let name = name.unwrap_or("unknown result");
    ctx.append_summary(&format!(" ({})", name));
    ctx.annotate(Annotation::no_success(
        format!("{} failed: {}", what, name),
        offset..offset + 1,
    ));
}
