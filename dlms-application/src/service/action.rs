//! Action-Request and Action-Response

use super::get::decode_get_data_result;
use super::unsupported_choice;
use crate::choice::{named_values, title_case};
use crate::context::DecodeContext;
use crate::cosem::decode_method_descriptor;
use crate::pdu::{InvokeIdAndPriority, decode_named_field, decode_u8_field};
use crate::results::decode_action_result;
use dlms_asn1::AxdrDecoder;
use dlms_core::{DlmsResult, Field};

named_values! {
    pub enum ActionRequestChoice {
        Normal = 1 => "action-request-normal",
        NextPblock = 2 => "action-request-next-pblock",
        WithList = 3 => "action-request-with-list",
        WithFirstPblock = 4 => "action-request-with-first-pblock",
        WithListAndFirstPblock = 5 => "action-request-with-list-and-first-pblock",
        WithPblock = 6 => "action-request-with-pblock",
    }
}

named_values! {
    pub enum ActionResponseChoice {
        Normal = 1 => "action-response-normal",
        WithPblock = 2 => "action-response-with-pblock",
        WithList = 3 => "action-response-with-list",
        NextPblock = 4 => "action-response-next-pblock",
    }
}

/// Action-Request
///
/// Only the normal choice is decoded: method descriptor, then an
/// optional method invocation parameters `Data` behind a presence flag.
pub fn decode_action_request(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<ActionRequestChoice>(decoder, "Action Request", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(ActionRequestChoice::Normal) => {
            ctx.set_summary(title_case(ActionRequestChoice::Normal.name()));
            decode_method_descriptor(decoder, ctx, fields)?;
            if decode_u8_field(decoder, "Method Invocation Parameters", fields)? != 0 {
                decoder.decode_data_into("Data", fields)?;
            }
        }
        _ => unsupported_choice(ctx, "Action-Request", choice, choice_offset),
    }
    Ok(())
}

/// Action-Response
///
/// The normal choice carries the Action-Result and, when bytes remain, an
/// optional Get-Data-Result with the return parameters.
pub fn decode_action_response(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<ActionResponseChoice>(decoder, "Action Response", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(ActionResponseChoice::Normal) => {
            ctx.set_summary(title_case(ActionResponseChoice::Normal.name()));
            decode_action_result(decoder, ctx, fields)?;
            if decoder.has_remaining() && decode_u8_field(decoder, "Return Parameters", fields)? != 0 {
                decode_get_data_result(decoder, ctx, fields)?;
            }
        }
        _ => unsupported_choice(ctx, "Action-Response", choice, choice_offset),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::service::testing::decode;
    use dlms_core::{AnnotationKind, FieldValue};

    #[test]
    fn test_action_request_without_parameters() {
        // disconnect_control.remote_disconnect of 0.0.96.3.10.255
        let bytes = [
            0xC3, 0x01, 0xC1, 0x00, 0x46, 0x00, 0x00, 0x60, 0x03, 0x0A, 0xFF, 0x01, 0x00,
        ];
        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        assert_eq!(
            decoded.summary,
            "Action-Request-Normal disconnect_control.remote_disconnect 0.0.96.3.10.255"
        );
        assert_eq!(decoded.apdu.span, 0..13);
        assert!(decoded.apdu.find("Data").is_none());
    }

    #[test]
    fn test_action_request_with_parameters() {
        let bytes = [
            0xC3, 0x01, 0x81, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0xFF, 0x06, 0x01, 0x10,
            0x00, 0x3C,
        ];
        let decoded = decode(&bytes);
        assert_eq!(decoded.summary, "Action-Request-Normal clock.shift_time 0.0.1.0.0.255");
        let data = decoded.apdu.find("Data").unwrap();
        assert_eq!(data.span, 13..16);
        assert_eq!(data.value, Some(FieldValue::Signed(60)));
    }

    #[test]
    fn test_action_response() {
        let decoded = decode(&[0xC7, 0x01, 0xC1, 0x00]);
        assert!(decoded.result.is_ok());
        assert_eq!(decoded.summary, "Action-Response-Normal");

        let decoded = decode(&[0xC7, 0x01, 0xC1, 0x0F]);
        assert_eq!(decoded.summary, "Action-Response-Normal (long-action-aborted)");
        assert_eq!(decoded.annotations[0].kind, AnnotationKind::NoSuccess);

        // success with return parameters
        let decoded = decode(&[0xC7, 0x01, 0xC1, 0x00, 0x01, 0x00, 0x11, 0x05]);
        assert_eq!(decoded.apdu.find("Data").unwrap().value, Some(FieldValue::Unsigned(5)));
    }

    #[test]
    fn test_action_request_pblock_is_unsupported() {
        let decoded = decode(&[0xC3, 0x02, 0xC1, 0x00, 0x00, 0x00, 0x01]);
        assert_eq!(decoded.summary, "Action-Request");
        assert_eq!(decoded.annotations[0].kind, AnnotationKind::UnsupportedChoice);
    }
}
