//! Get-Request and Get-Response

use super::unsupported_choice;
use crate::choice::{named_values, title_case};
use crate::context::DecodeContext;
use crate::cosem::{decode_attribute_descriptor, decode_selective_access_descriptor};
use crate::datablock::decode_datablock_g;
use crate::pdu::{InvokeIdAndPriority, decode_named_field, decode_u32_field};
use crate::results::decode_data_access_result;
use dlms_asn1::AxdrDecoder;
use dlms_core::{Annotation, DlmsResult, Field};

named_values! {
    pub enum GetRequestChoice {
        Normal = 1 => "get-request-normal",
        Next = 2 => "get-request-next",
        WithList = 3 => "get-request-with-list",
    }
}

named_values! {
    pub enum GetResponseChoice {
        Normal = 1 => "get-response-normal",
        WithDatablock = 2 => "get-response-with-datablock",
        WithList = 3 => "get-response-with-list",
    }
}

pub fn decode_get_request(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<GetRequestChoice>(decoder, "Get Request", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(GetRequestChoice::Normal) => {
            ctx.set_summary(title_case(GetRequestChoice::Normal.name()));
            decode_attribute_descriptor(decoder, ctx, fields)?;
            decode_selective_access_descriptor(decoder, fields)?;
        }
        Some(GetRequestChoice::Next) => {
            let block_number = decode_u32_field(decoder, "Block Number", fields)?;
            ctx.set_summary(format!("Get-Request-Next (block {})", block_number));
        }
        _ => unsupported_choice(ctx, "Get-Request", choice, choice_offset),
    }
    Ok(())
}

pub fn decode_get_response(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<GetResponseChoice>(decoder, "Get Response", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(GetResponseChoice::Normal) => {
            ctx.set_summary(title_case(GetResponseChoice::Normal.name()));
            decode_get_data_result(decoder, ctx, fields)?;
        }
        Some(GetResponseChoice::WithDatablock) => {
            ctx.set_summary(title_case(GetResponseChoice::WithDatablock.name()));
            decode_datablock_g(decoder, ctx, fields)?;
        }
        _ => unsupported_choice(ctx, "Get-Response", choice, choice_offset),
    }
    Ok(())
}

/// Get-Data-Result: `0` data follows, `1` a Data-Access-Result follows
pub(crate) fn decode_get_data_result(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let start = decoder.position();
    let result = decoder.decode_u8()?;
    match result {
        0 => {
            decoder.decode_data_into("Data", fields)?;
        }
        1 => {
            decode_data_access_result(decoder, ctx, fields)?;
        }
        other => {
            fields.push(Field::new("Get Data Result", start..start + 1).with_value(other));
            ctx.annotate(Annotation::unsupported_choice(
                format!("Get-Data-Result choice {} is not decoded", other),
                start..start + 1,
            ));
        }
    }
    Ok(())
}
