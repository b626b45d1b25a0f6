//! Set-Request and Set-Response

use super::unsupported_choice;
use crate::choice::{named_values, title_case};
use crate::context::DecodeContext;
use crate::cosem::{decode_attribute_descriptor, decode_selective_access_descriptor};
use crate::datablock::decode_datablock_sa;
use crate::pdu::{InvokeIdAndPriority, decode_named_field, decode_u32_field};
use crate::results::decode_data_access_result;
use dlms_asn1::AxdrDecoder;
use dlms_core::{DlmsResult, Field};

named_values! {
    pub enum SetRequestChoice {
        Normal = 1 => "set-request-normal",
        WithFirstDatablock = 2 => "set-request-with-first-datablock",
        WithDatablock = 3 => "set-request-with-datablock",
        WithList = 4 => "set-request-with-list",
        WithListAndFirstDatablock = 5 => "set-request-with-list-and-first-datablock",
    }
}

named_values! {
    pub enum SetResponseChoice {
        Normal = 1 => "set-response-normal",
        Datablock = 2 => "set-response-datablock",
        LastDatablock = 3 => "set-response-last-datablock",
        LastDatablockWithList = 4 => "set-response-last-datablock-with-list",
        WithList = 5 => "set-response-with-list",
    }
}

pub fn decode_set_request(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<SetRequestChoice>(decoder, "Set Request", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(SetRequestChoice::Normal) => {
            ctx.set_summary(title_case(SetRequestChoice::Normal.name()));
            decode_attribute_descriptor(decoder, ctx, fields)?;
            decode_selective_access_descriptor(decoder, fields)?;
            decoder.decode_data_into("Data", fields)?;
        }
        Some(SetRequestChoice::WithFirstDatablock) => {
            ctx.set_summary(title_case(SetRequestChoice::WithFirstDatablock.name()));
            decode_attribute_descriptor(decoder, ctx, fields)?;
            decode_selective_access_descriptor(decoder, fields)?;
            decode_datablock_sa(decoder, ctx, fields)?;
        }
        Some(SetRequestChoice::WithDatablock) => {
            ctx.set_summary(title_case(SetRequestChoice::WithDatablock.name()));
            decode_datablock_sa(decoder, ctx, fields)?;
        }
        _ => unsupported_choice(ctx, "Set-Request", choice, choice_offset),
    }
    Ok(())
}

pub fn decode_set_response(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let choice_offset = decoder.position();
    let (choice, named) = decode_named_field::<SetResponseChoice>(decoder, "Set Response", fields)?;
    InvokeIdAndPriority::decode(decoder, fields)?;

    match named {
        Some(SetResponseChoice::Normal) => {
            ctx.set_summary(title_case(SetResponseChoice::Normal.name()));
            decode_data_access_result(decoder, ctx, fields)?;
        }
        Some(SetResponseChoice::Datablock) => {
            ctx.set_summary(title_case(SetResponseChoice::Datablock.name()));
            let block_number = decode_u32_field(decoder, "Block Number", fields)?;
            ctx.append_summary(&format!(" (block {})", block_number));
        }
        Some(SetResponseChoice::LastDatablock) => {
            ctx.set_summary(title_case(SetResponseChoice::LastDatablock.name()));
            decode_data_access_result(decoder, ctx, fields)?;
            let block_number = decode_u32_field(decoder, "Block Number", fields)?;
            ctx.append_summary(&format!(" (block {})", block_number));
        }
        _ => unsupported_choice(ctx, "Set-Response", choice, choice_offset),
    }
    Ok(())
}
