//! Block transfer datablocks
//!
//! Long Get and Set payloads are split into numbered datablocks. Two
//! encodings exist:
//!
//! ```text
//! DataBlock-G  ::= last-block BOOLEAN, block-number u32,
//!                  result CHOICE { raw-data [0] OCTET STRING,
//!                                  data-access-result [1] ENUMERATED }
//! DataBlock-SA ::= last-block BOOLEAN, block-number u32, raw-data OCTET STRING
//! ```
//!
//! The raw data of both feed the datablock stream of the conversation.
//! Block number 1 starts a new transfer and drops anything left over from
//! an earlier one. When the last block arrives the accumulated bytes are
//! decoded as one `Data` value.

use crate::context::DecodeContext;
use crate::pdu::{decode_u32_field, decode_u8_field};
use crate::results::decode_data_access_result;
use dlms_asn1::AxdrDecoder;
use dlms_core::{Annotation, DlmsError, DlmsResult, Field, FragmentStatus, Reassembled, StreamKey};
use std::ops::Range;

/// Header of one datablock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Datablock {
    pub last_block: bool,
    pub block_number: u32,
}

/// Decode a DataBlock-G
///
/// The "Datablock G" node goes to `fields`; reassembly output is appended
/// after it.
pub fn decode_datablock_g(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<Datablock> {
    decode_datablock(decoder, ctx, fields, "Datablock G", true)
}

/// Decode a DataBlock-SA
pub fn decode_datablock_sa(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<Datablock> {
    decode_datablock(decoder, ctx, fields, "Datablock SA", false)
}

fn decode_datablock(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
    name: &str,
    with_result: bool,
) -> DlmsResult<Datablock> {
    let start = decoder.position();
    let mut children = Vec::new();
    let mut reassembly = Vec::new();
    let result = decode_datablock_body(decoder, ctx, &mut children, &mut reassembly, with_result);
    fields.push(Field::new(name, start..decoder.position()).with_children(children));
    fields.append(&mut reassembly);
    result
}

fn decode_datablock_body(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    children: &mut Vec<Field>,
    reassembly: &mut Vec<Field>,
    with_result: bool,
) -> DlmsResult<Datablock> {
    let last_block_start = decoder.position();
    let last_block = decoder.decode_u8()? != 0;
    children.push(Field::new("Last Block", last_block_start..decoder.position()).with_value(last_block));
    let block_number = decode_u32_field(decoder, "Block Number", children)?;
    let block = Datablock {
        last_block,
        block_number,
    };

    if with_result {
        match decode_u8_field(decoder, "Result", children)? {
            0 => {}
            1 => {
                decode_data_access_result(decoder, ctx, children)?;
                return Ok(block);
            }
            other => {
                return Err(DlmsError::InvalidData(format!(
                    "Invalid DataBlock-G result choice {}",
                    other
                )));
            }
        }
    }

    decode_raw_data(decoder, ctx, block, children, reassembly)?;
    Ok(block)
}

fn decode_raw_data(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    block: Datablock,
    children: &mut Vec<Field>,
    reassembly: &mut Vec<Field>,
) -> DlmsResult<()> {
    ctx.append_summary(&format!(" (block {})", block.block_number));
    if block.last_block {
        ctx.append_summary(" (last block)");
    }

    let start = decoder.position();
    let raw_data = decoder.decode_octet_string()?;
    let data_span = decoder.position() - raw_data.len()..decoder.position();
    children.push(
        Field::new("Raw Data", start..decoder.position())
            .with_value(raw_data)
            .with_text(format!("length {}", raw_data.len())),
    );

    let key = StreamKey::datablock(ctx.conversation());
    if block.block_number == 1 && ctx.reassembler().discard(key) {
        log::debug!(
            "Block 1 restarts the datablock transfer of conversation {}",
            ctx.conversation().0
        );
    }

    match ctx
        .reassembler()
        .add_fragment(key, ctx.frame(), raw_data, !block.last_block)
    {
        Ok(FragmentStatus::Pending {
            fragment_index,
            accumulated,
        }) => {
            log::debug!(
                "Datablock {} is fragment {} ({} bytes so far)",
                block.block_number,
                fragment_index,
                accumulated
            );
        }
        Ok(FragmentStatus::Complete(reassembled)) => {
            decode_reassembled(decoder.buffer(), data_span, &reassembled, ctx, reassembly);
        }
        Err(err) => ctx.annotate(Annotation::malformed(err.to_string(), data_span)),
    }
    Ok(())
}

/// Decode the completed transfer as one `Data` value
///
/// A transfer of one block is decoded in place, so its spans point into
/// the current buffer. Otherwise spans are relative to the reassembled
/// bytes and the subtree sits under the "Reassembled" node. Errors in the
/// reassembled data are annotated, the enclosing APDU is unaffected.
fn decode_reassembled(
    buffer: &[u8],
    data_span: Range<usize>,
    reassembled: &Reassembled,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) {
    let mut data = Vec::new();
    let result = if reassembled.fragment_count() == 1 {
        let mut inner = AxdrDecoder::at(&buffer[..data_span.end], data_span.start);
        inner.decode_data_into("Data", &mut data)
    } else {
        AxdrDecoder::new(&reassembled.data).decode_data_into("Data", &mut data)
    };

    let node_span = if reassembled.fragment_count() == 1 {
        data_span.clone()
    } else {
        0..reassembled.len()
    };
    let data_node = Field::new("Reassembled Data", node_span).with_children(data);

    if let Err(err) = result {
        ctx.annotate(Annotation::malformed(
            format!("Reassembled data: {}", err),
            data_span.clone(),
        ));
    }

    if reassembled.fragment_count() == 1 {
        fields.push(data_node);
    } else {
        let mut node = reassembled.to_field(data_span);
        node.push(data_node);
        fields.push(node);
    }
}
