//! COSEM attribute, method and selective access descriptors
//!
//! ```text
//! Cosem-Attribute-Descriptor ::= SEQUENCE {
//!     class-id      Cosem-Class-Id,        -- u16
//!     instance-id   Cosem-Object-Instance-Id, -- 6 byte OBIS code
//!     attribute-id  Cosem-Object-Attribute-Id -- i8
//! }
//! ```
//!
//! The method descriptor has the same layout with a method id. Names are
//! resolved through the [`CosemLookup`](super::CosemLookup) of the decode
//! context; a miss only changes the text and never stops decoding.

use crate::context::DecodeContext;
use crate::pdu::{decode_node, decode_u8_field};
use dlms_asn1::AxdrDecoder;
use dlms_core::{Annotation, DlmsResult, Field, ObisCode};

/// Which member table an id refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorKind {
    Attribute,
    Method,
}

impl DescriptorKind {
    fn node_name(self) -> &'static str {
        match self {
            DescriptorKind::Attribute => "COSEM Attribute Descriptor",
            DescriptorKind::Method => "COSEM Method Descriptor",
        }
    }

    fn id_name(self) -> &'static str {
        match self {
            DescriptorKind::Attribute => "Attribute Id",
            DescriptorKind::Method => "Method Id",
        }
    }
}

/// A decoded attribute or method reference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CosemDescriptor {
    pub kind: DescriptorKind,
    pub class_id: u16,
    pub instance: ObisCode,
    /// Attribute or method id
    pub member_id: u8,
}

impl CosemDescriptor {
    pub const LENGTH: usize = 9;
}

pub fn decode_attribute_descriptor(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<CosemDescriptor> {
    decode_descriptor(decoder, ctx, fields, DescriptorKind::Attribute)
}

pub fn decode_method_descriptor(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<CosemDescriptor> {
    decode_descriptor(decoder, ctx, fields, DescriptorKind::Method)
}

/// Always consumes [`CosemDescriptor::LENGTH`] bytes, known class or not
fn decode_descriptor(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
    kind: DescriptorKind,
) -> DlmsResult<CosemDescriptor> {
    let start = decoder.position();
    let bytes: [u8; CosemDescriptor::LENGTH] = decoder.read_array()?;
    let class_id = u16::from_be_bytes([bytes[0], bytes[1]]);
    let instance = ObisCode::new(bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7]);
    let member_id = bytes[8];

    let registry = ctx.registry();
    let class = registry.class(class_id);
    let member_name = class.and_then(|c| match kind {
        DescriptorKind::Attribute => c.attribute_name(member_id),
        DescriptorKind::Method => c.method_name(member_id),
    });
    let instance_name = registry.instance_name(&instance);

    let mut summary = match class {
        Some(c) => format!(" {}", c.name()),
        None => format!(" {}", class_id),
    };
    match member_name {
        Some(name) => summary.push_str(&format!(".{}", name)),
        None => summary.push_str(&format!(".{}", member_id)),
    }
    match instance_name {
        Some(name) => summary.push_str(&format!(" {}", name)),
        None => summary.push_str(&format!(" {}", instance)),
    }
    ctx.append_summary(&summary);

    let class_span = start..start + 2;
    let class_field = match class {
        Some(c) => Field::new("Class Id", class_span.clone())
            .with_value(class_id)
            .with_text(format!("{} ({})", c.name(), class_id)),
        None => {
            ctx.annotate(Annotation::not_implemented(
                format!("COSEM class {} is not implemented", class_id),
                class_span.clone(),
            ));
            Field::new("Class Id", class_span)
                .with_value(class_id)
                .with_text(format!("Unknown ({})", class_id))
        }
    };

    let instance_field = Field::new("Instance Id", start + 2..start + 8)
        .with_value(&bytes[2..8])
        .with_text(format!("{} ({})", instance_name.unwrap_or("Unknown"), instance));

    let member_field = Field::new(kind.id_name(), start + 8..start + 9)
        .with_value(member_id)
        .with_text(format!("{} ({})", member_name.unwrap_or("Unknown"), member_id));

    fields.push(
        Field::new(kind.node_name(), start..decoder.position()).with_children(vec![
            class_field,
            instance_field,
            member_field,
        ]),
    );

    Ok(CosemDescriptor {
        kind,
        class_id,
        instance,
        member_id,
    })
}

/// Decode a Selective-Access-Descriptor
///
/// A zero access selector means no access parameters follow. Returns the
/// selector.
pub fn decode_selective_access_descriptor(
    decoder: &mut AxdrDecoder<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<u8> {
    decode_node(decoder, "Selective Access Descriptor", fields, |decoder, children| {
        let selector = decode_u8_field(decoder, "Access Selector", children)?;
        if selector != 0 {
            decoder.decode_data_into("Data", children)?;
        }
        Ok(selector)
    })
}
