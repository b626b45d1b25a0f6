//! APDU dispatch and the fields shared by the service decoders
//!
//! [`decode_apdu`] reads the outer APDU tag and hands the rest of the
//! buffer to the decoder of that APDU. Every decoder appends its fields in
//! wire order to the vector it is given; when one fails part way, the
//! fields decoded so far are kept and the error is returned to the caller.
//!
//! # Summary line
//!
//! Each decoded APDU leaves a one-line summary in the [`DecodeContext`],
//! e.g. `Get-Request-Normal register.value 1.0.1.8.0.255`. The outer kind
//! is written first and the service decoders refine it once they know the
//! inner choice, so an unimplemented choice leaves only the outer kind.

use crate::association;
use crate::choice::{NamedValue, describe, named_values};
use crate::context::DecodeContext;
use crate::service;
use dlms_asn1::AxdrDecoder;
use dlms_core::datatypes::CosemDateTime;
use dlms_core::{Annotation, DlmsResult, Field};

named_values! {
    /// Outer APDU choice
    pub enum ApduTag {
        DataNotification = 15 => "data-notification",
        Aarq = 96 => "aarq",
        Aare = 97 => "aare",
        Rlrq = 98 => "rlrq",
        Rlre = 99 => "rlre",
        GetRequest = 192 => "get-request",
        SetRequest = 193 => "set-request",
        EventNotificationRequest = 194 => "event-notification-request",
        ActionRequest = 195 => "action-request",
        GetResponse = 196 => "get-response",
        SetResponse = 197 => "set-response",
        ActionResponse = 199 => "action-response",
        ExceptionResponse = 216 => "exception-response",
        AccessRequest = 217 => "access-request",
        AccessResponse = 218 => "access-response",
    }
}

impl ApduTag {
    /// Summary text of the outer kind
    pub fn summary(self) -> String {
        match self {
            ApduTag::Aarq | ApduTag::Aare | ApduTag::Rlrq | ApduTag::Rlre => {
                self.name().to_ascii_uppercase()
            }
            other => crate::choice::title_case(other.name()),
        }
    }
}

/// Invoke-Id-And-Priority
///
/// ```text
/// bit 7    priority (0 normal, 1 high)
/// bit 6    service class (0 unconfirmed, 1 confirmed)
/// bits 0-3 invoke id
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InvokeIdAndPriority(u8);

impl InvokeIdAndPriority {
    pub fn new(value: u8) -> Self {
        Self(value)
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn invoke_id(self) -> u8 {
        self.0 & 0x0F
    }

    pub fn is_confirmed(self) -> bool {
        self.0 & 0x40 != 0
    }

    pub fn is_high_priority(self) -> bool {
        self.0 & 0x80 != 0
    }

    /// Decode one byte and append its field
    pub fn decode(decoder: &mut AxdrDecoder<'_>, fields: &mut Vec<Field>) -> DlmsResult<Self> {
        let start = decoder.position();
        let id = Self(decoder.decode_u8()?);
        fields.push(id.to_field(start));
        Ok(id)
    }

    fn to_field(self, start: usize) -> Field {
        let span = start..start + 1;
        Field::new("Invoke Id And Priority", span.clone())
            .with_value(self.0)
            .with_children(vec![
                Field::new("Invoke Id", span.clone()).with_value(self.invoke_id()),
                flag_field("Service Class", span.clone(), self.is_confirmed(), "unconfirmed", "confirmed"),
                flag_field("Priority", span, self.is_high_priority(), "normal", "high"),
            ])
    }
}

/// Long-Invoke-Id-And-Priority
///
/// ```text
/// bit 31    priority
/// bit 30    service class
/// bit 29    processing option (0 continue-on-error, 1 break-on-error)
/// bit 28    self-descriptive
/// bits 0-23 long invoke id
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LongInvokeIdAndPriority(u32);

impl LongInvokeIdAndPriority {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(self) -> u32 {
        self.0
    }

    pub fn invoke_id(self) -> u32 {
        self.0 & 0x00FF_FFFF
    }

    pub fn is_self_descriptive(self) -> bool {
        self.0 & 0x1000_0000 != 0
    }

    pub fn breaks_on_error(self) -> bool {
        self.0 & 0x2000_0000 != 0
    }

    pub fn is_confirmed(self) -> bool {
        self.0 & 0x4000_0000 != 0
    }

    pub fn is_high_priority(self) -> bool {
        self.0 & 0x8000_0000 != 0
    }

    pub fn decode(decoder: &mut AxdrDecoder<'_>, fields: &mut Vec<Field>) -> DlmsResult<Self> {
        let start = decoder.position();
        let id = Self(decoder.decode_u32()?);
        fields.push(id.to_field(start));
        Ok(id)
    }

    fn to_field(self, start: usize) -> Field {
        let span = start..start + 4;
        Field::new("Long Invoke Id And Priority", span.clone())
            .with_value(self.0)
            .with_children(vec![
                Field::new("Long Invoke Id", span.clone()).with_value(self.invoke_id()),
                flag_field(
                    "Self Descriptive",
                    span.clone(),
                    self.is_self_descriptive(),
                    "not-self-descriptive",
                    "self-descriptive",
                ),
                flag_field(
                    "Processing Option",
                    span.clone(),
                    self.breaks_on_error(),
                    "continue-on-error",
                    "break-on-error",
                ),
                flag_field("Service Class", span.clone(), self.is_confirmed(), "unconfirmed", "confirmed"),
                flag_field("Priority", span, self.is_high_priority(), "normal", "high"),
            ])
    }
}

fn flag_field(
    name: &str,
    span: std::ops::Range<usize>,
    set: bool,
    clear_label: &str,
    set_label: &str,
) -> Field {
    let (label, bit) = if set { (set_label, 1u8) } else { (clear_label, 0u8) };
    Field::new(name, span)
        .with_value(bit)
        .with_text(format!("{} ({})", label, bit))
}

/// Decode one APDU starting at `offset` and append an "APDU" node to `tree`
///
/// An unknown tag is annotated and nothing after it is consumed.
///
/// # Errors
///
/// The framing error that stopped decoding. The "APDU" node is still
/// appended with the fields decoded before it.
pub fn decode_apdu(
    buffer: &[u8],
    offset: usize,
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    let mut decoder = AxdrDecoder::at(buffer, offset);
    let tag = decoder.decode_u8()?;

    let mut children = Vec::new();
    let result = match ApduTag::from_u8(tag) {
        Some(apdu) => {
            log::debug!("APDU {} at offset {}", apdu, offset);
            ctx.set_summary(apdu.summary());
            decode_body(apdu, &mut decoder, ctx, &mut children)
        }
        None => {
            ctx.set_summary("Unknown APDU");
            ctx.annotate(Annotation::unknown_apdu(
                format!("Unknown APDU tag {}", tag),
                offset..offset + 1,
            ));
            Ok(())
        }
    };

    tree.push(
        Field::new("APDU", offset..decoder.position())
            .with_value(tag)
            .with_text(describe::<ApduTag>(tag))
            .with_children(children),
    );
    result
}

fn decode_body(
    apdu: ApduTag,
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    match apdu {
        ApduTag::DataNotification => service::event::decode_data_notification(decoder, fields),
        ApduTag::Aarq => association::decode_aarq(decoder, ctx, fields),
        ApduTag::Aare => association::decode_aare(decoder, ctx, fields),
        ApduTag::Rlrq | ApduTag::Rlre => Ok(()),
        ApduTag::GetRequest => service::get::decode_get_request(decoder, ctx, fields),
        ApduTag::SetRequest => service::set::decode_set_request(decoder, ctx, fields),
        ApduTag::EventNotificationRequest => {
            service::event::decode_event_notification_request(decoder, ctx, fields)
        }
        ApduTag::ActionRequest => service::action::decode_action_request(decoder, ctx, fields),
        ApduTag::GetResponse => service::get::decode_get_response(decoder, ctx, fields),
        ApduTag::SetResponse => service::set::decode_set_response(decoder, ctx, fields),
        ApduTag::ActionResponse => service::action::decode_action_response(decoder, ctx, fields),
        ApduTag::ExceptionResponse => service::exception::decode_exception_response(decoder, ctx, fields),
        ApduTag::AccessRequest => service::access::decode_access_request(decoder, ctx, fields),
        ApduTag::AccessResponse => service::access::decode_access_response(decoder, ctx, fields),
    }
}

/// Decode a `u8` and append it as `name`
pub(crate) fn decode_u8_field(
    decoder: &mut AxdrDecoder<'_>,
    name: &str,
    fields: &mut Vec<Field>,
) -> DlmsResult<u8> {
    let start = decoder.position();
    let value = decoder.decode_u8()?;
    fields.push(Field::new(name, start..decoder.position()).with_value(value));
    Ok(value)
}

/// Decode a big-endian `u32` and append it as `name`
pub(crate) fn decode_u32_field(
    decoder: &mut AxdrDecoder<'_>,
    name: &str,
    fields: &mut Vec<Field>,
) -> DlmsResult<u32> {
    let start = decoder.position();
    let value = decoder.decode_u32()?;
    fields.push(Field::new(name, start..decoder.position()).with_value(value));
    Ok(value)
}

/// Decode a one byte choice or enumeration and append it as `name`
///
/// Returns the raw value and, when it is defined, the named value.
pub(crate) fn decode_named_field<T: NamedValue>(
    decoder: &mut AxdrDecoder<'_>,
    name: &str,
    fields: &mut Vec<Field>,
) -> DlmsResult<(u8, Option<T>)> {
    let start = decoder.position();
    let value = decoder.decode_u8()?;
    fields.push(
        Field::new(name, start..decoder.position())
            .with_value(value)
            .with_text(describe::<T>(value)),
    );
    Ok((value, T::from_value(value)))
}

/// Decode into a node named `name`
///
/// The node is appended even when `body` fails, holding the children
/// decoded before the failure.
pub(crate) fn decode_node<'a, T>(
    decoder: &mut AxdrDecoder<'a>,
    name: &str,
    fields: &mut Vec<Field>,
    body: impl FnOnce(&mut AxdrDecoder<'a>, &mut Vec<Field>) -> DlmsResult<T>,
) -> DlmsResult<T> {
    let start = decoder.position();
    let mut children = Vec::new();
    let result = body(decoder, &mut children);
    fields.push(Field::new(name, start..decoder.position()).with_children(children));
    result
}

/// Length-prefixed octet string shown as a date-time when it looks like one
///
/// A zero length means the date-time is absent.
pub(crate) fn decode_date_time_field(
    decoder: &mut AxdrDecoder<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let start = decoder.position();
    let bytes = decoder.decode_octet_string()?;
    let field = Field::new("Date-Time", start..decoder.position());
    let field = if bytes.is_empty() {
        field.with_text("absent")
    } else {
        match CosemDateTime::recognize(bytes) {
            Some(date_time) => field.with_value(bytes).with_text(date_time.to_string()),
            None => field.with_value(bytes),
        }
    };
    fields.push(field);
    Ok(())
}

/// Sequence of `Data` values under a node named `name`
pub(crate) fn decode_list_of_data(
    decoder: &mut AxdrDecoder<'_>,
    name: &str,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    decode_node(decoder, name, fields, |decoder, children| {
        let count = decoder.decode_length()?;
        for i in 1..=count {
            decoder.decode_data_into(&format!("[{}]", i), children)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cosem::CosemRegistry;
    use dlms_core::{AnnotationKind, ConversationId, Reassembler};

    #[test]
    fn test_apdu_tag_summary() {
        assert_eq!(ApduTag::from_u8(0xC0), Some(ApduTag::GetRequest));
        assert_eq!(ApduTag::GetRequest.summary(), "Get-Request");
        assert_eq!(ApduTag::Aarq.summary(), "AARQ");
        assert_eq!(ApduTag::EventNotificationRequest.summary(), "Event-Notification-Request");
        assert_eq!(ApduTag::from_u8(0xC8), None);
    }

    #[test]
    fn test_invoke_id_and_priority_fields() {
        let bytes = [0xC1];
        let mut decoder = AxdrDecoder::new(&bytes);
        let mut fields = Vec::new();
        let id = InvokeIdAndPriority::decode(&mut decoder, &mut fields).unwrap();
        assert_eq!(id.invoke_id(), 1);
        assert!(id.is_confirmed());
        assert!(id.is_high_priority());

        let node = &fields[0];
        assert_eq!(node.name, "Invoke Id And Priority");
        assert_eq!(node.children.len(), 3);
        assert_eq!(node.find("Service Class").unwrap().display_text().unwrap(), "confirmed (1)");
        assert_eq!(node.find("Priority").unwrap().display_text().unwrap(), "high (1)");
    }

    #[test]
    fn test_long_invoke_id_and_priority_fields() {
        let bytes = [0x60, 0x00, 0x01, 0x02];
        let mut decoder = AxdrDecoder::new(&bytes);
        let mut fields = Vec::new();
        let id = LongInvokeIdAndPriority::decode(&mut decoder, &mut fields).unwrap();
        assert_eq!(id.invoke_id(), 0x0102);
        assert!(id.breaks_on_error());
        assert!(id.is_confirmed());
        assert!(!id.is_self_descriptive());
        assert!(!id.is_high_priority());
        assert_eq!(fields[0].span, 0..4);
        assert_eq!(
            fields[0].find("Processing Option").unwrap().display_text().unwrap(),
            "break-on-error (1)"
        );
    }

    #[test]
    fn test_date_time_field() {
        let mut bytes = vec![0x0C, 0x07, 0xE5, 0x06, 0x0F, 0x02, 0x0C, 0x1E, 0x00, 0x00, 0xFF, 0xFF, 0x80];
        bytes.push(0x00);
        let mut decoder = AxdrDecoder::new(&bytes);
        let mut fields = Vec::new();
        decode_date_time_field(&mut decoder, &mut fields).unwrap();
        decode_date_time_field(&mut decoder, &mut fields).unwrap();
        assert_eq!(fields[0].span, 0..13);
        assert!(fields[0].text.as_deref().unwrap().starts_with("2021/06/15 12:30:00"));
        assert_eq!(fields[1].text.as_deref(), Some("absent"));
    }

    #[test]
    fn test_unknown_apdu_consumes_only_tag() {
        let registry = CosemRegistry::standard();
        let reassembler = Reassembler::default();
        let mut ctx = DecodeContext::new(&registry, &reassembler, ConversationId(1), 1);
        let mut tree = Vec::new();
        decode_apdu(&[0x00, 0x42, 0x43], 1, &mut ctx, &mut tree).unwrap();

        assert_eq!(tree[0].span, 1..2);
        assert_eq!(tree[0].text.as_deref(), Some("Unknown (66)"));
        assert_eq!(ctx.summary(), "Unknown APDU");
        assert_eq!(ctx.annotations()[0].kind, AnnotationKind::UnknownApdu);
    }

    #[test]
    fn test_release_request_has_no_body() {
        let registry = CosemRegistry::standard();
        let reassembler = Reassembler::default();
        let mut ctx = DecodeContext::new(&registry, &reassembler, ConversationId(1), 1);
        let mut tree = Vec::new();
        decode_apdu(&[0x62, 0x00], 0, &mut ctx, &mut tree).unwrap();
        assert_eq!(ctx.summary(), "RLRQ");
        assert_eq!(tree[0].text.as_deref(), Some("rlrq (98)"));
        assert!(ctx.annotations().is_empty());
    }

    #[test]
    fn test_truncated_apdu_keeps_partial_tree() {
        let registry = CosemRegistry::standard();
        let reassembler = Reassembler::default();
        let mut ctx = DecodeContext::new(&registry, &reassembler, ConversationId(1), 1);
        let mut tree = Vec::new();
        // get-request-normal cut inside the attribute descriptor
        let err = decode_apdu(&[0xC0, 0x01, 0xC1, 0x00, 0x03], 0, &mut ctx, &mut tree).unwrap_err();
        assert!(err.is_framing());
        let apdu = &tree[0];
        assert!(apdu.find("Get Request").is_some());
        assert!(apdu.find("Invoke Id And Priority").is_some());
        assert_eq!(ctx.summary(), "Get-Request-Normal");
    }
}
