//! Access-Request and Access-Response
//!
//! The access service bundles several Get, Set and Action requests into one
//! APDU. The request specification lists the referenced attributes and
//! methods; the list of data carries the values in the same order.

use crate::choice::{describe, named_values};
use crate::context::DecodeContext;
use crate::cosem::{
    decode_attribute_descriptor, decode_method_descriptor, decode_selective_access_descriptor,
};
use crate::pdu::{LongInvokeIdAndPriority, decode_date_time_field, decode_list_of_data, decode_node};
use crate::results::decode_data_access_result;
use dlms_asn1::AxdrDecoder;
use dlms_core::{DlmsError, DlmsResult, Field};

named_values! {
    pub enum AccessRequestChoice {
        Get = 1 => "access-request-get",
        Set = 2 => "access-request-set",
        Action = 3 => "access-request-action",
        GetWithSelection = 4 => "access-request-get-with-selection",
        SetWithSelection = 5 => "access-request-set-with-selection",
    }
}

named_values! {
    pub enum AccessResponseChoice {
        Get = 1 => "access-response-get",
        Set = 2 => "access-response-set",
        Action = 3 => "access-response-action",
    }
}

pub fn decode_access_request(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    LongInvokeIdAndPriority::decode(decoder, fields)?;
    decode_date_time_field(decoder, fields)?;
    decode_request_specification(decoder, ctx, fields)?;
    decode_list_of_data(decoder, "Access Request List Of Data", fields)
}

pub fn decode_access_response(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    LongInvokeIdAndPriority::decode(decoder, fields)?;
    decode_date_time_field(decoder, fields)?;
    decode_request_specification(decoder, ctx, fields)?;
    decode_list_of_data(decoder, "Access Response List Of Data", fields)?;
    decode_node(decoder, "Access Response Specification", fields, |decoder, children| {
        let count = decoder.decode_length()?;
        for i in 1..=count {
            decode_choice_node::<AccessResponseChoice>(decoder, i, "Access Response", children, |decoder, _, children| {
                decode_data_access_result(decoder, ctx, children).map(|_| ())
            })?;
        }
        Ok(())
    })
}

/// Sequence of Access-Request-Specification entries
///
/// # Errors
///
/// `InvalidData` for a choice that is not an access request kind.
fn decode_request_specification(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    decode_node(decoder, "Access Request Specification", fields, |decoder, children| {
        let count = decoder.decode_length()?;
        for i in 1..=count {
            decode_choice_node::<AccessRequestChoice>(decoder, i, "Access Request", children, |decoder, choice, children| {
                match choice {
                    AccessRequestChoice::Get | AccessRequestChoice::Set => {
                        decode_attribute_descriptor(decoder, ctx, children)?;
                    }
                    AccessRequestChoice::Action => {
                        decode_method_descriptor(decoder, ctx, children)?;
                    }
                    AccessRequestChoice::GetWithSelection | AccessRequestChoice::SetWithSelection => {
                        decode_attribute_descriptor(decoder, ctx, children)?;
                        decode_selective_access_descriptor(decoder, children)?;
                    }
                }
                Ok(())
            })?;
        }
        Ok(())
    })
}

/// One `[index] name` entry: a choice byte followed by its body
fn decode_choice_node<'a, T: crate::choice::NamedValue>(
    decoder: &mut AxdrDecoder<'a>,
    index: usize,
    name: &str,
    fields: &mut Vec<Field>,
    body: impl FnOnce(&mut AxdrDecoder<'a>, T, &mut Vec<Field>) -> DlmsResult<()>,
) -> DlmsResult<()> {
    let start = decoder.position();
    let value = decoder.decode_u8()?;
    let choice = T::from_value(value).ok_or_else(|| {
        DlmsError::InvalidData(format!("Invalid {} choice {} at offset {}", name, value, start))
    })?;
    let mut children = Vec::new();
    let result = body(decoder, choice, &mut children);
    fields.push(
        Field::new(format!("[{}] {}", index, name), start..decoder.position())
            .with_value(value)
            .with_text(describe::<T>(value))
            .with_children(children),
    );
    result
}

#[cfg(test)]
mod tests {
    use crate::service::testing::decode;
    use dlms_core::{AnnotationKind, DlmsError};

    fn request_head(tag: u8) -> Vec<u8> {
        // long invoke id, no date-time
        vec![tag, 0x40, 0x00, 0x00, 0x05, 0x00]
    }

    #[test]
    fn test_access_request() {
        let mut bytes = request_head(0xD9);
        // two specifications: get register value, action clock method 1
        bytes.extend_from_slice(&[0x02, 0x01, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02]);
        bytes.extend_from_slice(&[0x03, 0x00, 0x08, 0x00, 0x00, 0x01, 0x00, 0x00, 0xFF, 0x01]);
        // list of data: null-data, integer 0
        bytes.extend_from_slice(&[0x02, 0x00, 0x0F, 0x00]);

        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        assert_eq!(
            decoded.summary,
            "Access-Request register.value 1.0.1.8.0.255 clock.adjust_to_quarter 0.0.1.0.0.255"
        );
        let spec = decoded.apdu.find("Access Request Specification").unwrap();
        assert_eq!(spec.children.len(), 2);
        assert_eq!(spec.children[0].name, "[1] Access Request");
        assert_eq!(spec.children[0].text.as_deref(), Some("access-request-get (1)"));
        assert!(spec.children[1].find("COSEM Method Descriptor").is_some());
        let list = decoded.apdu.find("Access Request List Of Data").unwrap();
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.span.end, bytes.len());
    }

    #[test]
    fn test_access_request_invalid_choice() {
        let mut bytes = request_head(0xD9);
        bytes.extend_from_slice(&[0x01, 0x07]);
        let decoded = decode(&bytes);
        assert!(matches!(decoded.result, Err(DlmsError::InvalidData(_))));
        assert!(decoded.apdu.find("Access Request Specification").is_some());
    }

    #[test]
    fn test_access_response() {
        let mut bytes = request_head(0xDA);
        bytes.extend_from_slice(&[0x01, 0x01, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02]);
        bytes.extend_from_slice(&[0x01, 0x06, 0x00, 0x00, 0x00, 0x2A]);
        bytes.extend_from_slice(&[0x02, 0x01, 0x00, 0x01, 0x04]);

        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        let spec = decoded.apdu.find("Access Response Specification").unwrap();
        assert_eq!(spec.children.len(), 2);
        assert_eq!(spec.children[1].text.as_deref(), Some("access-response-get (1)"));
        assert!(decoded.summary.ends_with(" (object-undefined)"));
        assert_eq!(decoded.annotations.len(), 1);
        assert_eq!(decoded.annotations[0].kind, AnnotationKind::NoSuccess);
    }
}
