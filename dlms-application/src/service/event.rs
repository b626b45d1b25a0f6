//! Event-Notification-Request and Data-Notification
//!
//! Both are unconfirmed pushes from the server.
//!
//! ```text
//! Event-Notification-Request ::= SEQUENCE {
//!     time                         OCTET STRING OPTIONAL,
//!     cosem-attribute-descriptor   Cosem-Attribute-Descriptor,
//!     attribute-value              Data
//! }
//!
//! Data-Notification ::= SEQUENCE {
//!     long-invoke-id-and-priority  Long-Invoke-Id-And-Priority,
//!     date-time                    OCTET STRING,
//!     notification-body            Data
//! }
//! ```

use crate::context::DecodeContext;
use crate::cosem::decode_attribute_descriptor;
use crate::pdu::{LongInvokeIdAndPriority, decode_date_time_field, decode_u8_field};
use dlms_asn1::AxdrDecoder;
use dlms_core::{DlmsResult, Field};

pub fn decode_event_notification_request(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    if decode_u8_field(decoder, "Time Present", fields)? != 0 {
        decode_date_time_field(decoder, fields)?;
    }
    decode_attribute_descriptor(decoder, ctx, fields)?;
    decoder.decode_data_into("Data", fields)?;
    Ok(())
}

pub fn decode_data_notification(decoder: &mut AxdrDecoder<'_>, fields: &mut Vec<Field>) -> DlmsResult<()> {
    LongInvokeIdAndPriority::decode(decoder, fields)?;
    decode_date_time_field(decoder, fields)?;
    decoder.decode_data_into("Data", fields)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::service::testing::decode;
    use dlms_core::FieldValue;

    #[test]
    fn test_event_notification_without_time() {
        let bytes = [
            0xC2, 0x00, 0x00, 0x01, 0x00, 0x00, 0x2A, 0x00, 0x00, 0xFF, 0x02, 0x11, 0x07,
        ];
        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        assert_eq!(
            decoded.summary,
            "Event-Notification-Request data.value COSEM logical device name"
        );
        assert!(decoded.apdu.find("Date-Time").is_none());
        assert_eq!(decoded.apdu.find("Data").unwrap().value, Some(FieldValue::Unsigned(7)));
    }

    #[test]
    fn test_event_notification_with_time() {
        let mut bytes = vec![0xC2, 0x01, 0x0C];
        bytes.extend_from_slice(&[0x07, 0xE5, 0x06, 0x0F, 0x02, 0x0C, 0x1E, 0x00, 0x00, 0xFF, 0xFF, 0x80]);
        bytes.extend_from_slice(&[0x00, 0x01, 0x00, 0x00, 0x2A, 0x00, 0x00, 0xFF, 0x02, 0x11, 0x07]);
        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        let date_time = decoded.apdu.find("Date-Time").unwrap();
        assert_eq!(date_time.span, 2..15);
        assert_eq!(date_time.text.as_deref(), Some("2021/06/15 12:30:00.00"));
        assert_eq!(decoded.apdu.find("Data").unwrap().span, 24..26);
    }

    #[test]
    fn test_data_notification() {
        // long invoke id 1, no date-time, structure { unsigned 1, long-unsigned 2 }
        let bytes = [
            0x0F, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x02, 0x11, 0x01, 0x12, 0x00, 0x02,
        ];
        let decoded = decode(&bytes);
        assert!(decoded.result.is_ok());
        assert_eq!(decoded.summary, "Data-Notification");
        assert_eq!(decoded.apdu.find("Date-Time").unwrap().text.as_deref(), Some("absent"));
        let data = decoded.apdu.find("Data").unwrap();
        assert_eq!(data.span, 6..13);
        assert_eq!(data.children.len(), 2);
    }

    #[test]
    fn test_data_notification_truncated_body() {
        let decoded = decode(&[0x0F, 0x00, 0x00, 0x00, 0x01, 0x00, 0x02, 0x02, 0x11]);
        assert!(decoded.result.unwrap_err().is_framing());
        assert!(decoded.apdu.find("Long Invoke Id And Priority").is_some());
        assert_eq!(decoded.apdu.span, 0..9);
    }
}
