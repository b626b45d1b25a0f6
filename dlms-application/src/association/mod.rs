//! ACSE association APDUs
//!
//! AARQ and AARE open an application association. After the APDU tag and a
//! one-byte length they are a sequence of BER elements:
//!
//! ```text
//! 60 1D                                 AARQ, 29 bytes
//!    A1 09 06 07 60 85 74 05 08 01 01   application-context-name
//!    BE 10 04 0E                        user-information, OCTET STRING
//!       01 00 00 00 06                  xDLMS InitiateRequest
//!       5F 1F 04 00 00 7E 1F            proposed conformance
//!       04 B0                           client max receive PDU size
//! ```
//!
//! Every element is shown by name. The xDLMS InitiateRequest and
//! InitiateResponse inside user-information are located by fixed offsets
//! counted back from the end of the element, since both end with the
//! conformance block and the max receive PDU size.

pub mod conformance;

pub use conformance::Conformance;

use crate::choice::{describe, named_values, title_case};
use crate::context::DecodeContext;
use crate::pdu::decode_u8_field;
use dlms_asn1::ber::{decode_integer_value, decode_object_identifier, format_object_identifier};
use dlms_asn1::{AxdrDecoder, BerDecoder, BerElement};
use dlms_core::{Annotation, DlmsError, DlmsResult, Field};

named_values! {
    /// Elements of an AARQ
    pub enum AarqElement {
        ProtocolVersion = 0x80 => "protocol-version",
        ApplicationContextName = 0xA1 => "application-context-name",
        CalledApTitle = 0xA2 => "called-AP-title",
        CalledAeQualifier = 0xA3 => "called-AE-qualifier",
        CalledApInvocationId = 0xA4 => "called-AP-invocation-id",
        CalledAeInvocationId = 0xA5 => "called-AE-invocation-id",
        CallingApTitle = 0xA6 => "calling-AP-title",
        CallingAeQualifier = 0xA7 => "calling-AE-qualifier",
        CallingApInvocationId = 0xA8 => "calling-AP-invocation-id",
        CallingAeInvocationId = 0xA9 => "calling-AE-invocation-id",
        SenderAcseRequirements = 0x8A => "sender-acse-requirements",
        MechanismName = 0x8B => "mechanism-name",
        CallingAuthenticationValue = 0xAC => "calling-authentication-value",
        ImplementationInformation = 0xBD => "implementation-information",
        UserInformation = 0xBE => "user-information",
    }
}

named_values! {
    /// Elements of an AARE
    pub enum AareElement {
        ProtocolVersion = 0x80 => "protocol-version",
        ApplicationContextName = 0xA1 => "application-context-name",
        Result = 0xA2 => "result",
        ResultSourceDiagnostic = 0xA3 => "result-source-diagnostic",
        RespondingApTitle = 0xA4 => "responding-AP-title",
        RespondingAeQualifier = 0xA5 => "responding-AE-qualifier",
        RespondingApInvocationId = 0xA6 => "responding-AP-invocation-id",
        RespondingAeInvocationId = 0xA7 => "responding-AE-invocation-id",
        ResponderAcseRequirements = 0x88 => "responder-acse-requirements",
        MechanismName = 0x89 => "mechanism-name",
        RespondingAuthenticationValue = 0xAA => "responding-authentication-value",
        ImplementationInformation = 0xBD => "implementation-information",
        UserInformation = 0xBE => "user-information",
    }
}

named_values! {
    /// Tag of the xDLMS APDU carried in user-information
    pub enum XdlmsTag {
        InitiateRequest = 0x01 => "initiate-request",
        InitiateResponse = 0x08 => "initiate-response",
        ConfirmedServiceError = 0x0E => "confirmed-service-error",
        GloInitiateRequest = 0x21 => "glo-initiate-request",
        GloInitiateResponse = 0x28 => "glo-initiate-response",
        DedInitiateRequest = 0x41 => "ded-initiate-request",
        DedInitiateResponse = 0x48 => "ded-initiate-response",
    }
}

named_values! {
    pub enum AssociationResult {
        Accepted = 0 => "accepted",
        RejectedPermanent = 1 => "rejected-permanent",
        RejectedTransient = 2 => "rejected-transient",
    }
}

named_values! {
    /// Diagnostic when the ACSE service user rejected the association
    pub enum AcseServiceUser {
        Null = 0 => "null",
        NoReasonGiven = 1 => "no-reason-given",
        ApplicationContextNameNotSupported = 2 => "application-context-name-not-supported",
        CallingApTitleNotRecognized = 3 => "calling-AP-title-not-recognized",
        CallingApInvocationIdNotRecognized = 4 => "calling-AP-invocation-identifier-not-recognized",
        CallingAeQualifierNotRecognized = 5 => "calling-AE-qualifier-not-recognized",
        CallingAeInvocationIdNotRecognized = 6 => "calling-AE-invocation-identifier-not-recognized",
        CalledApTitleNotRecognized = 7 => "called-AP-title-not-recognized",
        CalledApInvocationIdNotRecognized = 8 => "called-AP-invocation-identifier-not-recognized",
        CalledAeQualifierNotRecognized = 9 => "called-AE-qualifier-not-recognized",
        CalledAeInvocationIdNotRecognized = 10 => "called-AE-invocation-identifier-not-recognized",
        MechanismNameNotRecognized = 11 => "authentication-mechanism-name-not-recognised",
        MechanismNameRequired = 12 => "authentication-mechanism-name-required",
        AuthenticationFailure = 13 => "authentication-failure",
        AuthenticationRequired = 14 => "authentication-required",
    }
}

named_values! {
    /// Diagnostic when the ACSE service provider rejected the association
    pub enum AcseServiceProvider {
        Null = 0 => "null",
        NoReasonGiven = 1 => "no-reason-given",
        NoCommonAcseVersion = 2 => "no-common-acse-version",
    }
}

/// COSEM application context names, `2.16.756.5.8.1.x`
const APPLICATION_CONTEXT_NAMES: [(&[u32], &str); 4] = [
    (&[2, 16, 756, 5, 8, 1, 1], "logical-name-no-ciphering"),
    (&[2, 16, 756, 5, 8, 1, 2], "short-name-no-ciphering"),
    (&[2, 16, 756, 5, 8, 1, 3], "logical-name-with-ciphering"),
    (&[2, 16, 756, 5, 8, 1, 4], "short-name-with-ciphering"),
];

/// COSEM authentication mechanism names, `2.16.756.5.8.2.x`
const MECHANISM_NAMES: [(&[u32], &str); 8] = [
    (&[2, 16, 756, 5, 8, 2, 0], "lowest-level-security"),
    (&[2, 16, 756, 5, 8, 2, 1], "low-level-security"),
    (&[2, 16, 756, 5, 8, 2, 2], "high-level-security"),
    (&[2, 16, 756, 5, 8, 2, 3], "high-level-security-md5"),
    (&[2, 16, 756, 5, 8, 2, 4], "high-level-security-sha1"),
    (&[2, 16, 756, 5, 8, 2, 5], "high-level-security-gmac"),
    (&[2, 16, 756, 5, 8, 2, 6], "high-level-security-sha256"),
    (&[2, 16, 756, 5, 8, 2, 7], "high-level-security-ecdsa"),
];

const OCTET_STRING_TAG: u8 = 0x04;

/// The two association APDUs share one layout and differ in their tables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acse {
    Aarq,
    Aare,
}

impl Acse {
    fn element_name(self, tag: u8) -> Option<&'static str> {
        match self {
            Acse::Aarq => AarqElement::from_u8(tag).map(AarqElement::name),
            Acse::Aare => AareElement::from_u8(tag).map(AareElement::name),
        }
    }

    fn is_mechanism_name(self, tag: u8) -> bool {
        match self {
            Acse::Aarq => tag == AarqElement::MechanismName.value(),
            Acse::Aare => tag == AareElement::MechanismName.value(),
        }
    }

    /// InitiateRequest for an AARQ, InitiateResponse for an AARE
    fn initiate(self) -> XdlmsTag {
        match self {
            Acse::Aarq => XdlmsTag::InitiateRequest,
            Acse::Aare => XdlmsTag::InitiateResponse,
        }
    }

    /// Distance of the conformance element from the end of user-information
    fn conformance_from_end(self) -> usize {
        match self {
            Acse::Aarq => 9,
            Acse::Aare => 11,
        }
    }

    /// Distance of the max receive PDU size from the end of user-information
    fn pdu_size_from_end(self) -> usize {
        match self {
            Acse::Aarq => 2,
            Acse::Aare => 4,
        }
    }

    fn pdu_size_name(self) -> &'static str {
        match self {
            Acse::Aarq => "Client Max Receive PDU Size",
            Acse::Aare => "Server Max Receive PDU Size",
        }
    }
}

pub fn decode_aarq(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    decode_acse(Acse::Aarq, decoder, ctx, fields)
}

/// AARE
///
/// A result other than accepted is appended to the summary and annotated,
/// along with the result-source-diagnostic.
pub fn decode_aare(
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    decode_acse(Acse::Aare, decoder, ctx, fields)
}

/// Walk the elements of the length-prefixed region
///
/// An element that cannot be walked is kept as raw bytes up to the end of
/// the region and annotated; decoding resumes after the region.
///
/// # Errors
///
/// `Truncated` when the region runs past the end of the buffer. Elements
/// decoded before the end of the buffer are kept.
fn decode_acse(
    acse: Acse,
    decoder: &mut AxdrDecoder<'_>,
    ctx: &mut DecodeContext<'_>,
    fields: &mut Vec<Field>,
) -> DlmsResult<()> {
    let length = usize::from(decode_u8_field(decoder, "Length", fields)?);
    let start = decoder.position();
    let buffer = decoder.buffer();
    let end = (start + length).min(buffer.len());

    let mut elements = BerDecoder::new(buffer, start..end);
    while elements.has_remaining() {
        match elements.next_element() {
            Ok(element) => {
                let field = decode_element(acse, buffer, &element, ctx);
                fields.push(field);
            }
            Err(err) => {
                let malformed = elements.position()..end;
                log::debug!("{:?} element at {} not walkable: {}", acse, malformed.start, err);
                ctx.annotate(Annotation::malformed(
                    format!("Malformed ACSE element: {}", err),
                    malformed.clone(),
                ));
                fields.push(
                    Field::new("Malformed Element", malformed.clone()).with_value(&buffer[malformed]),
                );
                break;
            }
        }
    }
    decoder.skip(end - start)?;

    if start + length > buffer.len() {
        return Err(DlmsError::truncated(start, length, buffer.len()));
    }
    Ok(())
}

fn decode_element(acse: Acse, buffer: &[u8], element: &BerElement<'_>, ctx: &mut DecodeContext<'_>) -> Field {
    let tag = element.tag_byte;
    let Some(name) = acse.element_name(tag) else {
        return Field::new("Unknown Element", element.span())
            .with_value(element.value)
            .with_text(format!("tag 0x{:02X}", tag));
    };

    let field = Field::new(title_case(name), element.span());
    let decoded = match (acse, tag) {
        (_, 0xBE) => return decode_user_information(acse, buffer, element, field, ctx),
        (_, 0xA1) => decode_explicit_oid(buffer, element, &APPLICATION_CONTEXT_NAMES, field),
        (_, tag) if acse.is_mechanism_name(tag) => decode_oid(element.value, &MECHANISM_NAMES, field),
        (Acse::Aare, 0xA2) => decode_result(buffer, element, field, ctx),
        (Acse::Aare, 0xA3) => decode_diagnostic(buffer, element, field),
        _ => Ok(field.with_value(element.value)),
    };

    decoded.unwrap_or_else(|err| {
        ctx.annotate(Annotation::malformed(
            format!("Invalid {}: {}", name, err),
            element.span(),
        ));
        Field::new(title_case(name), element.span()).with_value(element.value)
    })
}

/// Single element nested in the value of `element`
fn inner_element<'a>(buffer: &'a [u8], element: &BerElement<'_>) -> DlmsResult<BerElement<'a>> {
    BerDecoder::new(buffer, element.value_span()).next_element()
}

/// INTEGER nested in `element`, as a one-byte enumeration value
fn inner_enumeration(buffer: &[u8], element: &BerElement<'_>) -> DlmsResult<u8> {
    let integer = inner_element(buffer, element)?;
    if integer.tag.number() != 2 {
        return Err(DlmsError::InvalidData(format!(
            "Expected INTEGER, found tag 0x{:02X}",
            integer.tag_byte
        )));
    }
    let value = decode_integer_value(integer.value)?;
    u8::try_from(value).map_err(|_| DlmsError::InvalidData(format!("Value {} out of range", value)))
}

fn decode_explicit_oid(
    buffer: &[u8],
    element: &BerElement<'_>,
    names: &[(&[u32], &str)],
    field: Field,
) -> DlmsResult<Field> {
    let oid = inner_element(buffer, element)?;
    decode_oid(oid.value, names, field)
}

fn decode_oid(bytes: &[u8], names: &[(&[u32], &str)], field: Field) -> DlmsResult<Field> {
    let arcs = decode_object_identifier(bytes)?;
    let dotted = format_object_identifier(&arcs);
    let text = match names.iter().find(|(oid, _)| *oid == arcs.as_slice()) {
        Some((_, name)) => format!("{} ({})", name, dotted),
        None => dotted,
    };
    Ok(field.with_value(bytes).with_text(text))
}

fn decode_result(
    buffer: &[u8],
    element: &BerElement<'_>,
    field: Field,
    ctx: &mut DecodeContext<'_>,
) -> DlmsResult<Field> {
    let value = inner_enumeration(buffer, element)?;
    if value != AssociationResult::Accepted.value() {
        let name = AssociationResult::from_u8(value).map_or("unknown result", AssociationResult::name);
        ctx.append_summary(&format!(" ({})", name));
        ctx.annotate(Annotation::no_success(
            format!("Association {}", name),
            element.span(),
        ));
    }
    Ok(field.with_value(value).with_text(describe::<AssociationResult>(value)))
}

fn decode_diagnostic(buffer: &[u8], element: &BerElement<'_>, field: Field) -> DlmsResult<Field> {
    let source = inner_element(buffer, element)?;
    let value = inner_enumeration(buffer, &source)?;
    let (name, text) = match source.tag_byte {
        0xA1 => ("Acse-Service-User", describe::<AcseServiceUser>(value)),
        0xA2 => ("Acse-Service-Provider", describe::<AcseServiceProvider>(value)),
        other => {
            return Err(DlmsError::InvalidData(format!(
                "Unknown diagnostic source 0x{:02X}",
                other
            )));
        }
    };
    let child = Field::new(name, source.span()).with_value(value).with_text(text.clone());
    Ok(field.with_text(text).with_children(vec![child]))
}

/// user-information: `OCTET STRING` wrapping an xDLMS APDU
///
/// Only a plain InitiateRequest (AARQ) or InitiateResponse (AARE) is looked
/// into. Ciphered initiates are labeled by their tag.
fn decode_user_information(
    acse: Acse,
    buffer: &[u8],
    element: &BerElement<'_>,
    mut field: Field,
    ctx: &mut DecodeContext<'_>,
) -> Field {
    let inner = match inner_element(buffer, element) {
        Ok(inner) if inner.tag_byte == OCTET_STRING_TAG && !inner.value.is_empty() => inner,
        _ => {
            ctx.annotate(Annotation::malformed(
                "user-information does not hold an xDLMS APDU",
                element.span(),
            ));
            return field.with_value(element.value);
        }
    };

    let tag = inner.value[0];
    field.push(
        Field::new("xDLMS APDU", inner.value_start..inner.value_start + 1)
            .with_value(tag)
            .with_text(describe::<XdlmsTag>(tag)),
    );
    if XdlmsTag::from_u8(tag) != Some(acse.initiate()) {
        return field;
    }

    let end = element.end();
    let conformance = end
        .checked_sub(acse.conformance_from_end())
        .filter(|&offset| offset > inner.value_start)
        .and_then(|offset| Conformance::decode_field(buffer, offset));
    let pdu_size = end.saturating_sub(acse.pdu_size_from_end());
    match (conformance, buffer.get(pdu_size..pdu_size + 2)) {
        (Some((conformance, conformance_field)), Some(size)) => {
            let size = u16::from_be_bytes([size[0], size[1]]);
            log::debug!(
                "{} conformance {:?}, max receive PDU size {}",
                acse.initiate(),
                conformance.names(),
                size
            );
            field.push(conformance_field);
            field.push(Field::new(acse.pdu_size_name(), pdu_size..pdu_size + 2).with_value(size));
        }
        _ => ctx.annotate(Annotation::malformed(
            format!("{} too short for conformance", acse.initiate()),
            element.span(),
        )),
    }
    field
}
