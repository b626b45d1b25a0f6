//! Link layer trees
//!
//! Each encapsulation adds its header node to the tree, then hands the
//! APDU to `dlms_application::decode_apdu`. HDLC information fields go
//! through the HDLC segment stream of the conversation first.

use dlms_application::{DecodeContext, decode_apdu};
use dlms_core::{Annotation, DlmsResult, Field, FragmentStatus, Reassembled, StreamKey};
use dlms_session::{
    CheckSequence, FLAG, FrameType, HdlcAddress, HdlcFrame, LLC_HEADER_LENGTH, LlcHeader,
    WRAPPER_HEADER_LENGTH, WrapperHeader, decode_parameters,
};
use std::ops::Range;

/// HDLC frame, then the APDU of a completed information field
///
/// The summary is "HDLC" and the frame type, replaced by the APDU summary
/// when an I frame completes an APDU.
pub(crate) fn dissect_hdlc(
    buffer: &[u8],
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
    verify_check_sequences: bool,
) -> DlmsResult<()> {
    ctx.set_summary("HDLC");
    let frame = HdlcFrame::decode(buffer)?;
    let frame_type = frame.frame_type();
    match frame_type {
        FrameType::Unknown => ctx.set_summary("Unknown HDLC frame"),
        known => ctx.set_summary(format!("HDLC {}", known)),
    }
    log::debug!("frame {}: HDLC {} frame", ctx.frame(), frame_type);

    let mut children = vec![Field::new("Opening Flag", 0..1).with_value(FLAG)];
    children.push(frame_format_field(&frame));
    children.push(address_field("Destination Address", frame.destination(), HdlcFrame::DESTINATION_OFFSET));
    children.push(address_field("Source Address", frame.source(), frame.source_offset()));
    children.push(control_field(&frame));
    if frame_type.is_failure() {
        ctx.annotate(Annotation::no_success(
            frame_type.description(),
            frame.control_offset()..frame.control_offset() + 1,
        ));
    }
    if let Some(hcs) = frame.hcs() {
        children.push(check_sequence_field("Header Check Sequence", hcs, ctx, verify_check_sequences));
    }

    let information = frame.information();
    let mut reassembly = Vec::new();
    let mut result = Ok(());
    if frame_type == FrameType::Information {
        children.push(
            Field::new("Information Field", information.clone())
                .with_value(&buffer[information.clone()])
                .with_text(format!("length {}", information.len())),
        );
        result = reassemble_information(buffer, information, frame.format().is_segmented(), ctx, &mut reassembly);
    } else if !information.is_empty() {
        children.push(information_field(buffer, information, frame_type, ctx));
    }

    children.push(check_sequence_field("Frame Check Sequence", frame.fcs(), ctx, verify_check_sequences));
    let closing = frame.closing_flag_offset();
    if buffer.get(closing) == Some(&FLAG) {
        children.push(Field::new("Closing Flag", closing..closing + 1).with_value(FLAG));
    } else {
        ctx.annotate(Annotation::malformed("HDLC closing flag missing", closing..closing + 1));
    }

    tree.push(Field::new("HDLC", 0..closing.saturating_add(1).min(buffer.len())).with_children(children));
    tree.append(&mut reassembly);
    result
}

fn frame_format_field(frame: &HdlcFrame) -> Field {
    let format = frame.format();
    let span = HdlcFrame::FORMAT_OFFSET..HdlcFrame::FORMAT_OFFSET + 2;
    Field::new("Frame Format", span.clone())
        .with_value(format.raw())
        .with_children(vec![
            Field::new("Type", span.clone()).with_value(format.format_type()),
            Field::new("Segmentation", span.clone()).with_value(format.is_segmented()),
            Field::new("Length", span).with_value(format.length()),
        ])
}

fn address_field(name: &str, address: &HdlcAddress, offset: usize) -> Field {
    let span = offset..offset + address.byte_length();
    let mut field = Field::new(name, span.clone()).with_value(u64::from(address.upper()));
    if address.is_all_station() {
        field = field.with_text(format!("{} (all-station)", address.upper()));
    }
    field.push(Field::new("Upper HDLC Address", span.clone()).with_value(address.upper()));
    if let Some(lower) = address.lower() {
        field.push(Field::new("Lower HDLC Address", span).with_value(lower));
    }
    field
}

fn control_field(frame: &HdlcFrame) -> Field {
    let control = frame.control();
    let span = frame.control_offset()..frame.control_offset() + 1;
    let mut field = Field::new("Control", span.clone()).with_value(control.raw());
    field.push(
        Field::new("Frame", span.clone())
            .with_value(control.frame_bits())
            .with_text(control.frame_type().description()),
    );
    if control.frame_type() != FrameType::Unknown {
        field.push(Field::new("Poll/Final", span.clone()).with_value(control.poll_final()));
    }
    if let Some(nr) = control.receive_sequence() {
        field.push(Field::new("Receive Sequence Number", span.clone()).with_value(nr));
    }
    if let Some(ns) = control.send_sequence() {
        field.push(Field::new("Send Sequence Number", span).with_value(ns));
    }
    field
}

fn check_sequence_field(
    name: &str,
    check: &CheckSequence,
    ctx: &mut DecodeContext<'_>,
    verify: bool,
) -> Field {
    let field = Field::new(name, check.span()).with_value(check.received);
    if check.is_valid() {
        return field.with_text(format!("0x{:04X} (correct)", check.received));
    }
    if verify {
        log::warn!(
            "frame {}: bad {}: received 0x{:04X}, computed 0x{:04X}",
            ctx.frame(),
            name,
            check.received,
            check.computed
        );
        ctx.annotate(Annotation::check_sequence(
            format!("Bad {}: should be 0x{:04X}", name, check.computed),
            check.span(),
        ));
    }
    field.with_text(format!(
        "0x{:04X} (incorrect, should be 0x{:04X})",
        check.received, check.computed
    ))
}

/// Information field of a non-I frame
///
/// SNRM and UA carry link parameters; anything else is shown as bytes.
fn information_field(
    buffer: &[u8],
    information: Range<usize>,
    frame_type: FrameType,
    ctx: &mut DecodeContext<'_>,
) -> Field {
    let field = Field::new("Information Field", information.clone())
        .with_value(&buffer[information.clone()]);
    if !frame_type.carries_parameters() {
        return field;
    }

    match decode_parameters(buffer, information.clone()) {
        Ok(Some(parameters)) => {
            let children = parameters
                .iter()
                .map(|p| Field::new(p.name(), p.span.clone()).with_value(p.value))
                .collect();
            Field::new("Information", information).with_children(children)
        }
        Ok(None) => field,
        Err(err) => {
            ctx.annotate(Annotation::malformed(
                format!("HDLC parameters: {}", err),
                information,
            ));
            field
        }
    }
}

/// Feed an I frame information field to the HDLC segment stream
///
/// A completed message is an LLC header followed by one APDU. An unsegmented
/// frame is decoded in place.
fn reassemble_information(
    buffer: &[u8],
    information: Range<usize>,
    segmented: bool,
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    let key = StreamKey::hdlc(ctx.conversation());
    match ctx
        .reassembler()
        .add_fragment(key, ctx.frame(), &buffer[information.clone()], segmented)
    {
        Ok(FragmentStatus::Pending {
            fragment_index,
            accumulated,
        }) => {
            log::debug!(
                "HDLC segment {} of conversation {} ({} bytes so far)",
                fragment_index,
                ctx.conversation().0,
                accumulated
            );
            Ok(())
        }
        Ok(FragmentStatus::Complete(reassembled)) => {
            decode_reassembled(buffer, information, &reassembled, ctx, tree)
        }
        Err(err) => {
            ctx.annotate(Annotation::malformed(err.to_string(), information));
            Ok(())
        }
    }
}

fn decode_reassembled(
    buffer: &[u8],
    information: Range<usize>,
    reassembled: &Reassembled,
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    if reassembled.fragment_count() == 1 {
        return decode_llc_and_apdu(&buffer[..information.end], information.start, "LLC Header", ctx, tree);
    }
    let mut node = reassembled.to_field(information);
    let result = decode_llc_and_apdu(&reassembled.data, 0, "LLC Header", ctx, &mut node.children);
    tree.push(node);
    result
}

fn decode_llc_and_apdu(
    buffer: &[u8],
    offset: usize,
    name: &str,
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    let llc = LlcHeader::read(buffer, offset)?;
    let span = offset..offset + LLC_HEADER_LENGTH;
    tree.push(
        Field::new(name, span.clone())
            .with_value(&llc.as_bytes()[..])
            .with_text(llc.direction().to_string())
            .with_children(vec![
                Field::new("Destination LSAP", span.clone()).with_value(llc.destination_lsap()),
                Field::new("Source LSAP", span.clone()).with_value(llc.source_lsap()),
                Field::new("Quality", span).with_value(llc.quality()),
            ]),
    );
    decode_apdu(buffer, offset + LLC_HEADER_LENGTH, ctx, tree)
}

/// IEC 61334-4-32 LLC header, then one APDU
pub(crate) fn dissect_iec_432(
    buffer: &[u8],
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    decode_llc_and_apdu(buffer, 0, "IEC 4-32 LLC Header", ctx, tree)
}

/// Wrapper header, then one APDU
///
/// A version other than 1 or a length that disagrees with the bytes that
/// follow is annotated; the APDU is decoded regardless.
pub(crate) fn dissect_wrapper(
    buffer: &[u8],
    ctx: &mut DecodeContext<'_>,
    tree: &mut Vec<Field>,
) -> DlmsResult<()> {
    let header = WrapperHeader::decode(buffer)?;
    let word = |offset: usize| offset..offset + 2;
    tree.push(
        Field::new("Wrapper Header", 0..WRAPPER_HEADER_LENGTH).with_children(vec![
            Field::new("Version", word(0)).with_value(header.version()),
            Field::new("Source wPort", word(2)).with_value(header.source_port()),
            Field::new("Destination wPort", word(4)).with_value(header.destination_port()),
            Field::new("Length", word(6)).with_value(header.payload_length()),
        ]),
    );

    if !header.is_supported_version() {
        ctx.annotate(Annotation::malformed(
            format!("Unsupported wrapper version {}", header.version()),
            word(0),
        ));
    }
    let remaining = buffer.len() - WRAPPER_HEADER_LENGTH;
    if usize::from(header.payload_length()) != remaining {
        ctx.annotate(Annotation::malformed(
            format!(
                "Wrapper length {} does not match the {} byte(s) that follow",
                header.payload_length(),
                remaining
            ),
            word(6),
        ));
    }
    decode_apdu(buffer, WRAPPER_HEADER_LENGTH, ctx, tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dlms_application::CosemRegistry;
    use dlms_core::{Annotation, AnnotationKind, ConversationId, FieldValue, Reassembler};
    use dlms_session::fcs16;

    /// Frame with a one-byte destination and source and valid check sequences
    fn hdlc_frame(control: u8, info: &[u8], segmented: bool) -> Vec<u8> {
        let header = [0x03, 0x21, control];
        let mut length = 2 + header.len() + 2;
        if !info.is_empty() {
            length += 2 + info.len();
        }
        let segmentation: u16 = if segmented { 0x0800 } else { 0 };
        let format = 0xA000 | segmentation | length as u16;
        let mut frame = vec![FLAG];
        frame.extend_from_slice(&format.to_be_bytes());
        frame.extend_from_slice(&header);
        if !info.is_empty() {
            let hcs = fcs16(&frame[1..]);
            frame.extend_from_slice(&hcs.to_le_bytes());
            frame.extend_from_slice(info);
        }
        let fcs = fcs16(&frame[1..]);
        frame.extend_from_slice(&fcs.to_le_bytes());
        frame.push(FLAG);
        frame
    }

    struct Output {
        result: DlmsResult<()>,
        tree: Vec<Field>,
        summary: String,
        annotations: Vec<Annotation>,
    }

    fn run(
        reassembler: &Reassembler,
        frame: u64,
        dissect: impl FnOnce(&mut DecodeContext<'_>, &mut Vec<Field>) -> DlmsResult<()>,
    ) -> Output {
        let registry = CosemRegistry::standard();
        let mut ctx = DecodeContext::new(&registry, reassembler, ConversationId(7), frame);
        let mut tree = Vec::new();
        let result = dissect(&mut ctx, &mut tree);
        let (summary, annotations) = ctx.into_parts();
        Output {
            result,
            tree,
            summary,
            annotations,
        }
    }

    const GET_REQUEST: [u8; 13] = [
        0xC0, 0x01, 0xC1, 0x00, 0x03, 0x01, 0x00, 0x01, 0x08, 0x00, 0xFF, 0x02, 0x00,
    ];

    #[test]
    fn test_i_frame_with_apdu() {
        let mut info = vec![0xE6, 0xE6, 0x00];
        info.extend_from_slice(&GET_REQUEST);
        let bytes = hdlc_frame(0x32, &info, false);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, true));

        assert!(out.result.is_ok());
        assert_eq!(out.summary, "Get-Request-Normal register.value 1.0.1.8.0.255");
        assert!(out.annotations.is_empty());
        assert_eq!(out.tree.len(), 3);

        let hdlc = &out.tree[0];
        assert_eq!(hdlc.span, 0..bytes.len());
        let control = hdlc.find("Control").unwrap();
        assert_eq!(control.find("Frame").unwrap().text.as_deref(), Some("I (Information)"));
        assert_eq!(control.find("Receive Sequence Number").unwrap().value, Some(FieldValue::Unsigned(1)));
        assert_eq!(control.find("Send Sequence Number").unwrap().value, Some(FieldValue::Unsigned(1)));
        assert_eq!(hdlc.find("Information Field").unwrap().span, 8..24);
        assert!(hdlc.find("Closing Flag").is_some());

        assert_eq!(out.tree[1].name, "LLC Header");
        assert_eq!(out.tree[1].span, 8..11);
        assert_eq!(out.tree[1].text.as_deref(), Some("request"));
        assert_eq!(out.tree[2].name, "APDU");
        assert_eq!(out.tree[2].span, 11..24);
        assert!(reassembler.is_empty());
    }

    #[test]
    fn test_segmented_i_frames() {
        let reassembler = Reassembler::default();
        let mut first_info = vec![0xE6, 0xE7, 0x00];
        first_info.extend_from_slice(&[0xC4, 0x01, 0xC1]);
        let first = hdlc_frame(0x10, &first_info, true);
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&first, ctx, tree, true));
        assert!(out.result.is_ok());
        assert_eq!(out.summary, "HDLC I");
        assert_eq!(out.tree.len(), 1);
        assert_eq!(reassembler.pending(StreamKey::hdlc(ConversationId(7))), Some(6));

        let second = hdlc_frame(0x12, &[0x00, 0x11, 0x2A], false);
        let out = run(&reassembler, 2, |ctx, tree| dissect_hdlc(&second, ctx, tree, true));
        assert!(out.result.is_ok());
        assert_eq!(out.summary, "Get-Response-Normal");
        let reassembled = &out.tree[1];
        assert_eq!(reassembled.name, "Reassembled");
        assert_eq!(reassembled.find("Fragments").unwrap().text.as_deref(), Some("1, 2"));
        assert_eq!(reassembled.find("LLC Header").unwrap().text.as_deref(), Some("response"));
        let apdu = reassembled.find("APDU").unwrap();
        assert_eq!(apdu.span, 3..9);
        assert_eq!(apdu.find("Data").unwrap().value, Some(FieldValue::Unsigned(42)));
    }

    #[test]
    fn test_receive_not_ready() {
        let bytes = hdlc_frame(0xB5, &[], false);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, true));
        assert!(out.result.is_ok());
        assert_eq!(out.summary, "HDLC RNR");
        assert_eq!(out.annotations.len(), 1);
        assert_eq!(out.annotations[0].kind, AnnotationKind::NoSuccess);
        assert_eq!(out.annotations[0].span, 5..6);
        assert!(out.tree[0].find("Header Check Sequence").is_none());
        assert!(out.tree[0].find("Send Sequence Number").is_none());
    }

    #[test]
    fn test_snrm_parameters() {
        let info = [
            0x81, 0x80, 0x12, 0x05, 0x01, 0x80, 0x06, 0x01, 0x80, 0x07, 0x04, 0x00, 0x00, 0x00,
            0x01, 0x08, 0x04, 0x00, 0x00, 0x00, 0x01,
        ];
        let bytes = hdlc_frame(0x93, &info, false);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, true));
        assert_eq!(out.summary, "HDLC SNRM");
        let information = out.tree[0].find("Information").unwrap();
        assert_eq!(information.children.len(), 4);
        assert_eq!(
            information.find("Maximum Information Field Length Transmit").unwrap().value,
            Some(FieldValue::Unsigned(128))
        );
        assert_eq!(information.find("Window Size Receive").unwrap().value, Some(FieldValue::Unsigned(1)));
        assert!(reassembler.is_empty());
    }

    #[test]
    fn test_bad_fcs() {
        let mut bytes = hdlc_frame(0x53, &[], false);
        let fcs = bytes.len() - 3;
        bytes[fcs] ^= 0x01;
        let reassembler = Reassembler::default();

        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, true));
        assert_eq!(out.summary, "HDLC DISC");
        assert_eq!(out.annotations.len(), 1);
        assert_eq!(out.annotations[0].kind, AnnotationKind::CheckSequence);
        assert!(
            out.tree[0].find("Frame Check Sequence").unwrap().text.as_deref().unwrap().contains("incorrect")
        );

        let out = run(&reassembler, 2, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, false));
        assert!(out.annotations.is_empty());
    }

    #[test]
    fn test_unknown_control() {
        let bytes = hdlc_frame(0x0B, &[], false);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes, ctx, tree, true));
        assert!(out.result.is_ok());
        assert_eq!(out.summary, "Unknown HDLC frame");
        assert_eq!(out.tree[0].find("Frame").unwrap().text.as_deref(), Some("Unknown"));
    }

    #[test]
    fn test_truncated_frame() {
        let bytes = hdlc_frame(0x53, &[], false);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_hdlc(&bytes[..5], ctx, tree, true));
        assert!(out.result.unwrap_err().is_framing());
        assert!(out.tree.is_empty());
        assert_eq!(out.summary, "HDLC");
    }

    #[test]
    fn test_iec_432() {
        let mut bytes = vec![0x90, 0x00, 0x00];
        bytes.extend_from_slice(&GET_REQUEST);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_iec_432(&bytes, ctx, tree));
        assert!(out.result.is_ok());
        assert_eq!(out.tree[0].name, "IEC 4-32 LLC Header");
        assert_eq!(out.tree[0].find("Destination LSAP").unwrap().value, Some(FieldValue::Unsigned(0x90)));
        assert_eq!(out.tree[1].span, 3..16);
    }

    #[test]
    fn test_wrapper() {
        let mut bytes = vec![0x00, 0x01, 0x00, 0x10, 0x00, 0x01, 0x00, 0x0D];
        bytes.extend_from_slice(&GET_REQUEST);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_wrapper(&bytes, ctx, tree));
        assert!(out.result.is_ok());
        assert!(out.annotations.is_empty());
        let header = &out.tree[0];
        assert_eq!(header.find("Source wPort").unwrap().value, Some(FieldValue::Unsigned(16)));
        assert_eq!(header.find("Length").unwrap().value, Some(FieldValue::Unsigned(13)));
        assert_eq!(out.tree[1].span, 8..21);
    }

    #[test]
    fn test_wrapper_mismatches_are_annotated() {
        let mut bytes = vec![0x00, 0x02, 0x00, 0x10, 0x00, 0x01, 0x00, 0x20];
        bytes.extend_from_slice(&GET_REQUEST);
        let reassembler = Reassembler::default();
        let out = run(&reassembler, 1, |ctx, tree| dissect_wrapper(&bytes, ctx, tree));
        assert!(out.result.is_ok());
        assert_eq!(out.annotations.len(), 2);
        assert!(out.annotations.iter().all(|a| a.kind == AnnotationKind::Malformed));
        assert_eq!(out.summary, "Get-Request-Normal register.value 1.0.1.8.0.255");
    }
}
