//! RFC 2046 Section 5.1.3 - multipart/mixed and other multiparts
//!
//! Every text leaf contributes, in document order, with no separators.

use mimetar::{DecodeError, MessageDecoder};

fn decode_body(raw: &[u8]) -> mimetar::Result<Vec<u8>> {
    MessageDecoder::default().decode(raw).map(|m| m.body)
}

#[test]
fn test_text_parts_concatenated_attachments_skipped() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nA\r\n\
--b\r\nContent-Type: image/png\r\nContent-Transfer-Encoding: base64\r\n\r\niVBORw0KGgo=\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nB\r\n\
--b--\r\n";
    assert_eq!(decode_body(raw).unwrap(), b"AB");
}

#[test]
fn test_other_multipart_subtypes_behave_like_mixed() {
    for subtype in ["related", "signed", "x-unknown"] {
        let raw = format!(
            "From x\r\nContent-Type: multipart/{subtype}; boundary=b\r\n\r\n\
             --b\r\nContent-Type: text/html\r\n\r\n<i>1</i>\r\n\
             --b\r\nContent-Type: text/plain\r\n\r\n2\r\n\
             --b--\r\n"
        );
        assert_eq!(decode_body(raw.as_bytes()).unwrap(), b"<i>1</i>2", "{subtype}");
    }
}

#[test]
fn test_mixed_encodings_per_part() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\nb25l\r\n\
--b\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: quoted-printable\r\n\r\n=74wo\r\n\
--b--\r\n";
    assert_eq!(decode_body(raw).unwrap(), b"onetwo");
}

#[test]
fn test_message_rfc822_part_is_skipped() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: message/rfc822\r\n\r\nSubject: inner\r\n\r\ninner text\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nouter\r\n\
--b--\r\n";
    assert_eq!(decode_body(raw).unwrap(), b"outer");
}

#[test]
fn test_multipart_without_boundary_fails() {
    let raw = b"From x\r\nContent-Type: multipart/mixed\r\n\r\n--b\r\n\r\nA\r\n--b--\r\n";
    assert!(matches!(
        decode_body(raw),
        Err(DecodeError::ContentType(_))
    ));
}

#[test]
fn test_depth_limit() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=l1\r\n\r\n\
--l1\r\nContent-Type: multipart/mixed; boundary=l2\r\n\r\n\
--l2\r\nContent-Type: multipart/mixed; boundary=l3\r\n\r\n\
--l3\r\nContent-Type: text/plain\r\n\r\ndeep\r\n--l3--\r\n\
--l2--\r\n\
--l1--\r\n";

    let unbounded = MessageDecoder::default().decode(raw).unwrap();
    assert_eq!(unbounded.body, b"deep");

    let config = mimetar::DecodeConfig::default().max_depth(2);
    let err = MessageDecoder::new(config).decode(raw).unwrap_err();
    assert!(matches!(err, DecodeError::TooDeep(2)));
}
