//! RFC 2046 Section 5.1.4 - multipart/alternative
//!
//! Only the first text branch (plain or html) of an alternative is rendered.

use mimetar::{DecodeError, decode_message};

fn alternative(parts: &str) -> Vec<u8> {
    format!(
        "From x\r\nContent-Type: multipart/alternative; boundary=\"alt\"\r\n\r\n{parts}--alt--\r\n"
    )
    .into_bytes()
}

fn body(raw: &[u8]) -> Vec<u8> {
    let decoded = decode_message(raw).unwrap();
    let split = decoded
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .expect("rendered message has a header separator");
    decoded[split + 4..].to_vec()
}

#[test]
fn test_html_first_wins() {
    let raw = alternative(
        "--alt\r\nContent-Type: text/html\r\n\r\n<b>Hi</b>\r\n\
         --alt\r\nContent-Type: text/plain\r\n\r\nHi\r\n",
    );
    assert_eq!(body(&raw), b"<b>Hi</b>");
}

#[test]
fn test_plain_first_wins() {
    let raw = alternative(
        "--alt\r\nContent-Type: text/plain\r\n\r\nHi\r\n\
         --alt\r\nContent-Type: text/html\r\n\r\n<b>Hi</b>\r\n",
    );
    assert_eq!(body(&raw), b"Hi");
}

#[test]
fn test_non_text_branches_skipped() {
    let raw = alternative(
        "--alt\r\nContent-Type: text/calendar\r\n\r\nBEGIN:VCALENDAR\r\n\
         --alt\r\nContent-Type: text/plain\r\nContent-Transfer-Encoding: base64\r\n\r\nSGk=\r\n",
    );
    assert_eq!(body(&raw), b"Hi");
}

#[test]
fn test_no_text_branch_yields_empty_body() {
    let raw = alternative("--alt\r\nContent-Type: image/png\r\n\r\nPNG\r\n");
    assert_eq!(decode_message(&raw).unwrap(), b"From x\r\n\r\n");
}

#[test]
fn test_branch_without_content_type_fails() {
    let raw = alternative("--alt\r\nX-Note: none\r\n\r\nHi\r\n");
    assert!(matches!(
        decode_message(&raw),
        Err(DecodeError::ContentType(_))
    ));
}

#[test]
fn test_alternative_inside_mixed() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=mix\r\n\r\n\
--mix\r\nContent-Type: multipart/alternative; boundary=alt\r\n\r\n\
--alt\r\nContent-Type: text/plain\r\n\r\nplain\r\n\
--alt\r\nContent-Type: text/html\r\n\r\n<p>html</p>\r\n\
--alt--\r\n\
--mix\r\nContent-Type: text/plain\r\n\r\n+tail\r\n\
--mix--\r\n";
    assert_eq!(body(raw), b"plain+tail");
}
