//! RFC 2046 Section 5.1.1 - boundary delimiters

use mimetar::headers::HeaderView;
use mimetar::mime::MultipartReader;
use mimetar::{DecodeError, decode_message};

#[test]
fn test_boundary_with_rfc_specials() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=\"gc0p4Jq0M2Yt08j34c0p'()+_,-./:=?\"\r\n\r\n\
--gc0p4Jq0M2Yt08j34c0p'()+_,-./:=?\r\nContent-Type: text/plain\r\n\r\nok\r\n\
--gc0p4Jq0M2Yt08j34c0p'()+_,-./:=?--\r\n";
    assert_eq!(decode_message(raw).unwrap(), b"From x\r\n\r\nok");
}

#[test]
fn test_preamble_and_epilogue_ignored() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
This is a multi-part message in MIME format.\r\n\
--b\r\nContent-Type: text/plain\r\n\r\nbody\r\n\
--b--\r\n\
epilogue text\r\n";
    assert_eq!(decode_message(raw).unwrap(), b"From x\r\n\r\nbody");
}

#[test]
fn test_missing_close_delimiter() {
    let raw = b"From x\r\nContent-Type: multipart/mixed; boundary=b\r\n\r\n\
--b\r\nContent-Type: text/plain\r\n\r\ncut off";
    assert!(matches!(
        decode_message(raw),
        Err(DecodeError::Structural(_))
    ));
}

#[test]
fn test_part_header_folding() {
    let body = b"--b\r\nContent-Type: text/plain;\r\n\tcharset=utf-8\r\n\r\nx\r\n--b--";
    let mut parts = MultipartReader::new(body, "b");
    let part = parts.next_part().unwrap().unwrap();
    assert_eq!(
        part.headers.get("Content-Type"),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(part.body, b"x");
}

#[test]
fn test_line_break_before_delimiter_not_in_body() {
    let body = b"--b\r\n\r\nline one\r\nline two\r\n--b--";
    let mut parts = MultipartReader::new(body, "b");
    let part = parts.next_part().unwrap().unwrap();
    assert_eq!(part.body, b"line one\r\nline two");
    assert!(parts.next_part().unwrap().is_none());
}
