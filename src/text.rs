//! Classification of byte buffers as printable ASCII or printable UTF-8.
//!
//! Buffers are usually chunks of a larger stream, so a multi-byte code
//! point cut off by the end of the buffer is tolerated: the next chunk is
//! expected to carry the rest of it.

use std::io::Read;

use unicode_general_category::{get_general_category, GeneralCategory};

use crate::Result;

/// Longest code point encoding the truncation check accepts.
const MAX_ENCODED_LEN: usize = 6;

/// Outcome of [`classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextKind {
    pub graphic_ascii: bool,
    pub graphic_utf8: bool,
}

impl TextKind {
    const INVALID: Self = Self {
        graphic_ascii: false,
        graphic_utf8: false,
    };

    pub fn is_text(&self) -> bool {
        self.graphic_ascii || self.graphic_utf8
    }
}

/// Could `buf` be the start of one multi-byte code point whose remaining
/// bytes have not arrived yet?
///
/// Only buffers of 1 to 5 bytes can qualify.
pub fn may_be_truncated_utf8(buf: &[u8]) -> bool {
    let len = buf.len();
    if len == 0 || len >= MAX_ENCODED_LEN {
        log::trace!("may_be_truncated_utf8: invalid trailing length {}", len);
        return false;
    }
    if let Some(i) = buf[1..].iter().position(|b| b & 0xC0 != 0x80) {
        log::trace!(
            "may_be_truncated_utf8: invalid trailing byte[{}] {:#04x}",
            i + 1,
            buf[i + 1]
        );
        return false;
    }
    let expected = buf[0].leading_ones() as usize;
    log::trace!(
        "may_be_truncated_utf8: expected length {} in {} trailing bytes",
        expected,
        len
    );
    len < expected && expected <= MAX_ENCODED_LEN
}

/// Is `c` printable or white space?
pub fn is_graphic_or_space(c: char) -> bool {
    if c.is_whitespace() {
        return true;
    }
    !matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Surrogate
            | GeneralCategory::PrivateUse
            | GeneralCategory::Unassigned
            | GeneralCategory::LineSeparator
            | GeneralCategory::ParagraphSeparator
    )
}

/// Decode the code point at the start of `buf`, returning it with its
/// encoded length.
fn decode_first(buf: &[u8]) -> Option<(char, usize)> {
    let head = &buf[..buf.len().min(4)];
    let valid = match std::str::from_utf8(head) {
        Ok(s) => s,
        Err(err) => std::str::from_utf8(&head[..err.valid_up_to()]).ok()?,
    };
    valid.chars().next().map(|c| (c, c.len_utf8()))
}

/// Does `buf` hold only printable ASCII, or only printable UTF-8 with at
/// least one multi-byte code point? White space counts as printable.
///
/// At most one of the two flags is set. Both are cleared for anything
/// that is not printable text, except that an incomplete code point at
/// the very end is accepted as UTF-8. An empty buffer is UTF-8.
pub fn classify(buf: &[u8]) -> TextKind {
    let mut saw_ascii = false;
    let mut saw_multibyte = false;

    let mut i = 0;
    while i < buf.len() {
        let rest = &buf[i..];
        if rest[0] < 0x80 {
            saw_ascii = true;
            if !is_graphic_or_space(char::from(rest[0])) {
                log::trace!(
                    "classify: byte {:#04x} at offset {} is not graphic",
                    rest[0],
                    i
                );
                return TextKind::INVALID;
            }
            i += 1;
            continue;
        }
        match decode_first(rest) {
            Some((c, size)) => {
                if !is_graphic_or_space(c) {
                    log::trace!(
                        "classify: code point {:?} at offset {} is not graphic",
                        c,
                        i
                    );
                    return TextKind::INVALID;
                }
                saw_multibyte = true;
                i += size;
            }
            None if may_be_truncated_utf8(rest) => {
                // The rest of this code point is in the next buffer.
                saw_multibyte = true;
                break;
            }
            None => {
                log::trace!("classify: invalid UTF-8 at offset {}", i);
                return TextKind::INVALID;
            }
        }
    }

    if saw_multibyte || !saw_ascii {
        TextKind {
            graphic_ascii: false,
            graphic_utf8: true,
        }
    } else {
        TextKind {
            graphic_ascii: true,
            graphic_utf8: false,
        }
    }
}

/// Classify up to `limit` leading bytes of `reader`.
pub fn sniff<R: Read>(reader: &mut R, limit: usize) -> Result<TextKind> {
    let mut head = Vec::with_capacity(limit.min(64 * 1024));
    reader.take(limit as u64).read_to_end(&mut head)?;
    Ok(classify(&head))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen, TestResult};
    use quickcheck_macros::quickcheck;
    use rstest::rstest;

    const ASCII: TextKind = TextKind {
        graphic_ascii: true,
        graphic_utf8: false,
    };
    const UTF8: TextKind = TextKind {
        graphic_ascii: false,
        graphic_utf8: true,
    };

    #[rstest]
    #[case(b"\xC3", true)]
    #[case(b"\xE2\x82", true)]
    #[case(b"\xF0\x9F\x98", true)]
    #[case(b"\xFC\x80\x80\x80\x80", true)]
    #[case(b"\xC3\xA9", false)]
    #[case(b"\xC3\x28", false)]
    #[case(b"\xE2\x28", false)]
    #[case(b"\x80", false)]
    #[case(b"a", false)]
    #[case(b"\xFE", false)]
    #[case(b"\xFF\x80", false)]
    #[case(b"", false)]
    #[case(b"\xFC\x80\x80\x80\x80\x80", false)]
    fn truncation_check(#[case] buf: &[u8], #[case] expected: bool) {
        assert_eq!(may_be_truncated_utf8(buf), expected);
    }

    #[rstest]
    #[case(b"", UTF8)]
    #[case(b"hello world\n", ASCII)]
    #[case(b"tab\tand\r\nvertical\x0bfeed\x0c", ASCII)]
    #[case("caf\u{e9} au lait".as_bytes(), UTF8)]
    #[case("\u{1F600}".as_bytes(), UTF8)]
    #[case("\u{FFFD}".as_bytes(), UTF8)]
    #[case("no-break\u{A0}space".as_bytes(), UTF8)]
    #[case(b"\xC3", UTF8)]
    #[case(b"abc\xC3", UTF8)]
    #[case(b"abc\xF0\x9F\x98", UTF8)]
    #[case(b"\xC3\x28", TextKind::INVALID)]
    #[case(b"\xC3\x28abc", TextKind::INVALID)]
    #[case(b"\xC3abc", TextKind::INVALID)]
    #[case(b"abc\x00", TextKind::INVALID)]
    #[case(b"\x7f", TextKind::INVALID)]
    #[case(b"\x1b[0m", TextKind::INVALID)]
    #[case("zero\u{200B}width".as_bytes(), TextKind::INVALID)]
    #[case("\u{85}".as_bytes(), UTF8)]
    #[case("\u{9F}".as_bytes(), TextKind::INVALID)]
    #[case(b"\xED\xA0\x80", TextKind::INVALID)]
    #[case(b"\xC0\xAF", TextKind::INVALID)]
    #[case(b"\xF8\x88\x80\x80\x80 and more", TextKind::INVALID)]
    fn classification(#[case] buf: &[u8], #[case] expected: TextKind) {
        assert_eq!(classify(buf), expected);
    }

    #[test]
    fn chunked_stream_keeps_classifying() {
        let text = "na\u{ef}ve r\u{e9}sum\u{e9}".as_bytes();
        for cut in 0..=text.len() {
            let (head, _) = text.split_at(cut);
            assert!(classify(head).is_text(), "cut at {}", cut);
        }
    }

    #[test]
    fn sniff_reads_only_the_prefix() {
        let mut reader: &[u8] = b"plain text\x00binary";
        assert_eq!(sniff(&mut reader, 10).unwrap(), ASCII);
        let mut reader: &[u8] = b"plain text\x00binary";
        assert_eq!(sniff(&mut reader, 64).unwrap(), TextKind::INVALID);
    }

    #[derive(Clone, Debug)]
    struct PrintableAscii(Vec<u8>);

    impl Arbitrary for PrintableAscii {
        fn arbitrary(g: &mut Gen) -> Self {
            let pool: Vec<u8> = (0x20..0x7f).chain(*b"\t\n\r").collect();
            let len = usize::arbitrary(g) % 256 + 1;
            PrintableAscii(
                (0..len).map(|_| *g.choose(&pool).unwrap()).collect(),
            )
        }
    }

    #[quickcheck]
    fn printable_ascii_is_ascii_only(PrintableAscii(buf): PrintableAscii) {
        assert_eq!(classify(&buf), ASCII);
    }

    #[quickcheck]
    fn printable_text_with_multibyte_is_utf8_only(
        PrintableAscii(prefix): PrintableAscii,
        c: char,
    ) -> TestResult {
        if c.is_ascii() || !is_graphic_or_space(c) {
            return TestResult::discard();
        }
        let mut buf = prefix;
        buf.extend(c.to_string().as_bytes());
        TestResult::from_bool(classify(&buf) == UTF8)
    }

    #[quickcheck]
    fn non_graphic_char_invalidates(
        PrintableAscii(prefix): PrintableAscii,
        c: char,
    ) -> TestResult {
        if is_graphic_or_space(c) {
            return TestResult::discard();
        }
        let mut buf = prefix;
        buf.extend(c.to_string().as_bytes());
        buf.extend(b" tail");
        TestResult::from_bool(classify(&buf) == TextKind::INVALID)
    }

    #[quickcheck]
    fn every_proper_prefix_of_a_code_point_is_truncated(c: char) -> bool {
        let encoded = c.to_string().into_bytes();
        (1..encoded.len()).all(|cut| may_be_truncated_utf8(&encoded[..cut]))
    }

    #[quickcheck]
    fn long_buffers_are_never_truncated(buf: Vec<u8>) -> TestResult {
        if buf.len() <= 5 {
            return TestResult::discard();
        }
        TestResult::from_bool(!may_be_truncated_utf8(&buf))
    }
}
