//! Provide methods and data structures for character encoding conversion.
//!
//! This module is based on `libxml/encoding.h`, `encoding.c`, and so on in `libxml2-v2.11.8`.
//! Please refer to original libxml2 documents also.

// Copyright of the original code is the following.
// --------
// Summary: interface for the encoding conversion functions
// Description: interface for the encoding conversion functions needed for
//              XML basic encoding and iconv() support.
//
// Related specs are
// rfc2044        (UTF-8 and UTF-16) F. Yergeau Alis Technologies
// [ISO-10646]    UTF-8 and UTF-16 in Annexes
// [ISO-8859-1]   ISO Latin-1 characters codes.
// [UNICODE]      The Unicode Consortium, "The Unicode Standard --
//                Worldwide Character Encoding -- Version 1.0", Addison-
//                Wesley, Volume 1, 1991, Volume 2, 1992.  UTF-8 is
//                described in Unicode Technical Report #4.
// [US-ASCII]     Coded Character Set--7-bit American Standard Code for
//                Information Interchange, ANSI X3.4-1986.
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// -------

use std::{borrow::Cow, fmt::Display, str::FromStr};

use encoding_rs::{
    DecoderResult, EUC_JP, Encoder, EncoderResult, Encoding, ISO_2022_JP, ISO_8859_2,
    ISO_8859_15, SHIFT_JIS, UTF_8,
};

use crate::error::{XmlErrorDomain, XmlParserErrors, xml_simple_error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlCharEncoding {
    Error = -1,
    None = 0,
    UTF8,
    UTF16LE,
    UTF16BE,
    ISO8859_1,
    ISO8859_2,
    ISO8859_15,
    ISO2022JP,
    ShiftJIS,
    EUCJP,
    ASCII,
}

impl XmlCharEncoding {
    pub fn get_name(&self) -> Option<&'static str> {
        match *self {
            Self::UTF8 => Some("UTF-8"),
            Self::UTF16LE => Some("UTF-16LE"),
            Self::UTF16BE => Some("UTF-16BE"),
            Self::ISO8859_1 => Some("ISO-8859-1"),
            Self::ISO8859_2 => Some("ISO-8859-2"),
            Self::ISO8859_15 => Some("ISO-8859-15"),
            Self::ISO2022JP => Some("ISO-2022-JP"),
            Self::ShiftJIS => Some("Shift-JIS"),
            Self::EUCJP => Some("EUC-JP"),
            Self::ASCII => Some("ASCII"),
            _ => None,
        }
    }
}

impl FromStr for XmlCharEncoding {
    type Err = EncodingError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        match name.to_uppercase().as_str() {
            "" => Ok(Self::None),
            "UTF-8" | "UTF8" => Ok(Self::UTF8),
            "UTF-16" | "UTF16" | "UTF-16LE" => Ok(Self::UTF16LE),
            "UTF-16BE" => Ok(Self::UTF16BE),
            "ISO-8859-1" | "ISO-LATIN-1" | "ISO LATIN 1" | "LATIN1" => Ok(Self::ISO8859_1),
            "ISO-8859-2" | "ISO-LATIN-2" | "ISO LATIN 2" => Ok(Self::ISO8859_2),
            "ISO-8859-15" => Ok(Self::ISO8859_15),
            "ISO-2022-JP" => Ok(Self::ISO2022JP),
            "SHIFT_JIS" | "SHIFT-JIS" => Ok(Self::ShiftJIS),
            "EUC-JP" => Ok(Self::EUCJP),
            "ASCII" | "US-ASCII" => Ok(Self::ASCII),
            _ => Err(EncodingError::Other {
                msg: "No encoding matches.".into(),
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub enum EncodingError {
    /// The length of the output buffer is too short.
    BufferTooShort,
    /// Malformed byte sequence is found.
    ///
    /// The input and output buffer have consumed `read` and `write` bytes respectively.
    /// Only the decoder returns this error.
    Malformed { read: usize, write: usize },
    /// A UTF-8 character `c` cannot map any codepoints of the target encoding.
    ///
    /// `read` includes the length of `c`, `write` does not.
    /// Only the encoder returns this error.
    Unmappable { read: usize, write: usize, c: char },
    /// Other errors.
    Other { msg: Cow<'static, str> },
}

impl Display for EncodingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Encoding Error: ")?;
        match self {
            Self::BufferTooShort => write!(f, "Buffer too short"),
            Self::Malformed { read, .. } => write!(f, "Malformed byte sequence before {read}"),
            Self::Unmappable { c, .. } => write!(f, "Unmappable character '{c}'"),
            Self::Other { msg } => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for EncodingError {}

pub type EncoderFunc = fn(src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError>;
pub type DecoderFunc = fn(src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError>;

/// A converter between UTF-8 and some other encoding.
pub enum XmlCharEncodingHandler {
    Predefined(PredefinedEncodingHandler),
    Builtin(BuiltinEncodingHandler),
}

impl XmlCharEncodingHandler {
    /// Encode `src` into `dst`. Returns `(read, write)` on success.
    pub fn encode(&mut self, src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
        match self {
            Self::Predefined(handler) => handler.encode(src, dst),
            Self::Builtin(handler) => (handler.encode)(src, dst),
        }
    }

    /// Decode `src` into UTF-8 bytes in `dst`. Returns `(read, write)` on success.
    pub fn decode(&mut self, src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
        match self {
            Self::Predefined(handler) => handler.decode(src, dst),
            Self::Builtin(handler) => (handler.decode)(src, dst),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Predefined(handler) => handler.name(),
            Self::Builtin(handler) => &handler.name,
        }
    }

    /// Check if this handler writes UTF-8.
    pub fn is_utf8(&self) -> bool {
        self.name().eq_ignore_ascii_case("UTF-8")
    }
}

impl std::fmt::Debug for XmlCharEncodingHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("XmlCharEncodingHandler")
            .field(&self.name())
            .finish()
    }
}

pub struct PredefinedEncodingHandler {
    name: &'static str,
    encoding: &'static Encoding,
    encoder: Encoder,
    decoder: encoding_rs::Decoder,
}

impl PredefinedEncodingHandler {
    pub fn encode(&mut self, src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
        let (res, read, write) = self
            .encoder
            .encode_from_utf8_without_replacement(src, dst, false);
        match res {
            EncoderResult::OutputFull if read == 0 => Err(EncodingError::BufferTooShort),
            EncoderResult::OutputFull | EncoderResult::InputEmpty => Ok((read, write)),
            EncoderResult::Unmappable(c) => Err(EncodingError::Unmappable { read, write, c }),
        }
    }

    pub fn decode(&mut self, src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
        let (res, read, write) = self
            .decoder
            .decode_to_utf8_without_replacement(src, dst, false);
        match res {
            DecoderResult::OutputFull if read == 0 => Err(EncodingError::BufferTooShort),
            DecoderResult::OutputFull | DecoderResult::InputEmpty => Ok((read, write)),
            DecoderResult::Malformed(_, _) => Err(EncodingError::Malformed { read, write }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl From<&'static Encoding> for PredefinedEncodingHandler {
    fn from(value: &'static Encoding) -> Self {
        Self {
            name: value.name(),
            encoding: value,
            encoder: value.new_encoder(),
            decoder: value.new_decoder_without_bom_handling(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuiltinEncodingHandler {
    name: Cow<'static, str>,
    encode: EncoderFunc,
    decode: DecoderFunc,
}

/// Encode each character as long as its encoded form fits `dst`.
fn encode_chars(
    src: &str,
    dst: &mut [u8],
    mut f: impl FnMut(char, &mut [u8]) -> Option<usize>,
) -> Result<(usize, usize), EncodingError> {
    let (mut read, mut write) = (0, 0);
    for c in src.chars() {
        let mut tmp = [0u8; 4];
        let Some(len) = f(c, &mut tmp) else {
            return Err(EncodingError::Unmappable {
                read: read + c.len_utf8(),
                write,
                c,
            });
        };
        if write + len > dst.len() {
            break;
        }
        dst[write..write + len].copy_from_slice(&tmp[..len]);
        read += c.len_utf8();
        write += len;
    }
    if read == 0 && !src.is_empty() {
        return Err(EncodingError::BufferTooShort);
    }
    Ok((read, write))
}

fn encode_utf16le(src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    encode_chars(src, dst, |c, out| {
        let mut buf = [0u16; 2];
        let units = c.encode_utf16(&mut buf);
        for (i, &unit) in units.iter().enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
        }
        Some(units.len() * 2)
    })
}

fn encode_utf16be(src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    encode_chars(src, dst, |c, out| {
        let mut buf = [0u16; 2];
        let units = c.encode_utf16(&mut buf);
        for (i, &unit) in units.iter().enumerate() {
            out[i * 2..i * 2 + 2].copy_from_slice(&unit.to_be_bytes());
        }
        Some(units.len() * 2)
    })
}

fn encode_latin1(src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    encode_chars(src, dst, |c, out| {
        u8::try_from(c as u32).ok().map(|b| {
            out[0] = b;
            1
        })
    })
}

fn encode_ascii(src: &str, dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    encode_chars(src, dst, |c, out| {
        c.is_ascii().then(|| {
            out[0] = c as u8;
            1
        })
    })
}

fn decode_utf16(
    src: &[u8],
    dst: &mut [u8],
    unit: fn([u8; 2]) -> u16,
) -> Result<(usize, usize), EncodingError> {
    let (mut read, mut write) = (0, 0);
    let units = src.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    for c in char::decode_utf16(units) {
        match c {
            Ok(c) => {
                let len = c.len_utf8();
                if write + len > dst.len() {
                    break;
                }
                c.encode_utf8(&mut dst[write..]);
                read += c.len_utf16() * 2;
                write += len;
            }
            // a surrogate pair may be split at the end of the input
            Err(_) if read + 2 >= src.len() => break,
            Err(_) => {
                return Err(EncodingError::Malformed {
                    read: read + 2,
                    write,
                });
            }
        }
    }
    if read == 0 && src.len() >= 2 {
        Err(EncodingError::BufferTooShort)
    } else {
        Ok((read, write))
    }
}

fn decode_utf16le(src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    decode_utf16(src, dst, u16::from_le_bytes)
}

fn decode_utf16be(src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    decode_utf16(src, dst, u16::from_be_bytes)
}

fn decode_latin1(src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    let (mut read, mut write) = (0, 0);
    for &b in src {
        let c = char::from(b);
        if write + c.len_utf8() > dst.len() {
            break;
        }
        c.encode_utf8(&mut dst[write..]);
        read += 1;
        write += c.len_utf8();
    }
    Ok((read, write))
}

fn decode_ascii(src: &[u8], dst: &mut [u8]) -> Result<(usize, usize), EncodingError> {
    let len = src.len().min(dst.len());
    if let Some(pos) = src[..len].iter().position(|b| !b.is_ascii()) {
        dst[..pos].copy_from_slice(&src[..pos]);
        return Err(EncodingError::Malformed {
            read: pos + 1,
            write: pos,
        });
    }
    dst[..len].copy_from_slice(&src[..len]);
    Ok((len, len))
}

const UTF16LE_HANDLER: BuiltinEncodingHandler = BuiltinEncodingHandler {
    name: Cow::Borrowed("UTF-16LE"),
    encode: encode_utf16le,
    decode: decode_utf16le,
};

const UTF16BE_HANDLER: BuiltinEncodingHandler = BuiltinEncodingHandler {
    name: Cow::Borrowed("UTF-16BE"),
    encode: encode_utf16be,
    decode: decode_utf16be,
};

const ISO8859_1_HANDLER: BuiltinEncodingHandler = BuiltinEncodingHandler {
    name: Cow::Borrowed("ISO-8859-1"),
    encode: encode_latin1,
    decode: decode_latin1,
};

const ASCII_HANDLER: BuiltinEncodingHandler = BuiltinEncodingHandler {
    name: Cow::Borrowed("ASCII"),
    encode: encode_ascii,
    decode: decode_ascii,
};

// HTML output is plain ASCII, characters outside of it become character references.
#[cfg(feature = "html")]
const HTML_HANDLER: BuiltinEncodingHandler = BuiltinEncodingHandler {
    name: Cow::Borrowed("HTML"),
    encode: encode_ascii,
    decode: decode_ascii,
};

/// Search in the registered set the handler able to read/write that encoding.
#[doc(alias = "xmlGetCharEncodingHandler")]
pub fn get_encoding_handler(enc: XmlCharEncoding) -> Option<XmlCharEncodingHandler> {
    match enc {
        XmlCharEncoding::Error | XmlCharEncoding::None | XmlCharEncoding::UTF8 => None,
        // encoding_rs provides no UTF-16 encoders
        XmlCharEncoding::UTF16LE => Some(XmlCharEncodingHandler::Builtin(UTF16LE_HANDLER)),
        XmlCharEncoding::UTF16BE => Some(XmlCharEncodingHandler::Builtin(UTF16BE_HANDLER)),
        // encoding_rs maps this label to windows-1252
        XmlCharEncoding::ISO8859_1 => Some(XmlCharEncodingHandler::Builtin(ISO8859_1_HANDLER)),
        XmlCharEncoding::ASCII => Some(XmlCharEncodingHandler::Builtin(ASCII_HANDLER)),
        XmlCharEncoding::ISO8859_2 => Some(XmlCharEncodingHandler::Predefined(ISO_8859_2.into())),
        XmlCharEncoding::ISO8859_15 => Some(XmlCharEncodingHandler::Predefined(ISO_8859_15.into())),
        XmlCharEncoding::ISO2022JP => Some(XmlCharEncodingHandler::Predefined(ISO_2022_JP.into())),
        XmlCharEncoding::ShiftJIS => Some(XmlCharEncodingHandler::Predefined(SHIFT_JIS.into())),
        XmlCharEncoding::EUCJP => Some(XmlCharEncodingHandler::Predefined(EUC_JP.into())),
    }
}

/// Search the handler able to read/write the encoding named `name`.
///
/// Reports `XmlErrUnsupportedEncoding` through the error channel and returns `None`
/// if nothing matches.
#[doc(alias = "xmlFindCharEncodingHandler")]
pub fn find_encoding_handler(name: &str) -> Option<XmlCharEncodingHandler> {
    let upper = name.to_uppercase();
    match upper.as_str() {
        "UTF-8" | "UTF8" => return Some(XmlCharEncodingHandler::Predefined(UTF_8.into())),
        "UTF-16" | "UTF16" => return Some(XmlCharEncodingHandler::Builtin(UTF16LE_HANDLER)),
        #[cfg(feature = "html")]
        "HTML" => return Some(XmlCharEncodingHandler::Builtin(HTML_HANDLER)),
        _ => {}
    }
    if let Some(handler) = upper
        .parse::<XmlCharEncoding>()
        .ok()
        .and_then(get_encoding_handler)
    {
        return Some(handler);
    }
    if let Some(encoding) = Encoding::for_label(name.trim().as_bytes()) {
        return Some(XmlCharEncodingHandler::Predefined(encoding.into()));
    }
    xml_simple_error(
        XmlErrorDomain::XmlFromI18N,
        XmlParserErrors::XmlErrUnsupportedEncoding,
        None,
        Some(name),
    );
    None
}

/// Guess the encoding of the entity using the first bytes of the entity content.
#[doc(alias = "xmlDetectCharEncoding")]
pub fn detect_encoding(input: &[u8]) -> XmlCharEncoding {
    match input {
        [0x3C, 0x3F, 0x78, 0x6D, ..] => XmlCharEncoding::UTF8,
        [0x3C, 0x00, 0x3F, 0x00, ..] => XmlCharEncoding::UTF16LE,
        [0x00, 0x3C, 0x00, 0x3F, ..] => XmlCharEncoding::UTF16BE,
        [0xEF, 0xBB, 0xBF, ..] => XmlCharEncoding::UTF8,
        [0xFE, 0xFF, ..] => XmlCharEncoding::UTF16BE,
        [0xFF, 0xFE, ..] => XmlCharEncoding::UTF16LE,
        _ => XmlCharEncoding::None,
    }
}

impl PredefinedEncodingHandler {
    /// The `encoding_rs` encoding behind this handler.
    pub fn encoding(&self) -> &'static Encoding {
        self.encoding
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_reports_unmappable_characters() {
        let mut handler = find_encoding_handler("iso-8859-1").unwrap();
        let mut out = [0u8; 16];
        assert_eq!(handler.encode("caf\u{e9}", &mut out).unwrap(), (5, 4));
        assert_eq!(&out[..4], b"caf\xE9");
        match handler.encode("a\u{3042}", &mut out) {
            Err(EncodingError::Unmappable { read, write, c }) => {
                assert_eq!((read, write, c), (4, 1, '\u{3042}'));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn utf16_round_trips_through_builtin_handlers() {
        let mut handler = get_encoding_handler(XmlCharEncoding::UTF16BE).unwrap();
        let mut encoded = [0u8; 8];
        let (_, write) = handler.encode("a\u{1F600}", &mut encoded).unwrap();
        assert_eq!(write, 6);
        let mut decoded = [0u8; 8];
        let (read, write) = handler.decode(&encoded[..6], &mut decoded).unwrap();
        assert_eq!(read, 6);
        assert_eq!(std::str::from_utf8(&decoded[..write]).unwrap(), "a\u{1F600}");
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        assert!(find_encoding_handler("no-such-encoding").is_none());
        assert!(find_encoding_handler("Shift_JIS").is_some());
    }
}
