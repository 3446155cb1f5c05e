//! Character encodings for loading and saving documents.
//!
//! Unicode encodings with a byte order mark are recognized from the first bytes of a file.
//! Everything else is decoded strictly: an undecodable sequence or an unmappable character
//! is reported as a [`FileError`] instead of being replaced.

use crate::error::FileError;
use encoding_rs::{DecoderResult, EncoderResult, Encoding};
use std::fmt;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];
const UTF16LE_BOM: &[u8] = &[0xFF, 0xFE];
const UTF16BE_BOM: &[u8] = &[0xFE, 0xFF];
const UTF32LE_BOM: &[u8] = &[0xFF, 0xFE, 0x00, 0x00];
const UTF32BE_BOM: &[u8] = &[0x00, 0x00, 0xFE, 0xFF];

/// A concrete text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextEncoding {
    /// 7-bit ASCII. Reported when a file only contains ASCII bytes.
    Ascii,
    /// UTF-8 without a byte order mark.
    Utf8,
    /// UTF-8 with a byte order mark.
    Utf8Bom,
    /// UTF-16 little endian without a byte order mark.
    Utf16Le,
    /// UTF-16 little endian with a byte order mark.
    Utf16LeBom,
    /// UTF-16 big endian without a byte order mark.
    Utf16Be,
    /// UTF-16 big endian with a byte order mark.
    Utf16BeBom,
    /// UTF-32 little endian without a byte order mark.
    Utf32Le,
    /// UTF-32 little endian with a byte order mark.
    Utf32LeBom,
    /// UTF-32 big endian without a byte order mark.
    Utf32Be,
    /// UTF-32 big endian with a byte order mark.
    Utf32BeBom,
    /// Any other encoding known to `encoding_rs` (GBK, Shift_JIS, windows-1252, ...).
    Legacy(&'static Encoding),
}

impl TextEncoding {
    /// Resolve an encoding label (`"utf-8"`, `"UTF-16LE"`, `"gbk"`, `"utf-8 bom"`, ...).
    ///
    /// UTF-16 and UTF-32 labels resolve to the byte order mark variant, since files without
    /// one cannot be recognized again by [`EncodingHint::Auto`].
    pub fn for_label(label: &str) -> Result<Self, FileError> {
        let normalized = label.trim().to_ascii_lowercase().replace('_', "-");
        let encoding = match normalized.as_str() {
            "ascii" | "us-ascii" => Self::Ascii,
            "utf-8-bom" | "utf-8 bom" | "utf8-bom" | "utf8 bom" => Self::Utf8Bom,
            "utf-32le" | "utf32le" | "utf-32" => Self::Utf32LeBom,
            "utf-32be" | "utf32be" => Self::Utf32BeBom,
            _ => {
                let Some(encoding) = Encoding::for_label(normalized.as_bytes()) else {
                    return Err(FileError::UnknownEncoding(label.to_string()));
                };
                Self::from_encoding_rs(encoding)
            }
        };
        Ok(encoding)
    }

    fn from_encoding_rs(encoding: &'static Encoding) -> Self {
        if encoding == encoding_rs::UTF_8 {
            Self::Utf8
        } else if encoding == encoding_rs::UTF_16LE {
            Self::Utf16LeBom
        } else if encoding == encoding_rs::UTF_16BE {
            Self::Utf16BeBom
        } else {
            Self::Legacy(encoding)
        }
    }

    /// Display name of the encoding.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ascii => "ASCII",
            Self::Utf8 => "UTF-8",
            Self::Utf8Bom => "UTF-8 BOM",
            Self::Utf16Le => "UTF-16LE",
            Self::Utf16LeBom => "UTF-16LE BOM",
            Self::Utf16Be => "UTF-16BE",
            Self::Utf16BeBom => "UTF-16BE BOM",
            Self::Utf32Le => "UTF-32LE",
            Self::Utf32LeBom => "UTF-32LE BOM",
            Self::Utf32Be => "UTF-32BE",
            Self::Utf32BeBom => "UTF-32BE BOM",
            Self::Legacy(encoding) => encoding.name(),
        }
    }

    /// The byte order mark written in front of the content, if any.
    pub fn bom(self) -> &'static [u8] {
        match self {
            Self::Utf8Bom => UTF8_BOM,
            Self::Utf16LeBom => UTF16LE_BOM,
            Self::Utf16BeBom => UTF16BE_BOM,
            Self::Utf32LeBom => UTF32LE_BOM,
            Self::Utf32BeBom => UTF32BE_BOM,
            _ => &[],
        }
    }

    /// The same encoding without its byte order mark.
    pub fn without_bom(self) -> Self {
        match self {
            Self::Utf8Bom => Self::Utf8,
            Self::Utf16LeBom => Self::Utf16Le,
            Self::Utf16BeBom => Self::Utf16Be,
            Self::Utf32LeBom => Self::Utf32Le,
            Self::Utf32BeBom => Self::Utf32Be,
            other => other,
        }
    }

    /// Whether the encoding represents every Unicode scalar value.
    pub fn is_unicode(self) -> bool {
        !matches!(self, Self::Ascii | Self::Legacy(_))
    }

    fn is_wide(self) -> bool {
        matches!(
            self.without_bom(),
            Self::Utf16Le | Self::Utf16Be | Self::Utf32Le | Self::Utf32Be
        )
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How to choose the encoding when loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodingHint {
    /// Byte order mark first, then ASCII / UTF-8, then a statistical guess.
    #[default]
    Auto,
    /// Use exactly this encoding. A contradicting byte order mark is an error.
    Exact(TextEncoding),
}

/// Text decoded from bytes, with the encoding that was actually used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The decoded text, without byte order mark.
    pub text: String,
    /// The encoding the bytes were decoded with.
    pub encoding: TextEncoding,
}

/// Find a byte order mark at the start of `bytes`.
pub fn sniff_bom(bytes: &[u8]) -> Option<TextEncoding> {
    // UTF-32LE must be tested before UTF-16LE, their marks share a prefix.
    [
        TextEncoding::Utf8Bom,
        TextEncoding::Utf32LeBom,
        TextEncoding::Utf32BeBom,
        TextEncoding::Utf16LeBom,
        TextEncoding::Utf16BeBom,
    ]
    .into_iter()
    .find(|encoding| bytes.starts_with(encoding.bom()))
}

/// Decode `bytes` according to `hint`.
pub fn decode(bytes: &[u8], hint: EncodingHint) -> Result<Decoded, FileError> {
    let bom = sniff_bom(bytes);
    match (hint, bom) {
        (EncodingHint::Auto, Some(found)) => {
            let text = decode_exact(&bytes[found.bom().len()..], found, found.bom().len())?;
            Ok(Decoded {
                text,
                encoding: found,
            })
        }
        (EncodingHint::Auto, None) => decode_detect(bytes),
        (EncodingHint::Exact(requested), Some(found)) => {
            if requested.without_bom() != found.without_bom() {
                return Err(FileError::BomMismatch { requested, found });
            }
            let text = decode_exact(&bytes[found.bom().len()..], found, found.bom().len())?;
            Ok(Decoded {
                text,
                encoding: found,
            })
        }
        (EncodingHint::Exact(requested), None) => {
            // A file without a mark is saved back without one.
            let encoding = requested.without_bom();
            if !encoding.is_wide() {
                check_binary(bytes)?;
            }
            let text = decode_exact(bytes, encoding, 0)?;
            Ok(Decoded { text, encoding })
        }
    }
}

fn decode_detect(bytes: &[u8]) -> Result<Decoded, FileError> {
    check_binary(bytes)?;
    if bytes.is_ascii() {
        return Ok(Decoded {
            text: decode_exact(bytes, TextEncoding::Ascii, 0)?,
            encoding: TextEncoding::Ascii,
        });
    }
    if let Ok(text) = decode_strict(encoding_rs::UTF_8, bytes) {
        return Ok(Decoded {
            text,
            encoding: TextEncoding::Utf8,
        });
    }

    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    let guess = TextEncoding::from_encoding_rs(detector.guess(None, true));
    tracing::debug!(encoding = %guess, "content is not UTF-8, using detected encoding");
    Ok(Decoded {
        text: decode_exact(bytes, guess, 0)?,
        encoding: guess,
    })
}

fn check_binary(bytes: &[u8]) -> Result<(), FileError> {
    match bytes.iter().position(|b| *b == 0) {
        Some(offset) => Err(FileError::BinaryFile { offset }),
        None => Ok(()),
    }
}

/// Decode `payload` (already stripped of its byte order mark) with exactly `encoding`.
///
/// `base` is added to reported error offsets.
fn decode_exact(payload: &[u8], encoding: TextEncoding, base: usize) -> Result<String, FileError> {
    let malformed = |offset: usize| FileError::Malformed {
        encoding,
        offset: base + offset,
    };
    match encoding {
        TextEncoding::Ascii => match payload.iter().position(|b| !b.is_ascii()) {
            Some(offset) => Err(malformed(offset)),
            None => decode_strict(encoding_rs::UTF_8, payload).map_err(malformed),
        },
        TextEncoding::Utf8 | TextEncoding::Utf8Bom => {
            decode_strict(encoding_rs::UTF_8, payload).map_err(malformed)
        }
        TextEncoding::Utf16Le | TextEncoding::Utf16LeBom => {
            decode_strict(encoding_rs::UTF_16LE, payload).map_err(malformed)
        }
        TextEncoding::Utf16Be | TextEncoding::Utf16BeBom => {
            decode_strict(encoding_rs::UTF_16BE, payload).map_err(malformed)
        }
        TextEncoding::Utf32Le | TextEncoding::Utf32LeBom => {
            decode_utf32(payload, u32::from_le_bytes).map_err(malformed)
        }
        TextEncoding::Utf32Be | TextEncoding::Utf32BeBom => {
            decode_utf32(payload, u32::from_be_bytes).map_err(malformed)
        }
        TextEncoding::Legacy(encoding) => decode_strict(encoding, payload).map_err(malformed),
    }
}

/// Decode without replacement, returning the offset of the first malformed sequence.
fn decode_strict(encoding: &'static Encoding, bytes: &[u8]) -> Result<String, usize> {
    let mut decoder = encoding.new_decoder_without_bom_handling();
    let capacity = decoder
        .max_utf8_buffer_length_without_replacement(bytes.len())
        .unwrap_or(bytes.len().saturating_mul(3));
    let mut out = String::with_capacity(capacity);
    let mut read_total = 0usize;
    loop {
        let (result, read) =
            decoder.decode_to_string_without_replacement(&bytes[read_total..], &mut out, true);
        read_total += read;
        match result {
            DecoderResult::InputEmpty => return Ok(out),
            DecoderResult::OutputFull => out.reserve(bytes.len() - read_total + 16),
            DecoderResult::Malformed(bad, pending) => {
                return Err(read_total.saturating_sub(bad as usize + pending as usize));
            }
        }
    }
}

fn decode_utf32(bytes: &[u8], to_u32: fn([u8; 4]) -> u32) -> Result<String, usize> {
    let mut out = String::with_capacity(bytes.len() / 4);
    let mut chunks = bytes.chunks_exact(4);
    for (i, chunk) in chunks.by_ref().enumerate() {
        let unit = to_u32([chunk[0], chunk[1], chunk[2], chunk[3]]);
        match char::from_u32(unit) {
            Some(ch) => out.push(ch),
            None => return Err(i * 4),
        }
    }
    if !chunks.remainder().is_empty() {
        return Err(bytes.len() - chunks.remainder().len());
    }
    Ok(out)
}

/// Encode `text` with `encoding`, including its byte order mark if it has one.
pub fn encode(text: &str, encoding: TextEncoding) -> Result<Vec<u8>, FileError> {
    let mut out = Vec::with_capacity(text.len() + 4);
    out.extend_from_slice(encoding.bom());
    match encoding {
        TextEncoding::Ascii => {
            if let Some(ch) = text.chars().find(|c| !c.is_ascii()) {
                return Err(FileError::Unmappable { encoding, ch });
            }
            out.extend_from_slice(text.as_bytes());
        }
        TextEncoding::Utf8 | TextEncoding::Utf8Bom => out.extend_from_slice(text.as_bytes()),
        TextEncoding::Utf16Le | TextEncoding::Utf16LeBom => {
            out.extend(text.encode_utf16().flat_map(u16::to_le_bytes));
        }
        TextEncoding::Utf16Be | TextEncoding::Utf16BeBom => {
            out.extend(text.encode_utf16().flat_map(u16::to_be_bytes));
        }
        TextEncoding::Utf32Le | TextEncoding::Utf32LeBom => {
            out.extend(text.chars().flat_map(|c| u32::from(c).to_le_bytes()));
        }
        TextEncoding::Utf32Be | TextEncoding::Utf32BeBom => {
            out.extend(text.chars().flat_map(|c| u32::from(c).to_be_bytes()));
        }
        TextEncoding::Legacy(legacy) => encode_legacy(text, legacy, encoding, &mut out)?,
    }
    Ok(out)
}

fn encode_legacy(
    text: &str,
    legacy: &'static Encoding,
    encoding: TextEncoding,
    out: &mut Vec<u8>,
) -> Result<(), FileError> {
    let mut encoder = legacy.new_encoder();
    let needed = encoder
        .max_buffer_length_from_utf8_without_replacement(text.len())
        .unwrap_or(text.len().saturating_mul(4));
    out.reserve(needed);
    let mut read_total = 0usize;
    loop {
        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&text[read_total..], out, true);
        read_total += read;
        match result {
            EncoderResult::InputEmpty => return Ok(()),
            EncoderResult::OutputFull => out.reserve(text.len() - read_total + 16),
            EncoderResult::Unmappable(ch) => return Err(FileError::Unmappable { encoding, ch }),
        }
    }
}
