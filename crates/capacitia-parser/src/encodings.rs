use crate::errors::ParserError;
use crate::model::TextEncoding;
use crate::registry::TextDecoder;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Windows-1252 code points for bytes 0x80..=0x9F; `None` marks the five
/// bytes the code page leaves undefined.
const WINDOWS_1252_HIGH: [Option<char>; 32] = [
    Some('\u{20AC}'),
    None,
    Some('\u{201A}'),
    Some('\u{0192}'),
    Some('\u{201E}'),
    Some('\u{2026}'),
    Some('\u{2020}'),
    Some('\u{2021}'),
    Some('\u{02C6}'),
    Some('\u{2030}'),
    Some('\u{0160}'),
    Some('\u{2039}'),
    Some('\u{0152}'),
    None,
    Some('\u{017D}'),
    None,
    None,
    Some('\u{2018}'),
    Some('\u{2019}'),
    Some('\u{201C}'),
    Some('\u{201D}'),
    Some('\u{2022}'),
    Some('\u{2013}'),
    Some('\u{2014}'),
    Some('\u{02DC}'),
    Some('\u{2122}'),
    Some('\u{0161}'),
    Some('\u{203A}'),
    Some('\u{0153}'),
    None,
    Some('\u{017E}'),
    Some('\u{0178}'),
];

pub struct Utf8Decoder;

impl TextDecoder for Utf8Decoder {
    fn encoding(&self) -> TextEncoding {
        TextEncoding::Utf8
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, ParserError> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        let text = std::str::from_utf8(bytes).map_err(|err| ParserError::EncodingMismatch {
            encoding: TextEncoding::Utf8.as_str(),
            reason: format!("invalid byte sequence at offset {}", err.valid_up_to()),
        })?;
        ensure_text(TextEncoding::Utf8, text)?;
        Ok(text.to_string())
    }
}

pub struct Windows1252Decoder;

impl TextDecoder for Windows1252Decoder {
    fn encoding(&self) -> TextEncoding {
        TextEncoding::Windows1252
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, ParserError> {
        let mut text = String::with_capacity(bytes.len());
        for (offset, &byte) in bytes.iter().enumerate() {
            let ch = match byte {
                0x80..=0x9F => WINDOWS_1252_HIGH[(byte - 0x80) as usize].ok_or_else(|| {
                    ParserError::EncodingMismatch {
                        encoding: TextEncoding::Windows1252.as_str(),
                        reason: format!("undefined byte 0x{byte:02X} at offset {offset}"),
                    }
                })?,
                _ => byte as char,
            };
            text.push(ch);
        }
        ensure_text(TextEncoding::Windows1252, &text)?;
        Ok(text)
    }
}

pub struct Latin1Decoder;

impl TextDecoder for Latin1Decoder {
    fn encoding(&self) -> TextEncoding {
        TextEncoding::Latin1
    }

    fn decode(&self, bytes: &[u8]) -> Result<String, ParserError> {
        let text: String = bytes.iter().map(|&byte| byte as char).collect();
        ensure_text(TextEncoding::Latin1, &text)?;
        Ok(text)
    }
}

/// Every byte is valid in an 8-bit code page, so binary payloads are told apart
/// from text by the C0 control characters a delimited export never contains.
fn ensure_text(encoding: TextEncoding, text: &str) -> Result<(), ParserError> {
    match text
        .char_indices()
        .find(|(_, ch)| (*ch as u32) < 0x20 && !matches!(ch, '\t' | '\n' | '\r'))
    {
        Some((offset, ch)) => Err(ParserError::EncodingMismatch {
            encoding: encoding.as_str(),
            reason: format!(
                "control character U+{:04X} at offset {offset}",
                ch as u32
            ),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn utf8_strips_byte_order_mark() {
        let decoded = Utf8Decoder.decode(b"\xEF\xBB\xBFEVENTO;NOME").unwrap();
        assert_eq!(decoded, "EVENTO;NOME");
    }

    #[test]
    fn windows_1252_maps_smart_quotes_and_rejects_undefined_bytes() {
        let decoded = Windows1252Decoder.decode(b"\x93Sim\x94").unwrap();
        assert_eq!(decoded, "\u{201C}Sim\u{201D}");

        let err = Windows1252Decoder.decode(b"abc\x81").unwrap_err();
        assert!(matches!(err, ParserError::EncodingMismatch { .. }));
    }

    #[test]
    fn latin1_accepts_bytes_windows_1252_leaves_undefined() {
        let decoded = Latin1Decoder.decode(b"\xD3RG\xC3O\x81").unwrap();
        assert_eq!(decoded, "\u{D3}RG\u{C3}O\u{81}");
    }

    #[test]
    fn control_characters_fail_every_decoder() {
        let payload = b"PK\x03\x04binary";
        assert!(Utf8Decoder.decode(payload).is_err());
        assert!(Windows1252Decoder.decode(payload).is_err());
        assert!(Latin1Decoder.decode(payload).is_err());
    }
}
