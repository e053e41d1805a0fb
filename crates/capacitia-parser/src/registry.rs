use crate::encodings::{Latin1Decoder, Utf8Decoder, Windows1252Decoder};
use crate::errors::{DecodeAttempt, ParserError};
use crate::model::TextEncoding;

pub trait TextDecoder {
    fn encoding(&self) -> TextEncoding;
    fn decode(&self, bytes: &[u8]) -> Result<String, ParserError>;
}

/// Decodes `bytes` with the first encoding that accepts them: UTF-8, then
/// Windows-1252, then ISO-8859-1.
pub fn decode_source(bytes: &[u8]) -> Result<(TextEncoding, String), ParserError> {
    let utf8 = Utf8Decoder;
    let windows1252 = Windows1252Decoder;
    let latin1 = Latin1Decoder;
    let decoders: [&dyn TextDecoder; 3] = [&utf8, &windows1252, &latin1];
    decode_with_decoders(bytes, &decoders)
}

pub fn decode_with_decoders(
    bytes: &[u8],
    decoders: &[&dyn TextDecoder],
) -> Result<(TextEncoding, String), ParserError> {
    let mut attempts = Vec::new();

    for decoder in decoders {
        match decoder.decode(bytes) {
            Ok(text) => return Ok((decoder.encoding(), text)),
            Err(ParserError::EncodingMismatch { encoding, reason }) => {
                attempts.push(DecodeAttempt::new(encoding, reason));
            }
            Err(err) => return Err(err),
        }
    }

    Err(ParserError::Undecodable { attempts })
}
