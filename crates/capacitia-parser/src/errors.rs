use std::fmt;

use thiserror::Error;

#[derive(Debug, Clone)]
pub struct DecodeAttempt {
    pub encoding: &'static str,
    pub message: String,
}

impl DecodeAttempt {
    pub fn new(encoding: &'static str, message: impl Into<String>) -> Self {
        Self {
            encoding,
            message: message.into(),
        }
    }
}

impl fmt::Display for DecodeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.encoding, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ParserError {
    #[error("{encoding} cannot decode source: {reason}")]
    EncodingMismatch {
        encoding: &'static str,
        reason: String,
    },

    #[error("no encoding could decode this source; attempts: {}", format_attempts(.attempts))]
    Undecodable { attempts: Vec<DecodeAttempt> },

    #[error("source did not contain any records")]
    EmptySource,

    #[error(
        "no header row found in the first {searched_rows} records; expected one of {expected:?}"
    )]
    MissingHeader {
        searched_rows: usize,
        expected: Vec<String>,
    },

    #[error("CSV error: {source}")]
    Csv {
        #[source]
        source: csv::Error,
    },
}

fn format_attempts(attempts: &[DecodeAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
