use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TextEncoding {
    #[serde(rename = "utf-8")]
    Utf8,
    #[serde(rename = "windows-1252")]
    Windows1252,
    #[serde(rename = "iso-8859-1")]
    Latin1,
}

impl TextEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            TextEncoding::Utf8 => "utf-8",
            TextEncoding::Windows1252 => "windows-1252",
            TextEncoding::Latin1 => "iso-8859-1",
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    Semicolon,
    Comma,
}

impl Delimiter {
    pub fn as_char(&self) -> char {
        match self {
            Delimiter::Semicolon => ';',
            Delimiter::Comma => ',',
        }
    }

    pub fn as_byte(&self) -> u8 {
        self.as_char() as u8
    }

    pub fn alternate(&self) -> Delimiter {
        match self {
            Delimiter::Semicolon => Delimiter::Comma,
            Delimiter::Comma => Delimiter::Semicolon,
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}'", self.as_char())
    }
}

/// What the detector learned about a source before any row was interpreted.
#[derive(Debug, Clone, Serialize)]
pub struct SourceSchema {
    pub encoding: TextEncoding,
    pub delimiter: Delimiter,
    /// Zero-based index of the header among the non-empty records of the file.
    pub header_row: usize,
    /// Header cells as they appear in the file.
    pub labels: Vec<String>,
    /// Machine-readable keys derived from `labels`, unique within the schema.
    pub columns: Vec<String>,
}

impl SourceSchema {
    pub fn position(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|candidate| candidate == column)
    }
}

#[derive(Debug, Clone)]
pub struct RawTable {
    pub schema: SourceSchema,
    pub records: Vec<Vec<String>>,
}

impl RawTable {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = RawRow<'_>> {
        self.records.iter().map(move |values| RawRow {
            columns: &self.schema.columns,
            values,
        })
    }
}

/// A borrowed view of one data record keyed by normalized column label.
#[derive(Debug, Clone, Copy)]
pub struct RawRow<'a> {
    columns: &'a [String],
    values: &'a [String],
}

impl<'a> RawRow<'a> {
    pub fn new(columns: &'a [String], values: &'a [String]) -> Self {
        Self { columns, values }
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        let idx = self.columns.iter().position(|candidate| candidate == column)?;
        self.value(idx)
    }

    /// Value at a column position; short records yield `None` for trailing columns.
    pub fn value(&self, idx: usize) -> Option<&'a str> {
        self.values.get(idx).map(String::as_str)
    }
}
