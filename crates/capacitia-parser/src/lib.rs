pub mod encodings;
pub mod errors;
pub mod model;
mod reader;
mod registry;
pub mod schema;

pub use errors::{DecodeAttempt, ParserError};
pub use model::{Delimiter, RawRow, RawTable, SourceSchema, TextEncoding};
pub use reader::{parse_raw_table, DetectOptions, DEFAULT_HEADER_SEARCH_ROWS};
pub use registry::{decode_source, decode_with_decoders, TextDecoder};
pub use schema::{detect_delimiter, normalize_label};
