//! Feed ingestion: fetching, decoding, and parsing configured sources.

mod client;
mod fetcher;
mod parser;
mod types;

pub use self::fetcher::fetch_all;
pub use self::parser::{parse_entries, strip_markup};
pub use self::types::{FetchReport, RawEntry};
