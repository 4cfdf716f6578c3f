//! Message parsing: header decoding, MIME traversal, unsubscribe detection and
//! record extraction.

pub mod header;
pub mod message;
pub mod mime;
pub mod unsubscribe;

pub use message::{parse_message, ParsedMessage};
