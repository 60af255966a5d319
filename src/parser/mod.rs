//! Byte-level parsing support shared by the text format readers.
//!
//! This module provides a low-level byte parser with line tracking, its
//! byte source abstraction and the error type of all morphology readers.

pub mod byte_parser;
pub mod byte_source;
pub mod parsing_error;

pub use byte_parser::{ByteParser, ConsumeMode};
pub use parsing_error::{ParsingError, ParsingErrorType};
