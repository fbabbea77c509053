//! Shell command parsing.

mod nested;
mod splitter;
mod tokenizer;
mod unparseable;
mod wrappers;

pub use nested::{
    ExtractedCommand, NestedKind, ParallelParts, extract_embedded, extract_nested,
    find_exec_commands, parallel_parts, xargs_command_start,
};
pub use splitter::{CommandSegment, Operator, join_segments, split_commands};
pub use tokenizer::{Token, TokenKind, join_words, quote, tokenize, words};
pub use unparseable::{UnparseableConstruct, detect_unparseable};
pub use wrappers::{StrippedCommand, basename, strip_wrappers};
