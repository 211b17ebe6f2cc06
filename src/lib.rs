//! Penntree: Penn Treebank bracket parsing and constituency tree queries
//!
//! Parses bracket notation into labeled trees, answers label-pattern queries
//! over them, and derives simple facts about each sentence. Tagging and
//! parsing raw text is left to an external backend behind `TagAndParse`.

// Core modules
pub mod batch; // Batch tagging/parsing through an external backend
pub mod penn; // Bracket notation parser
pub mod sentence; // Tagged words + tree per sentence
pub mod tree; // Arena-backed constituency trees

// Python bindings
#[cfg(feature = "pyo3")]
pub mod python;

// Re-exports for convenience
pub use batch::{
    BatchError, BatchMode, BatchRequest, CollaboratorError, RawResult, TagAndParse,
    parse_sentences,
};
pub use penn::{ParseError, parse, parse_forest};
pub use sentence::{SentenceAnalysis, TaggedWord};
pub use tree::{Node, NodeId, NodeRef, Tree};
