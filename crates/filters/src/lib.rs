//! Source-code quality heuristics
//!
//! Currently provides the comment-density oracle used by the comments gate.

pub mod comments;

pub use comments::{CommentDensity, CommentRatio, CommentStyle};
