//! Comment density of source files
//!
//! Estimates how much of a file is natural language by measuring the bytes
//! covered by comments (and, for Python, docstrings). String literals are
//! matched alongside comments so that comment markers inside strings, such
//! as the `//` in `"https://..."`, are not mistaken for comments.

use regex::Regex;
use std::sync::OnceLock;

/// Scores a source file's comment density.
///
/// Implementations must be pure and must not panic: empty content and
/// unknown languages score `0.0`.
pub trait CommentDensity: Send + Sync {
    /// Fraction of `content` in `[0, 1]` that is comment text.
    /// `language` is expected to be lower-cased.
    fn ratio(&self, content: &str, language: &str) -> f64;
}

/// Comment syntax families
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//` line comments, `/* */` blocks, `"` and `'` strings
    CFamily,
    /// Like `CFamily` but `'` starts lifetimes and labels, not strings
    Rust,
    /// `#` comments and triple-quoted docstrings
    Python,
    /// `#` line comments
    Hash,
    /// `--` line comments
    DoubleDash,
    /// `<!-- -->` blocks
    Markup,
}

impl CommentStyle {
    /// Comment syntax for a lower-cased language tag
    pub fn for_language(language: &str) -> Option<Self> {
        let style = match language {
            "c" | "c++" | "cpp" | "c#" | "csharp" | "java" | "javascript" | "js"
            | "typescript" | "ts" | "go" | "kotlin" | "scala" | "swift" | "php" | "dart"
            | "objective-c" | "cuda" | "solidity" | "groovy" => CommentStyle::CFamily,
            "rust" => CommentStyle::Rust,
            "python" | "py" => CommentStyle::Python,
            "shell" | "bash" | "sh" | "ruby" | "perl" | "r" | "yaml" | "dockerfile"
            | "makefile" | "cmake" | "powershell" | "julia" | "elixir" | "nim" => {
                CommentStyle::Hash
            }
            "sql" | "lua" | "haskell" | "ada" | "vhdl" => CommentStyle::DoubleDash,
            "html" | "xml" | "markdown" | "svg" => CommentStyle::Markup,
            _ => return None,
        };
        Some(style)
    }

    fn pattern(self) -> &'static Regex {
        // Alternation order matters: comments come before strings so a
        // docstring opener is not read as an empty string.
        static C_FAMILY: OnceLock<Regex> = OnceLock::new();
        static RUST: OnceLock<Regex> = OnceLock::new();
        static PYTHON: OnceLock<Regex> = OnceLock::new();
        static HASH: OnceLock<Regex> = OnceLock::new();
        static DOUBLE_DASH: OnceLock<Regex> = OnceLock::new();
        static MARKUP: OnceLock<Regex> = OnceLock::new();

        let (cell, source) = match self {
            CommentStyle::CFamily => (
                &C_FAMILY,
                r#"(?P<comment>//[^\n]*|/\*(?s:.*?)(?:\*/|\z))|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
            ),
            CommentStyle::Rust => (
                &RUST,
                r#"(?P<comment>//[^\n]*|/\*(?s:.*?)(?:\*/|\z))|'(?:[^'\\\n]|\\u\{[0-9a-fA-F]{1,6}\}|\\.)'|"(?:[^"\\]|\\.)*""#,
            ),
            CommentStyle::Python => (
                &PYTHON,
                r#"(?P<comment>#[^\n]*|"""(?s:.*?)(?:"""|\z)|'''(?s:.*?)(?:'''|\z))|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
            ),
            CommentStyle::Hash => (
                &HASH,
                r#"(?P<comment>#[^\n]*)|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
            ),
            CommentStyle::DoubleDash => (
                &DOUBLE_DASH,
                r#"(?P<comment>--[^\n]*)|"(?:[^"\\\n]|\\.)*"|'(?:[^'\\\n]|\\.)*'"#,
            ),
            CommentStyle::Markup => (&MARKUP, r#"(?P<comment><!--(?s:.*?)(?:-->|\z))"#),
        };

        cell.get_or_init(|| Regex::new(source).expect("comment pattern is valid"))
    }

    /// Total bytes of comment text in `content`
    pub fn comment_bytes(self, content: &str) -> usize {
        self.pattern()
            .captures_iter(content)
            .filter_map(|caps| caps.name("comment"))
            .map(|m| m.as_str().len())
            .sum()
    }
}

/// Regex-driven comment density: comment bytes over total bytes
#[derive(Debug, Clone, Copy, Default)]
pub struct CommentRatio;

impl CommentRatio {
    pub fn new() -> Self {
        Self
    }
}

impl CommentDensity for CommentRatio {
    fn ratio(&self, content: &str, language: &str) -> f64 {
        if content.is_empty() {
            return 0.0;
        }
        match CommentStyle::for_language(language) {
            Some(style) => style.comment_bytes(content) as f64 / content.len() as f64,
            None => 0.0,
        }
    }
}
