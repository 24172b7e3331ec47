/*! A [`Token`] is -- conceptually -- either a control word, a group
   delimiter, or a literal character. Tokens are produced once by the
   [tokenizer](super::tokenizer) and never mutated; each one carries the
   [`SourceRef`] it originated from.
*/

use std::fmt::{Debug, Display, Formatter};
use std::path::PathBuf;
use std::sync::Arc;

/// Where a token came from: file, line and column (both 1-based).
#[derive(Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub file: Arc<PathBuf>,
    pub line: usize,
    pub col: usize,
}

impl Display for SourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file.display(), self.line, self.col)
    }
}
impl Debug for SourceRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// `\foo`, or a control symbol like `\%` (single-character name).
    ControlWord(String),
    /// `{`
    BeginGroup,
    /// `}`
    EndGroup,
    /// A letter.
    Character(char),
    /// Anything else: digits, punctuation, whitespace.
    Other(char),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub at: SourceRef,
}

impl Token {
    /// The directive payload; only valid for control-word tokens.
    pub fn control_word(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::ControlWord(name) => Some(name),
            _ => None,
        }
    }

    pub fn is_begin_group(&self) -> bool {
        matches!(self.kind, TokenKind::BeginGroup)
    }

    pub fn is_end_group(&self) -> bool {
        matches!(self.kind, TokenKind::EndGroup)
    }

    /// Appends this token's verbatim source text to `out`.
    pub fn write_raw(&self, out: &mut String) {
        match &self.kind {
            TokenKind::ControlWord(name) => {
                out.push('\\');
                out.push_str(name);
            }
            TokenKind::BeginGroup => out.push('{'),
            TokenKind::EndGroup => out.push('}'),
            TokenKind::Character(c) | TokenKind::Other(c) => out.push(*c),
        }
    }
}
