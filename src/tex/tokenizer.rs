/*! The per-file lexer: turns one file's text into a [`Token`] stream.

   Only the lexical structure needed downstream is modeled: control words
   and control symbols, group delimiters, and literal characters. `%`
   comments are dropped up to (not including) the line break, as a TeX
   tokenizer would. No space collapsing takes place -- whitespace survives
   as ordinary tokens so that a span's source text can be reconstructed
   verbatim.
*/

use crate::errors::TexError;
use crate::tex::token::{SourceRef, Token, TokenKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct TokenStream {
    file: Arc<PathBuf>,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
}

impl TokenStream {
    pub fn new(file: PathBuf, text: &str) -> Self {
        Self {
            file: Arc::new(file),
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
        }
    }

    /// Reads `path` eagerly; the OS handle is released before this returns.
    pub fn from_file(path: &Path) -> Result<Self, TexError> {
        let text = std::fs::read_to_string(path).map_err(|source| TexError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(path.to_path_buf(), &text))
    }

    fn here(&self) -> SourceRef {
        SourceRef {
            file: self.file.clone(),
            line: self.line,
            col: self.col,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }
}

impl Iterator for TokenStream {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let at = self.here();
            let kind = match self.bump()? {
                '\\' => match self.peek() {
                    Some(c) if c.is_ascii_alphabetic() => {
                        let mut name = String::new();
                        while let Some(c) = self.peek() {
                            if !c.is_ascii_alphabetic() {
                                break;
                            }
                            name.push(c);
                            self.bump();
                        }
                        TokenKind::ControlWord(name)
                    }
                    // control symbol: the single next character is the name
                    Some(c) => {
                        self.bump();
                        TokenKind::ControlWord(c.to_string())
                    }
                    // stray backslash at end of file
                    None => TokenKind::Other('\\'),
                },
                '{' => TokenKind::BeginGroup,
                '}' => TokenKind::EndGroup,
                '%' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    continue;
                }
                c if c.is_alphabetic() => TokenKind::Character(c),
                c => TokenKind::Other(c),
            };
            return Some(Token { kind, at });
        }
    }
}
