/*! Document tokenization: the per-file lexer, the inclusion resolver that
   merges a multi-file document into one logical token stream, and the
   extractor that segments that stream into equation spans.
*/

use crate::errors::TexError;
use crate::tex::token::{Token, TokenKind};

pub mod equations;
pub mod resolver;
pub mod token;
pub mod tokenizer;

/// A brace-delimited argument group, as read by [`read_argument`].
pub(crate) struct GroupArg {
    /// Verbatim text between the outer braces, inner braces included.
    pub text: String,
    /// Every token consumed while reading, outer braces included.
    pub consumed: Vec<Token>,
}

pub(crate) enum Argument {
    Group(GroupArg),
    /// No group followed: the tokens consumed while looking for one, to be
    /// replayed by the caller.
    Bare(Vec<Token>),
}

/// Reads one argument group off `tokens`, tolerating whitespace before the
/// opening brace. Nesting depth is tracked explicitly: only a closing brace
/// at depth zero ends the group, so arguments may themselves contain braced
/// groups.
pub(crate) fn read_argument<I>(tokens: &mut I) -> Result<Argument, TexError>
where
    I: Iterator<Item = Result<Token, TexError>>,
{
    let mut consumed = Vec::new();
    let open_at = loop {
        match tokens.next() {
            None => return Ok(Argument::Bare(consumed)),
            Some(Err(e)) => return Err(e),
            Some(Ok(t)) => match &t.kind {
                TokenKind::Other(c) if c.is_whitespace() => consumed.push(t),
                TokenKind::BeginGroup => {
                    let at = t.at.clone();
                    consumed.push(t);
                    break at;
                }
                _ => {
                    consumed.push(t);
                    return Ok(Argument::Bare(consumed));
                }
            },
        }
    };
    let mut depth = 0usize;
    let mut text = String::new();
    loop {
        match tokens.next() {
            None => return Err(TexError::UnterminatedGroup { at: open_at }),
            Some(Err(e)) => return Err(e),
            Some(Ok(t)) => {
                let closed = match &t.kind {
                    TokenKind::BeginGroup => {
                        depth += 1;
                        text.push('{');
                        false
                    }
                    TokenKind::EndGroup if depth == 0 => true,
                    TokenKind::EndGroup => {
                        depth -= 1;
                        text.push('}');
                        false
                    }
                    _ => {
                        t.write_raw(&mut text);
                        false
                    }
                };
                consumed.push(t);
                if closed {
                    return Ok(Argument::Group(GroupArg { text, consumed }));
                }
            }
        }
    }
}
