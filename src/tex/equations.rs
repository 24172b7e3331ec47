/*! Streaming segmentation of the merged token stream into equation spans.

   The scanner watches for `\begin{equation}`; once inside, every token is
   accumulated until the matching `\end{equation}`. Equation environments
   do not nest, so a single capturing flag suffices -- an `\end` of some
   other environment seen while capturing is ordinary span content and is
   kept verbatim.
*/

use crate::errors::TexError;
use crate::tex::token::{SourceRef, Token};
use crate::tex::{read_argument, Argument};

const ENVIRONMENT: &str = "equation";

/// One equation's content, delimiting markers excluded.
#[derive(Debug, Clone)]
pub struct TokenSpan {
    /// Zero-based position in document order.
    pub index: usize,
    pub tokens: Vec<Token>,
}

impl TokenSpan {
    /// The canonical source text: every token's literal characters
    /// concatenated in original order.
    pub fn source_text(&self) -> String {
        let mut out = String::new();
        for t in &self.tokens {
            t.write_raw(&mut out);
        }
        out
    }
}

pub struct EquationExtractor<I> {
    tokens: I,
    count: usize,
    done: bool,
}

impl<I> EquationExtractor<I>
where
    I: Iterator<Item = Result<Token, TexError>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            count: 0,
            done: false,
        }
    }

    /// Accumulates span content up to `\end{equation}`. The stream ending
    /// first is an error; a truncated span is never emitted.
    fn capture(&mut self, opened_at: SourceRef) -> Result<Vec<Token>, TexError> {
        let mut span = Vec::new();
        loop {
            match self.tokens.next() {
                None => return Err(TexError::UnterminatedEnvironment { at: opened_at }),
                Some(Err(e)) => return Err(e),
                Some(Ok(t)) => {
                    if t.control_word() != Some("end") {
                        span.push(t);
                        continue;
                    }
                    match read_argument(&mut self.tokens)? {
                        Argument::Group(arg) if arg.text == ENVIRONMENT => return Ok(span),
                        // some other environment ends here: span content
                        Argument::Group(arg) => {
                            span.push(t);
                            span.extend(arg.consumed);
                        }
                        Argument::Bare(rest) => {
                            span.push(t);
                            span.extend(rest);
                        }
                    }
                }
            }
        }
    }
}

impl<I> Iterator for EquationExtractor<I>
where
    I: Iterator<Item = Result<Token, TexError>>,
{
    type Item = Result<TokenSpan, TexError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            let tok = match self.tokens.next() {
                None => return None,
                Some(Err(e)) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Some(Ok(t)) => t,
            };
            if tok.control_word() != Some("begin") {
                continue;
            }
            let opened_at = tok.at.clone();
            match read_argument(&mut self.tokens) {
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
                Ok(Argument::Group(arg)) if arg.text == ENVIRONMENT => {
                    match self.capture(opened_at) {
                        Ok(tokens) => {
                            let index = self.count;
                            self.count += 1;
                            return Some(Ok(TokenSpan { index, tokens }));
                        }
                        Err(e) => {
                            self.done = true;
                            return Some(Err(e));
                        }
                    }
                }
                // some other environment, or `\begin` without a group
                Ok(_) => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tex::tokenizer::TokenStream;
    use std::path::PathBuf;

    fn spans(text: &str) -> Result<Vec<TokenSpan>, TexError> {
        let tokens = TokenStream::new(PathBuf::from("test.tex"), text).map(Ok);
        EquationExtractor::new(tokens).collect()
    }

    #[test]
    fn span_count_and_order() {
        let text = "intro\n\\begin{equation}a+b\\end{equation}\
                    mid\\begin{equation}c-d\\end{equation}outro";
        let spans = spans(text).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].index, 0);
        assert_eq!(spans[0].source_text(), "a+b");
        assert_eq!(spans[1].index, 1);
        assert_eq!(spans[1].source_text(), "c-d");
    }

    #[test]
    fn markers_are_excluded() {
        let spans = spans("\\begin{equation} x \\end{equation}").unwrap();
        assert_eq!(spans[0].source_text(), " x ");
    }

    #[test]
    fn other_environments_are_ignored() {
        let spans = spans("\\begin{align}a\\end{align}").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn starred_environments_are_not_harvested() {
        let spans = spans("\\begin{equation*}a\\end{equation*}").unwrap();
        assert!(spans.is_empty());
    }

    #[test]
    fn inner_end_of_other_environment_is_kept() {
        let text = "\\begin{equation}\\text{a}\\end{align}x\\end{equation}";
        let spans = spans(text).unwrap();
        assert_eq!(spans[0].source_text(), "\\text{a}\\end{align}x");
    }

    #[test]
    fn unterminated_environment_is_an_error() {
        let err = spans("\\begin{equation}x").unwrap_err();
        assert!(matches!(err, TexError::UnterminatedEnvironment { at } if at.col == 1));
    }

    #[test]
    fn unterminated_detection_after_complete_spans() {
        let text = "\\begin{equation}ok\\end{equation}\\begin{equation}bad";
        let tokens = TokenStream::new(PathBuf::from("test.tex"), text).map(Ok);
        let mut extractor = EquationExtractor::new(tokens);
        assert!(extractor.next().unwrap().is_ok());
        assert!(matches!(
            extractor.next(),
            Some(Err(TexError::UnterminatedEnvironment { .. }))
        ));
        assert!(extractor.next().is_none());
    }

    #[test]
    fn braced_arguments_inside_spans_survive() {
        let text = "\\begin{equation}\\frac{a}{b}\\end{equation}";
        let spans = spans(text).unwrap();
        assert_eq!(spans[0].source_text(), "\\frac{a}{b}");
    }
}
