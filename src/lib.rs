#![forbid(unsafe_code)]

/*! Builds labeled datasets of equations extracted from LaTeX papers.

   Given a paper's root document, the pipeline resolves the full logical
   token stream across included files, isolates each `equation`
   environment, renders it standalone, and locates its bounding box within
   the fully rendered paper by normalized cross-correlation. The output is
   one record per equation: source text, image, page index, normalized
   bounding box and match confidence.
*/

pub mod errors;
pub mod matching;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod tex;

pub mod prelude {
    pub use crate::errors::{EquationError, HarvestError, RenderError, TexError};
    pub use crate::matching::{BBox, MatchResult, PageMatcher};
    pub use crate::pipeline::{harvest, EquationRecord, Harvest};
    pub use crate::render::Renderer;
    pub use crate::tex::equations::{EquationExtractor, TokenSpan};
    pub use crate::tex::resolver::InclusionResolver;
    pub use crate::tex::token::{SourceRef, Token, TokenKind};
    pub use crate::tex::tokenizer::TokenStream;
}
