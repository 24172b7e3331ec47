/*! The error taxonomy.

   Resolution and extraction errors ([`TexError`]) are document-fatal: an
   incompletely resolved document cannot safely yield any equation spans.
   Render and match errors ([`EquationError`]) are scoped to a single
   equation and leave the remaining equations unaffected.
*/

use crate::tex::token::SourceRef;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving or segmenting a document.
#[derive(Debug, Error)]
pub enum TexError {
    /// An inclusion directive names a file that exists neither literally
    /// nor with a `.tex` extension.
    #[error("cannot resolve included file `{target}` ({at})")]
    FileResolution { target: String, at: SourceRef },
    /// A file includes itself along the current inclusion chain.
    #[error("cyclic inclusion of `{}` ({at})", .path.display())]
    CyclicInclusion { path: PathBuf, at: SourceRef },
    /// A brace group is opened but the file ends before it is closed.
    #[error("group opened at {at} is never closed")]
    UnterminatedGroup { at: SourceRef },
    /// An `equation` environment is opened but never closed.
    #[error("equation environment opened at {at} is never closed")]
    UnterminatedEnvironment { at: SourceRef },
    #[error("cannot read `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors raised by the rendering boundary.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("latex compiler failed ({status}): {log}")]
    Compiler {
        status: std::process::ExitStatus,
        log: String,
    },
    #[error("compiler produced no output at `{}`", .path.display())]
    MissingOutput { path: PathBuf },
    #[error("rendered document has no pages")]
    NoPages,
    #[error("no pdfium library available")]
    PdfiumUnavailable,
    #[error("cannot rasterize `{}`: {message}", .path.display())]
    Pdf { path: PathBuf, message: String },
    #[error("i/o error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Per-equation failures; recorded and skipped, never aborting the run.
#[derive(Debug, Error)]
pub enum EquationError {
    #[error(transparent)]
    Render(#[from] RenderError),
    /// The equation render is larger than every page of the document, so
    /// no match is defined anywhere.
    #[error("equation render ({width}x{height}) is larger than every page")]
    DegenerateMatch { width: u32, height: u32 },
}

/// Document-fatal pipeline errors.
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error(transparent)]
    Tex(#[from] TexError),
    #[error("document render failed: {0}")]
    Render(#[from] RenderError),
}
