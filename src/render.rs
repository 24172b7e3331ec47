/*! The rendering boundary.

   The core never talks to a LaTeX installation directly; it goes through
   the [`Renderer`] trait, so the pipeline is unit-testable against a fake.
   [`LatexmkRenderer`] is the production implementation: `latexmk -pdf`
   for compilation, pdfium for rasterization, pages converted to 8-bit
   grayscale.
*/

use crate::errors::RenderError;
use image::GrayImage;
use log::{debug, info};
use pdfium_render::prelude::Pdfium;
use std::path::{Path, PathBuf};
use std::process::Command;

pub trait Renderer {
    /// Renders one equation's verbatim source text as a standalone
    /// single-page image (the first and only page of a minimal document).
    fn render_equation(&self, tex: &str) -> Result<GrayImage, RenderError>;
    /// Renders the full document rooted at `root`, one grayscale image per
    /// page, in page order.
    fn render_document(&self, root: &Path) -> Result<Vec<GrayImage>, RenderError>;
}

/// The wrapper document an equation is rendered in, standalone so the
/// output page hugs the equation.
const EQUATION_TEMPLATE: &str = r"\documentclass[preview,border=2pt]{standalone}
\usepackage{amsmath}
\usepackage{amssymb}
\begin{document}
\begin{equation}
%EQUATION%
\end{equation}
\end{document}
";

pub struct LatexmkRenderer {
    /// Scratch space for generated equation documents and compiler output.
    /// Must be absolute: `latexmk` runs in the source file's directory.
    build_dir: PathBuf,
    dpi: f32,
    pdfium: Pdfium,
}

impl LatexmkRenderer {
    pub fn new(build_dir: PathBuf, dpi: f32) -> Result<Self, RenderError> {
        let pdfium = bind_pdfium().ok_or(RenderError::PdfiumUnavailable)?;
        Ok(Self {
            build_dir,
            dpi,
            pdfium,
        })
    }

    /// Runs `latexmk -pdf` on `tex_file`, in that file's directory so
    /// relative resources resolve. Returns the path of the produced PDF.
    fn compile(&self, tex_file: &Path, outdir: &Path) -> Result<PathBuf, RenderError> {
        let dir = tex_file.parent().unwrap_or(Path::new("."));
        let name = tex_file.file_name().unwrap_or(tex_file.as_os_str());
        debug!(target:"render", "latexmk {} -> {}", tex_file.display(), outdir.display());
        let output = Command::new("latexmk")
            .arg("-pdf")
            .arg("-interaction=nonstopmode")
            .arg(format!("-outdir={}", outdir.display()))
            .arg(name)
            .current_dir(dir)
            .output()
            .map_err(|source| RenderError::Io {
                path: tex_file.to_path_buf(),
                source,
            })?;
        if !output.status.success() {
            return Err(RenderError::Compiler {
                status: output.status,
                log: log_tail(&output.stdout, &output.stderr),
            });
        }
        let mut pdf = outdir.join(name);
        pdf.set_extension("pdf");
        if !pdf.is_file() {
            return Err(RenderError::MissingOutput { path: pdf });
        }
        Ok(pdf)
    }

    fn rasterize(&self, pdf: &Path) -> Result<Vec<GrayImage>, RenderError> {
        use pdfium_render::prelude::*;
        let doc = self
            .pdfium
            .load_pdf_from_file(pdf, None)
            .map_err(|e| RenderError::Pdf {
                path: pdf.to_path_buf(),
                message: format!("{e:?}"),
            })?;
        let scale = self.dpi / 72.0;
        let mut pages = Vec::new();
        for page in doc.pages().iter() {
            let width = (page.width().value * scale) as i32;
            let height = (page.height().value * scale) as i32;
            let bitmap = page
                .render_with_config(
                    &PdfRenderConfig::new()
                        .set_target_width(width)
                        .set_target_height(height),
                )
                .map_err(|e| RenderError::Pdf {
                    path: pdf.to_path_buf(),
                    message: format!("{e:?}"),
                })?;
            pages.push(bitmap.as_image().to_luma8());
        }
        if pages.is_empty() {
            return Err(RenderError::NoPages);
        }
        Ok(pages)
    }
}

impl Renderer for LatexmkRenderer {
    fn render_equation(&self, tex: &str) -> Result<GrayImage, RenderError> {
        let dir = self.build_dir.join("equation");
        std::fs::create_dir_all(&dir).map_err(|source| RenderError::Io {
            path: dir.clone(),
            source,
        })?;
        let file = dir.join("equation.tex");
        std::fs::write(&file, EQUATION_TEMPLATE.replace("%EQUATION%", tex)).map_err(
            |source| RenderError::Io {
                path: file.clone(),
                source,
            },
        )?;
        let pdf = self.compile(&file, &dir)?;
        let mut pages = self.rasterize(&pdf)?;
        Ok(pages.swap_remove(0))
    }

    fn render_document(&self, root: &Path) -> Result<Vec<GrayImage>, RenderError> {
        let outdir = self.build_dir.join("document");
        std::fs::create_dir_all(&outdir).map_err(|source| RenderError::Io {
            path: outdir.clone(),
            source,
        })?;
        let pdf = self.compile(root, &outdir)?;
        let pages = self.rasterize(&pdf)?;
        info!(target:"render", "{}: {} page(s) at {} dpi", pdf.display(), pages.len(), self.dpi);
        Ok(pages)
    }
}

/// Binds pdfium next to the executable first, falling back to the system
/// library.
fn bind_pdfium() -> Option<Pdfium> {
    let lib = std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.parent().and_then(|dir| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)).ok()
            })
        })
        .or_else(|| Pdfium::bind_to_system_library().ok())?;
    Some(Pdfium::new(lib))
}

/// Last lines of the compiler output, for error reporting.
fn log_tail(stdout: &[u8], stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(if stderr.is_empty() { stdout } else { stderr });
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(20);
    lines[start..].join("\n")
}
