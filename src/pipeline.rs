/*! End-to-end orchestration: resolve, extract, render, match, assemble.

   Resolution and extraction errors abort the run. Per-equation render or
   match failures do not: the failed equation is logged, recorded in the
   failure list, and the remaining equations proceed.
*/

use crate::errors::{EquationError, HarvestError};
use crate::matching::{BBox, MatchResult, PageMatcher};
use crate::render::Renderer;
use crate::tex::equations::{EquationExtractor, TokenSpan};
use crate::tex::resolver::InclusionResolver;
use image::GrayImage;
use log::{info, warn};
use std::path::Path;

/// The durable output unit: one localized equation.
#[derive(Debug)]
pub struct EquationRecord {
    pub index: usize,
    pub source_text: String,
    pub image: GrayImage,
    pub page_index: usize,
    pub bbox: BBox,
    pub confidence: f64,
}

#[derive(Debug)]
pub struct EquationFailure {
    pub index: usize,
    pub source_text: String,
    pub error: EquationError,
}

/// Successful records plus the parallel failure list. The rendered pages
/// are kept so the output layer can draw each record's bounding box onto
/// its matched page.
#[derive(Debug, Default)]
pub struct Harvest {
    pub records: Vec<EquationRecord>,
    pub failures: Vec<EquationFailure>,
    pub pages: Vec<GrayImage>,
}

/// Runs the whole pipeline for the document rooted at `root`, resolving
/// relative inclusion targets against `base_dir`.
pub fn harvest<R: Renderer>(
    root: &Path,
    base_dir: &Path,
    renderer: &R,
) -> Result<Harvest, HarvestError> {
    let resolver = InclusionResolver::open(root, base_dir)?;
    let spans: Vec<TokenSpan> = EquationExtractor::new(resolver).collect::<Result<_, _>>()?;
    info!(target:"pipeline", "{}: {} equation(s)", root.display(), spans.len());

    let pages = renderer.render_document(root)?;
    let matcher = PageMatcher::new(&pages);

    let mut records = Vec::new();
    let mut failures = Vec::new();
    for span in spans {
        let source_text = span.source_text();
        match localize(renderer, &matcher, &source_text) {
            Ok(record) => records.push(EquationRecord {
                index: span.index,
                source_text,
                image: record.0,
                page_index: record.1,
                bbox: record.2,
                confidence: record.3,
            }),
            Err(error) => {
                warn!(target:"pipeline", "equation {} skipped: {error}", span.index);
                failures.push(EquationFailure {
                    index: span.index,
                    source_text,
                    error,
                });
            }
        }
    }
    info!(target:"pipeline", "{} record(s), {} failure(s)", records.len(), failures.len());
    drop(matcher);
    Ok(Harvest {
        records,
        failures,
        pages,
    })
}

fn localize<R: Renderer>(
    renderer: &R,
    matcher: &PageMatcher,
    source_text: &str,
) -> Result<(GrayImage, usize, BBox, f64), EquationError> {
    let image = renderer.render_equation(source_text)?;
    let MatchResult {
        confidence,
        location,
    } = matcher.locate(&image);
    match location {
        Some((page_index, bbox)) => Ok((image, page_index, bbox, confidence)),
        None => Err(EquationError::DegenerateMatch {
            width: image.width(),
            height: image.height(),
        }),
    }
}
