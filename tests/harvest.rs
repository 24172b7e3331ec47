/*! Pipeline integration tests against a fake renderer: no LaTeX
   installation involved.
*/

use eqharvest::errors::RenderError;
use eqharvest::output::write_dataset;
use eqharvest::pipeline::harvest;
use eqharvest::render::Renderer;
use image::{GrayImage, Luma, Rgb};
use std::path::Path;
use tempfile::TempDir;

/// Splitmix-style noise; seeds enter by xor so pages with different seeds
/// are unrelated rather than shifted copies of one another.
fn noise_page(w: u32, h: u32, seed: u64) -> GrayImage {
    GrayImage::from_fn(w, h, |x, y| {
        let mut v = (y * w + x) as u64 ^ seed.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        v = v.wrapping_mul(0xbf58_476d_1ce4_e5b9);
        v ^= v >> 27;
        v = v.wrapping_mul(0x94d0_49bb_1331_11eb);
        Luma([(v >> 32) as u8])
    })
}

fn crop(img: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
    GrayImage::from_fn(w, h, |cx, cy| *img.get_pixel(x + cx, y + cy))
}

/// Hands out crops of its own pages for known equations; anything else
/// fails to render.
struct FakeRenderer {
    pages: Vec<GrayImage>,
}

impl FakeRenderer {
    fn new() -> Self {
        Self {
            pages: vec![noise_page(60, 60, 100), noise_page(60, 60, 200)],
        }
    }
}

impl Renderer for FakeRenderer {
    fn render_equation(&self, tex: &str) -> Result<GrayImage, RenderError> {
        match tex.trim() {
            "a+b" => Ok(crop(&self.pages[1], 10, 20, 16, 8)),
            "c-d" => Ok(crop(&self.pages[0], 4, 4, 12, 12)),
            _ => Err(RenderError::NoPages),
        }
    }

    fn render_document(&self, _root: &Path) -> Result<Vec<GrayImage>, RenderError> {
        Ok(self.pages.clone())
    }
}

fn write(dir: &Path, name: &str, text: &str) {
    std::fs::write(dir.join(name), text).unwrap();
}

#[test]
fn records_and_failures_across_included_files() {
    let tmp = TempDir::new().unwrap();
    write(
        tmp.path(),
        "main.tex",
        "Intro\\input{eqs}\n\\begin{equation}x*y\\end{equation}\n",
    );
    write(
        tmp.path(),
        "eqs.tex",
        "\\begin{equation}a+b\\end{equation}\\begin{equation}c-d\\end{equation}",
    );
    let renderer = FakeRenderer::new();
    let harvest = harvest(Path::new("main.tex"), tmp.path(), &renderer).unwrap();

    assert_eq!(harvest.records.len(), 2);
    assert_eq!(harvest.failures.len(), 1);

    let first = &harvest.records[0];
    assert_eq!(first.index, 0);
    assert_eq!(first.source_text, "a+b");
    assert_eq!(first.page_index, 1);
    assert!((first.bbox.x1 - 10.0 / 60.0).abs() < 1e-9);
    assert!((first.bbox.y1 - 20.0 / 60.0).abs() < 1e-9);
    assert!((first.bbox.x2 - 26.0 / 60.0).abs() < 1e-9);
    assert!((first.bbox.y2 - 28.0 / 60.0).abs() < 1e-9);
    assert!(first.confidence > 0.999);

    let second = &harvest.records[1];
    assert_eq!(second.index, 1);
    assert_eq!(second.source_text, "c-d");
    assert_eq!(second.page_index, 0);

    // the equation the renderer cannot handle is skipped, not fatal
    let failed = &harvest.failures[0];
    assert_eq!(failed.index, 2);
    assert_eq!(failed.source_text, "x*y");
}

#[test]
fn dataset_includes_annotated_pages() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.tex", "\\begin{equation}a+b\\end{equation}");
    let renderer = FakeRenderer::new();
    let harvest = harvest(Path::new("main.tex"), tmp.path(), &renderer).unwrap();

    let out = TempDir::new().unwrap();
    write_dataset(out.path(), &harvest).unwrap();

    let dir = out.path().join("equation-000");
    assert!(dir.join("equation.tex").exists());
    assert!(dir.join("equation.png").exists());

    // aabb.png is the matched page with the box drawn on it
    let annotated = image::open(dir.join("aabb.png")).unwrap().to_rgb8();
    assert_eq!(annotated.dimensions(), (60, 60));
    assert_eq!(*annotated.get_pixel(10, 20), Rgb([255, 0, 0]));
    assert_eq!(*annotated.get_pixel(25, 27), Rgb([255, 0, 0]));
    let outside = annotated.get_pixel(40, 50);
    assert_eq!(outside.0[0], outside.0[1]);
    assert_eq!(outside.0[1], outside.0[2]);
}

#[test]
fn unterminated_environment_aborts_the_document() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.tex", "\\begin{equation}never closed");
    let renderer = FakeRenderer::new();
    let err = harvest(Path::new("main.tex"), tmp.path(), &renderer).unwrap_err();
    assert!(err.to_string().contains("never closed"), "{err}");
}

#[test]
fn oversized_equation_render_is_a_degenerate_match() {
    struct Oversized;
    impl Renderer for Oversized {
        fn render_equation(&self, _tex: &str) -> Result<GrayImage, RenderError> {
            Ok(noise_page(100, 100, 7))
        }
        fn render_document(&self, _root: &Path) -> Result<Vec<GrayImage>, RenderError> {
            Ok(vec![noise_page(60, 60, 8)])
        }
    }
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "main.tex", "\\begin{equation}huge\\end{equation}");
    let harvest = harvest(Path::new("main.tex"), tmp.path(), &Oversized).unwrap();
    assert!(harvest.records.is_empty());
    assert_eq!(harvest.failures.len(), 1);
    assert!(harvest.failures[0]
        .error
        .to_string()
        .contains("larger than every page"));
}
