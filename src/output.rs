/*! On-disk dataset layout.

   ```text
   <outdir>/
     records.json            index of all records and failures
     equation-000/
       equation.tex          canonical source text
       equation.png          standalone render
       aabb.png              matched page with the bounding box drawn
     equation-001/
       ...
   ```
*/

use crate::matching::BBox;
use crate::pipeline::Harvest;
use image::{DynamicImage, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use log::info;
use serde::Serialize;
use std::io;
use std::path::Path;

#[derive(Serialize)]
struct RecordMeta<'a> {
    index: usize,
    source_text: &'a str,
    page_index: usize,
    bbox: [f64; 4],
    confidence: f64,
}

#[derive(Serialize)]
struct FailureMeta<'a> {
    index: usize,
    source_text: &'a str,
    error: String,
}

#[derive(Serialize)]
struct DatasetIndex<'a> {
    records: Vec<RecordMeta<'a>>,
    failures: Vec<FailureMeta<'a>>,
}

pub fn write_dataset(outdir: &Path, harvest: &Harvest) -> io::Result<()> {
    std::fs::create_dir_all(outdir)?;
    for record in &harvest.records {
        let dir = outdir.join(format!("equation-{:03}", record.index));
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("equation.tex"), &record.source_text)?;
        record
            .image
            .save(dir.join("equation.png"))
            .map_err(io::Error::other)?;
        if let Some(page) = harvest.pages.get(record.page_index) {
            annotated_page(page, &record.bbox)
                .save(dir.join("aabb.png"))
                .map_err(io::Error::other)?;
        }
    }
    let index = DatasetIndex {
        records: harvest
            .records
            .iter()
            .map(|r| RecordMeta {
                index: r.index,
                source_text: &r.source_text,
                page_index: r.page_index,
                bbox: [r.bbox.x1, r.bbox.y1, r.bbox.x2, r.bbox.y2],
                confidence: r.confidence,
            })
            .collect(),
        failures: harvest
            .failures
            .iter()
            .map(|f| FailureMeta {
                index: f.index,
                source_text: &f.source_text,
                error: f.error.to_string(),
            })
            .collect(),
    };
    let json = serde_json::to_string_pretty(&index).map_err(io::Error::other)?;
    std::fs::write(outdir.join("records.json"), json)?;
    info!(target:"output", "dataset written to {}", outdir.display());
    Ok(())
}

/// The matched page with the record's bounding box drawn in red, two
/// pixels thick. The thickness comes from nested hollow rectangles, each
/// inset one pixel from the previous.
fn annotated_page(page: &GrayImage, bbox: &BBox) -> RgbImage {
    let mut img = DynamicImage::ImageLuma8(page.clone()).to_rgb8();
    let (w, h) = (img.width(), img.height());
    let x = (bbox.x1 * w as f64).round() as i32;
    let y = (bbox.y1 * h as f64).round() as i32;
    let rect_w = ((bbox.x2 - bbox.x1) * w as f64).round() as u32;
    let rect_h = ((bbox.y2 - bbox.y1) * h as f64).round() as u32;
    for t in 0..2u32 {
        let inner_w = rect_w.saturating_sub(2 * t).max(1);
        let inner_h = rect_h.saturating_sub(2 * t).max(1);
        draw_hollow_rect_mut(
            &mut img,
            Rect::at(x + t as i32, y + t as i32).of_size(inner_w, inner_h),
            Rgb([255, 0, 0]),
        );
    }
    img
}
