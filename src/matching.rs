/*! Template localization: finds the best-matching page and bounding box
   for a rendered equation among the rendered pages of the full document.

   The score is zero-mean normalized cross-correlation, which is invariant
   to uniform brightness/contrast offsets between the two rendering passes.
   The winner is the global maximum over all pages; ties are broken
   deterministically by strict greater-than comparison, so the earliest
   page (and, within a page, the earliest position in row-major order)
   wins.
*/

use image::GrayImage;
use log::debug;

/// Axis-aligned rectangle in image-fraction coordinates, so results are
/// independent of the rasterization resolution.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// Outcome of a template search over all pages.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    /// Global maximum correlation; `NEG_INFINITY` if the template fits on
    /// no page at all.
    pub confidence: f64,
    /// Matched page index and bounding box; `None` iff degenerate.
    pub location: Option<(usize, BBox)>,
}

/// Summed-area tables for value and squared value, so any window's sum and
/// sum of squares come out in O(1).
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sq: Vec<f64>,
}

impl Integral {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sq = vec![0.0; stride * (h + 1)];
        let raw = img.as_raw();
        for y in 0..h {
            for x in 0..w {
                let v = raw[y * w + x] as f64;
                let i = (y + 1) * stride + (x + 1);
                sum[i] = v + sum[i - 1] + sum[i - stride] - sum[i - stride - 1];
                sq[i] = v * v + sq[i - 1] + sq[i - stride] - sq[i - stride - 1];
            }
        }
        Self { stride, sum, sq }
    }

    /// (sum, sum of squares) of the `w`×`h` window at `(x, y)`.
    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let at = |row: usize, col: usize| row * self.stride + col;
        let (x2, y2) = (x + w, y + h);
        (
            self.sum[at(y2, x2)] - self.sum[at(y, x2)] - self.sum[at(y2, x)]
                + self.sum[at(y, x)],
            self.sq[at(y2, x2)] - self.sq[at(y, x2)] - self.sq[at(y2, x)] + self.sq[at(y, x)],
        )
    }
}

pub struct PageMatcher<'a> {
    pages: &'a [GrayImage],
    integrals: Vec<Integral>,
}

impl<'a> PageMatcher<'a> {
    /// Precomputes per-page integral images once; the same matcher then
    /// serves every equation of the document.
    pub fn new(pages: &'a [GrayImage]) -> Self {
        let integrals = pages.iter().map(Integral::new).collect();
        Self { pages, integrals }
    }

    /// Searches every page for the template's best match. Pages smaller
    /// than the template in either dimension are skipped; if that leaves
    /// no page, the sentinel result is returned rather than an error.
    pub fn locate(&self, template: &GrayImage) -> MatchResult {
        let (tw, th) = (template.width() as usize, template.height() as usize);
        let n = (tw * th) as f64;
        let traw = template.as_raw();
        let mean_t = traw.iter().map(|&v| v as f64).sum::<f64>() / n;
        let t0: Vec<f64> = traw.iter().map(|&v| v as f64 - mean_t).collect();
        let t_ss: f64 = t0.iter().map(|v| v * v).sum();

        let mut best = MatchResult {
            confidence: f64::NEG_INFINITY,
            location: None,
        };
        for (index, page) in self.pages.iter().enumerate() {
            let (pw, ph) = (page.width() as usize, page.height() as usize);
            if tw > pw || th > ph {
                debug!(target:"matcher",
                    "page {index} ({pw}x{ph}) cannot hold template ({tw}x{th}), skipped");
                continue;
            }
            let integral = &self.integrals[index];
            let praw = page.as_raw();
            for y in 0..=(ph - th) {
                for x in 0..=(pw - tw) {
                    let (s, sq) = integral.window(x, y, tw, th);
                    let var_p = sq - s * s / n;
                    let score = if var_p <= 0.0 || t_ss <= 0.0 {
                        // flat window or flat template: correlation undefined
                        0.0
                    } else {
                        // the template is already mean-subtracted, so the
                        // plain dot product is the zero-mean numerator
                        let mut dot = 0.0;
                        for ty in 0..th {
                            let prow = &praw[(y + ty) * pw + x..][..tw];
                            let trow = &t0[ty * tw..][..tw];
                            for (p, t) in prow.iter().zip(trow) {
                                dot += *p as f64 * t;
                            }
                        }
                        dot / (var_p * t_ss).sqrt()
                    };
                    if score > best.confidence {
                        best.confidence = score;
                        best.location = Some((index, bbox(x, y, tw, th, pw, ph)));
                    }
                }
            }
        }
        best
    }
}

fn bbox(x: usize, y: usize, tw: usize, th: usize, pw: usize, ph: usize) -> BBox {
    BBox {
        x1: x as f64 / pw as f64,
        y1: y as f64 / ph as f64,
        x2: (x + tw) as f64 / pw as f64,
        y2: (y + th) as f64 / ph as f64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// Deterministic splitmix-style noise. The seed enters by xor, not by
    /// addition, so pages with different seeds are unrelated rather than
    /// shifted copies of one another.
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

    #[test]
    fn exact_match_and_first_page_wins_ties() {
        let page = noise_page(40, 40, 7);
        let pages = vec![page.clone(), page.clone()];
        let template = crop(&page, 5, 5, 10, 10);
        let m = PageMatcher::new(&pages).locate(&template);
        assert!(m.confidence > 0.999, "confidence {}", m.confidence);
        let (index, bbox) = m.location.unwrap();
        assert_eq!(index, 0);
        assert!((bbox.x1 - 0.125).abs() < 1e-9);
        assert!((bbox.y1 - 0.125).abs() < 1e-9);
        assert!((bbox.x2 - 0.375).abs() < 1e-9);
        assert!((bbox.y2 - 0.375).abs() < 1e-9);
    }

    #[test]
    fn global_maximum_across_pages() {
        let first = noise_page(40, 40, 1);
        let second = noise_page(40, 40, 2);
        let template = crop(&second, 12, 20, 8, 6);
        // the crop must not reappear shifted on the other page
        assert_ne!(crop(&first, 13, 20, 8, 6).as_raw(), template.as_raw());
        let pages = vec![first, second];
        let m = PageMatcher::new(&pages).locate(&template);
        let (index, bbox) = m.location.unwrap();
        assert_eq!(index, 1);
        assert!((bbox.x1 - 12.0 / 40.0).abs() < 1e-9);
        assert!((bbox.y1 - 20.0 / 40.0).abs() < 1e-9);
        assert!(m.confidence > 0.999);
    }

    #[test]
    fn score_is_contrast_invariant() {
        let page = noise_page(40, 40, 3);
        let template = crop(&page, 8, 8, 10, 10);
        // halve the contrast and brighten; rounding keeps this just shy of exact
        let dimmed = GrayImage::from_fn(40, 40, |x, y| {
            Luma([page.get_pixel(x, y).0[0] / 2 + 40])
        });
        let pages = vec![dimmed];
        let m = PageMatcher::new(&pages).locate(&template);
        let (index, bbox) = m.location.unwrap();
        assert_eq!(index, 0);
        assert!((bbox.x1 - 0.2).abs() < 1e-9);
        assert!(m.confidence > 0.98, "confidence {}", m.confidence);
    }

    #[test]
    fn oversized_template_yields_sentinel() {
        let pages = vec![noise_page(40, 40, 4), noise_page(30, 50, 5)];
        let template = noise_page(50, 50, 6);
        let m = PageMatcher::new(&pages).locate(&template);
        assert_eq!(m.confidence, f64::NEG_INFINITY);
        assert!(m.location.is_none());
    }

    #[test]
    fn undersized_pages_are_skipped_not_fatal() {
        let big = noise_page(40, 40, 8);
        let template = crop(&big, 3, 3, 12, 12);
        let pages = vec![noise_page(10, 10, 9), big.clone()];
        let m = PageMatcher::new(&pages).locate(&template);
        let (index, _) = m.location.unwrap();
        assert_eq!(index, 1);
        assert!(m.confidence > 0.999);
    }

    #[test]
    fn flat_template_scores_zero() {
        let pages = vec![noise_page(20, 20, 10)];
        let template = GrayImage::from_pixel(5, 5, Luma([128]));
        let m = PageMatcher::new(&pages).locate(&template);
        assert_eq!(m.confidence, 0.0);
        assert!(m.location.is_some());
    }
}
