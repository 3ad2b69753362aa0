use std::borrow::Cow;

use image::DynamicImage;
use serde::{Deserialize, Serialize};

use crate::{
    ColorSwatch,
    error::{InsightError, Result},
};

const SIGBITS: u32 = 5;
const RSHIFT: u32 = 8 - SIGBITS;
const SIDE: usize = 1 << SIGBITS;
const FRACT_BY_POPULATION: f64 = 0.75;
const MIN_ALPHA: u8 = 125;
const NEAR_WHITE: u8 = 250;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    pub dominant: Option<ColorSwatch>,
    pub swatches: Vec<ColorSwatch>,
}

impl Palette {
    /// Dominant colour followed by the representative swatches.
    pub fn main_colors(&self) -> Vec<ColorSwatch> {
        self.dominant
            .iter()
            .chain(self.swatches.iter())
            .copied()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Bin {
    count: u64,
    sum: [u64; 3],
}

struct QuantHistogram {
    bins: Vec<Bin>,
}

impl QuantHistogram {
    fn new() -> Self {
        Self {
            bins: vec![Bin::default(); SIDE * SIDE * SIDE],
        }
    }

    fn index(q: [usize; 3]) -> usize {
        (q[0] << (2 * SIGBITS)) | (q[1] << SIGBITS) | q[2]
    }

    fn add(&mut self, rgb: [u8; 3]) {
        let q = rgb.map(|c| (c >> RSHIFT) as usize);
        let bin = &mut self.bins[Self::index(q)];
        bin.count += 1;
        for (acc, c) in bin.sum.iter_mut().zip(rgb) {
            *acc += u64::from(c);
        }
    }

    fn bin(&self, q: [usize; 3]) -> &Bin {
        &self.bins[Self::index(q)]
    }
}

/// Axis-aligned box in quantized colour space, bounds inclusive.
#[derive(Debug, Clone)]
struct VBox {
    lo: [usize; 3],
    hi: [usize; 3],
    count: u64,
}

impl VBox {
    fn volume(&self) -> u64 {
        (0..3).map(|a| (self.hi[a] - self.lo[a] + 1) as u64).product()
    }

    fn cells(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        (self.lo[0]..=self.hi[0]).flat_map(move |r| {
            (self.lo[1]..=self.hi[1])
                .flat_map(move |g| (self.lo[2]..=self.hi[2]).map(move |b| [r, g, b]))
        })
    }

    /// Tightens the bounds to the populated cells. `None` if the box is empty.
    fn shrink(lo: [usize; 3], hi: [usize; 3], hist: &QuantHistogram) -> Option<VBox> {
        let candidate = VBox { lo, hi, count: 0 };
        let mut min = [usize::MAX; 3];
        let mut max = [0usize; 3];
        let mut count = 0;

        for q in candidate.cells() {
            let bin = hist.bin(q);
            if bin.count == 0 {
                continue;
            }
            count += bin.count;
            for a in 0..3 {
                min[a] = min[a].min(q[a]);
                max[a] = max[a].max(q[a]);
            }
        }

        (count > 0).then_some(VBox {
            lo: min,
            hi: max,
            count,
        })
    }

    fn split(&self, hist: &QuantHistogram) -> Option<(VBox, VBox)> {
        if self.count < 2 {
            return None;
        }

        let axis = (0..3).max_by_key(|&a| self.hi[a] - self.lo[a])?;
        if self.hi[axis] == self.lo[axis] {
            return None;
        }

        let mut slices = vec![0u64; self.hi[axis] - self.lo[axis] + 1];
        for q in self.cells() {
            slices[q[axis] - self.lo[axis]] += hist.bin(q).count;
        }

        let half = self.count.div_ceil(2);
        let mut cumulative = 0;
        let mut cut = self.hi[axis] - 1;
        for (offset, population) in slices.iter().enumerate() {
            cumulative += population;
            if cumulative >= half {
                cut = (self.lo[axis] + offset).min(self.hi[axis] - 1);
                break;
            }
        }

        let mut left_hi = self.hi;
        left_hi[axis] = cut;
        let mut right_lo = self.lo;
        right_lo[axis] = cut + 1;

        let left = VBox::shrink(self.lo, left_hi, hist)?;
        let right = VBox::shrink(right_lo, self.hi, hist)?;
        Some((left, right))
    }

    fn average(&self, hist: &QuantHistogram) -> ColorSwatch {
        let mut sum = [0u64; 3];
        let mut count = 0u64;

        for q in self.cells() {
            let bin = hist.bin(q);
            count += bin.count;
            for a in 0..3 {
                sum[a] += bin.sum[a];
            }
        }

        if count == 0 {
            return ColorSwatch(self.lo.map(|q| ((q << RSHIFT) as u8).saturating_add(4)));
        }

        ColorSwatch(sum.map(|s| ((s + count / 2) / count).min(255) as u8))
    }
}

fn split_until(boxes: &mut Vec<VBox>, target: usize, hist: &QuantHistogram, priority: fn(&VBox) -> u64) {
    while boxes.len() < target {
        let mut order: Vec<usize> = (0..boxes.len()).collect();
        order.sort_by_key(|&i| std::cmp::Reverse(priority(&boxes[i])));

        let Some((index, halves)) = order
            .into_iter()
            .find_map(|i| boxes[i].split(hist).map(|halves| (i, halves)))
        else {
            break;
        };

        let (left, right) = halves;
        boxes[index] = left;
        boxes.push(right);
    }
}

/// Modified median cut over a downsampled copy of the image: a small
/// palette of representative colours, ordered by their weight.
pub struct PaletteExtractor {
    color_count: usize,
    quality: usize,
    max_edge: u32,
}

impl PaletteExtractor {
    pub fn new(color_count: usize) -> Self {
        Self {
            color_count,
            quality: 10,
            max_edge: 256,
        }
    }

    pub fn with_quality(mut self, quality: usize) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_max_edge(mut self, max_edge: u32) -> Self {
        self.max_edge = max_edge;
        self
    }

    pub fn extract(&self, image: &DynamicImage) -> Result<Palette> {
        if self.color_count == 0 {
            return Err(InsightError::InvalidParameter(
                "Palette must hold at least one colour".into(),
            ));
        }
        if self.quality == 0 || self.max_edge == 0 {
            return Err(InsightError::InvalidParameter(
                "Sampling quality and edge size must be positive".into(),
            ));
        }

        let sample = if image.width() > self.max_edge || image.height() > self.max_edge {
            Cow::Owned(image.thumbnail(self.max_edge, self.max_edge))
        } else {
            Cow::Borrowed(image)
        };

        let rgba = sample.to_rgba8();
        let mut hist = QuantHistogram::new();
        for px in rgba.pixels().step_by(self.quality) {
            let [r, g, b, a] = px.0;
            if a < MIN_ALPHA || (r > NEAR_WHITE && g > NEAR_WHITE && b > NEAR_WHITE) {
                continue;
            }
            hist.add([r, g, b]);
        }

        let Some(root) = VBox::shrink([0; 3], [SIDE - 1; 3], &hist) else {
            return Ok(Palette::default());
        };

        let mut boxes = vec![root];
        let by_population = (FRACT_BY_POPULATION * self.color_count as f64).ceil() as usize;
        split_until(&mut boxes, by_population, &hist, |b| b.count);
        split_until(&mut boxes, self.color_count, &hist, |b| b.count * b.volume());

        boxes.sort_by_key(|b| std::cmp::Reverse(b.count * b.volume()));

        let swatches: Vec<ColorSwatch> = boxes.iter().map(|b| b.average(&hist)).collect();

        Ok(Palette {
            dominant: swatches.first().copied(),
            swatches,
        })
    }
}
