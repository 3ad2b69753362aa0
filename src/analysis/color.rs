use std::collections::HashMap;

use image::DynamicImage;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    ColorSwatch,
    error::{InsightError, Result},
};

const CHANNELS: usize = 4;
const PIXELS_PER_CHUNK: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorShare {
    pub swatch: ColorSwatch,
    /// Share of all pixels, rounded to two decimals.
    pub percentage: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorDistribution {
    pub total_pixels: u64,
    pub shares: Vec<ColorShare>,
}

impl ColorDistribution {
    pub fn is_empty(&self) -> bool {
        self.shares.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    count: u64,
    first_seen: usize,
}

type Histogram = HashMap<[u8; 3], Bucket>;

/// Exact-colour histogram over every pixel of an image.
pub struct ColorAnalyzer {
    max_entries: usize,
    parallel: bool,
}

impl ColorAnalyzer {
    pub fn new() -> Self {
        Self {
            max_entries: 7,
            parallel: true,
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn analyze(&self, image: &DynamicImage) -> Result<ColorDistribution> {
        let rgba = image.to_rgba8();
        self.analyze_rgba(rgba.as_raw())
    }

    /// Ranks colours of an RGBA buffer by frequency. Alpha is ignored; equal
    /// counts keep the order in which the colours first appear.
    pub fn analyze_rgba(&self, data: &[u8]) -> Result<ColorDistribution> {
        if data.len() % CHANNELS != 0 {
            return Err(InsightError::InvalidParameter(format!(
                "RGBA buffer length {} is not a multiple of {}",
                data.len(),
                CHANNELS
            )));
        }

        let total_pixels = (data.len() / CHANNELS) as u64;
        if total_pixels == 0 {
            return Ok(ColorDistribution::default());
        }

        let histogram = if self.parallel {
            data.par_chunks(PIXELS_PER_CHUNK * CHANNELS)
                .enumerate()
                .map(|(i, chunk)| count_chunk(chunk, i * PIXELS_PER_CHUNK))
                .reduce(Histogram::new, merge_histograms)
        } else {
            count_chunk(data, 0)
        };

        let mut ranked: Vec<([u8; 3], Bucket)> = histogram.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.count
                .cmp(&a.1.count)
                .then(a.1.first_seen.cmp(&b.1.first_seen))
        });
        ranked.truncate(self.max_entries);

        let shares = ranked
            .into_iter()
            .map(|(rgb, bucket)| ColorShare {
                swatch: ColorSwatch(rgb),
                percentage: round2(bucket.count as f64 / total_pixels as f64 * 100.0),
                count: bucket.count,
            })
            .collect();

        Ok(ColorDistribution {
            total_pixels,
            shares,
        })
    }
}

impl Default for ColorAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

fn count_chunk(chunk: &[u8], first_pixel: usize) -> Histogram {
    let mut histogram = Histogram::new();

    for (i, px) in chunk.chunks_exact(CHANNELS).enumerate() {
        histogram
            .entry([px[0], px[1], px[2]])
            .and_modify(|b| b.count += 1)
            .or_insert(Bucket {
                count: 1,
                first_seen: first_pixel + i,
            });
    }

    histogram
}

fn merge_histograms(mut into: Histogram, from: Histogram) -> Histogram {
    for (rgb, bucket) in from {
        into.entry(rgb)
            .and_modify(|b| {
                b.count += bucket.count;
                b.first_seen = b.first_seen.min(bucket.first_seen);
            })
            .or_insert(bucket);
    }
    into
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
