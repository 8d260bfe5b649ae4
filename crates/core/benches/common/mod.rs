use std::env;
use std::time::Duration;

use criterion::measurement::Measurement;
use criterion::{BenchmarkGroup, Criterion, Throughput};

use mathseg_core::BoundingBox;
use mathseg_core::page::{BlobInput, PageInput, RecognitionContext, RowId, WordId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchTier {
    Quick,
    Full,
}

impl BenchTier {
    pub fn from_env() -> Self {
        match env::var("MATHSEG_BENCH_TIER").as_deref() {
            Ok("full") => Self::Full,
            _ => Self::Quick,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupWeight {
    Light,
    Heavy,
}

#[derive(Debug, Clone)]
pub struct BenchConfig {
    pub tier: BenchTier,
    pub seed: u64,
    pub sample_size_light: usize,
    pub sample_size_heavy: usize,
    pub measurement_light: Duration,
    pub measurement_heavy: Duration,
}

pub type BenchCriterion = Criterion;

pub fn bench_config() -> BenchConfig {
    let tier = BenchTier::from_env();
    let seed = env::var("MATHSEG_BENCH_SEED")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(0xC0FFEE);
    let (sample_size_light, sample_size_heavy, measurement_light, measurement_heavy) = match tier {
        BenchTier::Quick => (20, 12, Duration::from_secs(3), Duration::from_secs(5)),
        BenchTier::Full => (30, 20, Duration::from_secs(5), Duration::from_secs(10)),
    };

    BenchConfig {
        tier,
        seed,
        sample_size_light,
        sample_size_heavy,
        measurement_light,
        measurement_heavy,
    }
}

pub fn configure_group<M: Measurement>(
    group: &mut BenchmarkGroup<'_, M>,
    cfg: &BenchConfig,
    weight: GroupWeight,
) {
    match weight {
        GroupWeight::Light => {
            group.sample_size(cfg.sample_size_light);
            group.measurement_time(cfg.measurement_light);
        }
        GroupWeight::Heavy => {
            group.sample_size(cfg.sample_size_heavy);
            group.measurement_time(cfg.measurement_heavy);
        }
    }
}

pub fn bench_criterion() -> BenchCriterion {
    Criterion::default().configure_from_args()
}

pub fn pages_throughput(pages: usize) -> Throughput {
    Throughput::Elements(pages as u64)
}

pub fn blobs_throughput(blobs: usize) -> Throughput {
    Throughput::Elements(blobs as u64)
}

#[derive(Clone)]
pub struct XorShift64 {
    state: u64,
}

impl XorShift64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    pub fn gen_range(&mut self, min: i32, max: i32) -> i32 {
        min + (self.next_u64() % (max - min).max(1) as u64) as i32
    }
}

pub const PAGE_WIDTH: i32 = 2550;
pub const PAGE_HEIGHT: i32 = 3300;

/// A scanned-page lookalike: rows of word-sized glyph runs on normal text
/// rows, with a handful of displayed formulas between them.
pub fn synthetic_page(seed: u64, rows: usize) -> PageInput {
    let mut rng = XorShift64::new(seed);
    let mut blobs = Vec::new();
    let mut word = 0usize;
    let row_pitch = (PAGE_HEIGHT - 200) / rows.max(1) as i32;

    for row in 0..rows {
        let base = PAGE_HEIGHT - 100 - (row as i32 + 1) * row_pitch;
        let displayed = row % 7 == 3;
        let mut x = 150 + rng.gen_range(0, 20);
        while x < PAGE_WIDTH - 200 {
            let letters = rng.gen_range(2, 9);
            for _ in 0..letters {
                let w = rng.gen_range(14, 28);
                let h = rng.gen_range(24, 40);
                let bbox = BoundingBox::new(x, base, x + w, base + h);
                let is_math = displayed || rng.gen_range(0, 100) < 4;
                let recognition = if displayed {
                    RecognitionContext::default()
                } else {
                    RecognitionContext {
                        word: Some(WordId(word)),
                        row: Some(RowId(row)),
                        certainty: -(rng.gen_range(0, 80) as f32) / 10.0,
                        is_valid_word: rng.gen_range(0, 10) < 8,
                        on_normal_row: true,
                        ..RecognitionContext::default()
                    }
                };
                blobs.push(BlobInput::new(bbox, is_math).with_recognition(recognition));
                x += w + rng.gen_range(2, 6);
            }
            word += 1;
            x += rng.gen_range(20, 40);
        }
    }

    PageInput::new(format!("synthetic-{seed:x}"), PAGE_WIDTH, PAGE_HEIGHT, blobs)
}
