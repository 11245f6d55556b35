//! Deterministic generative art: one hash in, one raster plus metadata out.
//!
//! Draw order within one `GenerationContext` stream:
//! tier, particle construction, palette, background, foreground shapes.
//! The particle pass then re-seeds its own stream from the hash for its
//! render-style rolls.

mod background;
mod particles;
mod shapes;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use anyhow::Result;
use serde::Serialize;
use tiny_skia::Pixmap;
use tracing::debug;

use crate::noise::ValueNoise;
use crate::prng::{effective_hash, seed_from_hash, SeededStream};
use crate::sketch::{pixmap_to_rgba_image, Rgb, Sketch};

pub use background::BackgroundStyle;
pub use particles::{Particle, ParticleField};
pub use shapes::ShapeKind;

pub type Palette = [Rgb; 5];

pub const PALETTES: [Palette; 5] = [
    [[230, 57, 70], [241, 250, 238], [168, 218, 220], [69, 123, 157], [29, 53, 87]],
    [[255, 190, 11], [251, 86, 7], [255, 0, 110], [131, 56, 236], [58, 134, 255]],
    [[6, 214, 160], [27, 154, 170], [239, 71, 111], [255, 196, 61], [17, 138, 178]],
    [[38, 70, 83], [42, 157, 143], [233, 196, 106], [244, 162, 97], [231, 111, 81]],
    [[155, 93, 229], [0, 187, 249], [0, 245, 212], [251, 86, 7], [254, 228, 64]],
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Legendary,
    Rare,
    Uncommon,
    Common,
}

impl Tier {
    /// Maps one `[0, 1)` roll onto the rarity distribution.
    pub fn from_roll(roll: f64) -> Self {
        if roll < 0.01 {
            Self::Legendary
        } else if roll < 0.1 {
            Self::Rare
        } else if roll < 0.3 {
            Self::Uncommon
        } else {
            Self::Common
        }
    }

    pub fn particle_count(self) -> usize {
        match self {
            Self::Legendary => 3000,
            Self::Rare => 2000,
            Self::Uncommon => 1000,
            Self::Common => 500,
        }
    }

    /// Side of one flow-field cell in pixels.
    pub fn flow_cell_size(self) -> f64 {
        match self {
            Self::Legendary => 10.0,
            Self::Rare => 20.0,
            Self::Uncommon => 30.0,
            Self::Common => 40.0,
        }
    }

    /// Half-open `[min, max)` range the shape count is drawn from.
    pub fn shape_range(self) -> (f64, f64) {
        match self {
            Self::Legendary => (50.0, 100.0),
            Self::Rare => (30.0, 70.0),
            Self::Uncommon => (20.0, 50.0),
            Self::Common => (10.0, 30.0),
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Legendary => "legendary",
            Self::Rare => "rare",
            Self::Uncommon => "uncommon",
            Self::Common => "common",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// Shared handle to a finished raster.
#[derive(Clone)]
pub struct ArtImage(Arc<Pixmap>);

impl ArtImage {
    pub fn pixmap(&self) -> &Pixmap {
        &self.0
    }

    pub fn width(&self) -> u32 {
        self.0.width()
    }

    pub fn to_rgba_image(&self) -> Result<image::RgbaImage> {
        pixmap_to_rgba_image(&self.0)
    }

    pub fn digest(&self) -> String {
        crate::sketch::sha256_hex(self.0.data())
    }
}

impl fmt::Debug for ArtImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ArtImage({}x{})", self.0.width(), self.0.height())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ArtMetadata {
    pub hash: String,
    #[serde(skip)]
    pub image: ArtImage,
    pub tier: Tier,
    pub shape_count: u32,
    pub background_style: BackgroundStyle,
    pub shape_types: BTreeMap<ShapeKind, u32>,
    pub palette: Palette,
}

/// All mutable state for one generation pass. Never shared between hashes.
pub struct GenerationContext {
    pub stream: SeededStream,
    pub noise: ValueNoise,
    pub size: f64,
    seed: u64,
}

impl GenerationContext {
    pub fn new(hash: &str, size: u32) -> Self {
        let seed = seed_from_hash(hash);
        Self {
            stream: SeededStream::new(seed),
            noise: ValueNoise::new(seed),
            size: f64::from(size.max(1)),
            seed,
        }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn pick_color(&mut self, palette: &Palette) -> Rgb {
        self.stream.pick_array(palette)
    }
}

/// Stateless entry point; all per-hash state lives in a fresh context.
#[derive(Debug, Clone, Copy)]
pub struct ArtEngine {
    /// Flow-field steps run over the finished image.
    pub particle_steps: u32,
}

impl ArtEngine {
    pub fn new() -> Self {
        Self { particle_steps: 1 }
    }

    pub fn with_particle_steps(particle_steps: u32) -> Self {
        Self {
            particle_steps: particle_steps.max(1),
        }
    }

    pub fn generate(&self, hash: &str, size: u32) -> Result<ArtMetadata> {
        let mut ctx = GenerationContext::new(hash, size);
        let mut sketch = Sketch::new(size)?;

        let tier = Tier::from_roll(ctx.stream.next());
        let mut field = ParticleField::new(&mut ctx, tier);
        let palette = ctx.stream.pick_array(&PALETTES);

        let background_style = background::paint(&mut sketch, &mut ctx, &palette);
        let tally = shapes::paint(&mut sketch, &mut ctx, &palette, tier);

        let mut style_rolls = SeededStream::new(ctx.seed());
        for _ in 0..self.particle_steps.max(1) {
            field.step(&mut sketch, &ctx.noise, &mut style_rolls);
        }

        debug!(
            hash = effective_hash(hash),
            %tier,
            background = background_style.keyword(),
            shapes = tally.total,
            "generated art"
        );

        Ok(ArtMetadata {
            hash: hash.to_owned(),
            image: ArtImage(Arc::new(sketch.into_pixmap())),
            tier,
            shape_count: tally.total,
            background_style,
            shape_types: tally.counts,
            palette,
        })
    }
}

impl Default for ArtEngine {
    fn default() -> Self {
        Self::new()
    }
}
