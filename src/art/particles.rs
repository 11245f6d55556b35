use std::f64::consts::TAU;

use super::{GenerationContext, Tier};
use crate::noise::ValueNoise;
use crate::prng::SeededStream;
use crate::sketch::{Rgba, Sketch};

const NOISE_INCREMENT: f64 = 0.1;
const DEPTH_INCREMENT: f64 = 0.01;
const MAX_SPEED: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub pos: (f64, f64),
    pub vel: (f64, f64),
    acc: (f64, f64),
    pub color: Rgba,
    pub weight: f64,
}

impl Particle {
    fn spawn(ctx: &mut GenerationContext) -> Self {
        let x = ctx.stream.below(ctx.size);
        let y = ctx.stream.below(ctx.size);
        let r = ctx.stream.below(255.0) as u8;
        let g = ctx.stream.below(255.0) as u8;
        let b = ctx.stream.below(255.0) as u8;
        let weight = ctx.stream.range(1.0, 3.0);
        Self {
            pos: (x, y),
            vel: (0.0, 0.0),
            acc: (0.0, 0.0),
            color: Rgba::new([r, g, b], 100.0),
            weight,
        }
    }

    fn update(&mut self) {
        self.vel.0 += self.acc.0;
        self.vel.1 += self.acc.1;
        let speed = self.vel.0.hypot(self.vel.1);
        if speed > MAX_SPEED {
            let scale = MAX_SPEED / speed;
            self.vel.0 *= scale;
            self.vel.1 *= scale;
        }
        self.pos.0 += self.vel.0;
        self.pos.1 += self.vel.1;
        self.acc = (0.0, 0.0);
    }

    fn wrap(&mut self, size: f64) {
        if self.pos.0 > size {
            self.pos.0 = 0.0;
        }
        if self.pos.0 < 0.0 {
            self.pos.0 = size;
        }
        if self.pos.1 > size {
            self.pos.1 = 0.0;
        }
        if self.pos.1 < 0.0 {
            self.pos.1 = size;
        }
    }

    fn show(&self, sketch: &mut Sketch, roll: f64) {
        if roll < 0.33 {
            sketch.point(self.pos.0, self.pos.1, self.color, self.weight);
        } else if roll < 0.66 {
            let tail = (self.pos.0 + self.vel.0 * 5.0, self.pos.1 + self.vel.1 * 5.0);
            sketch.stroke_line(self.pos, tail, self.color, self.weight);
        } else {
            sketch.fill_ellipse(self.pos.0, self.pos.1, 3.0, 3.0, self.color);
        }
    }
}

/// Flow-field particle system sized by tier.
#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    cell: f64,
    cols: usize,
    rows: usize,
    depth: f64,
    size: f64,
}

impl ParticleField {
    pub fn new(ctx: &mut GenerationContext, tier: Tier) -> Self {
        let cell = tier.flow_cell_size();
        let cols = (ctx.size / cell).floor() as usize;
        let rows = cols;
        let particles = (0..tier.particle_count()).map(|_| Particle::spawn(ctx)).collect();
        Self {
            particles,
            cell,
            cols,
            rows,
            depth: 0.0,
            size: ctx.size,
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Rebuilds the flow field at the current depth, advects and draws every
    /// particle once, then advances depth.
    pub fn step(&mut self, sketch: &mut Sketch, noise: &ValueNoise, style_rolls: &mut SeededStream) {
        let field = self.flow_vectors(noise);
        self.depth += DEPTH_INCREMENT;

        for particle in &mut self.particles {
            let col = (particle.pos.0 / self.cell).floor();
            let row = (particle.pos.1 / self.cell).floor();
            if col >= 0.0 && row >= 0.0 {
                let (col, row) = (col as usize, row as usize);
                if col < self.cols && row < self.rows {
                    let force = field[col + row * self.cols];
                    particle.acc.0 += force.0;
                    particle.acc.1 += force.1;
                }
            }
            particle.update();
            particle.wrap(self.size);
            particle.show(sketch, style_rolls.next());
        }
    }

    fn flow_vectors(&self, noise: &ValueNoise) -> Vec<(f64, f64)> {
        let mut field = Vec::with_capacity(self.cols * self.rows);
        let mut yoff = 0.0;
        for _ in 0..self.rows {
            let mut xoff = 0.0;
            for _ in 0..self.cols {
                let angle = noise.sample3(xoff, yoff, self.depth) * TAU * 4.0;
                field.push((angle.cos(), angle.sin()));
                xoff += NOISE_INCREMENT;
            }
            yoff += NOISE_INCREMENT;
        }
        field
    }
}

#[cfg(test)]
mod tests {
    use super::ParticleField;
    use crate::art::{GenerationContext, Tier};
    use crate::prng::SeededStream;
    use crate::sketch::Sketch;

    #[test]
    fn tier_sets_density_and_grid() {
        let mut ctx = GenerationContext::new("particles", 200);
        let field = ParticleField::new(&mut ctx, Tier::Uncommon);
        assert_eq!(field.particles().len(), 1000);
        assert_eq!(field.cols, 6);
    }

    #[test]
    fn particles_stay_inside_canvas_after_steps() {
        let mut ctx = GenerationContext::new("wrap", 64);
        let mut field = ParticleField::new(&mut ctx, Tier::Common);
        let mut sketch = Sketch::new(64).expect("sketch");
        let mut rolls = SeededStream::new(ctx.seed());
        for _ in 0..40 {
            field.step(&mut sketch, &ctx.noise, &mut rolls);
        }
        for particle in field.particles() {
            assert!((0.0..=64.0).contains(&particle.pos.0));
            assert!((0.0..=64.0).contains(&particle.pos.1));
            assert!(particle.vel.0.hypot(particle.vel.1) <= 2.0 + 1e-9);
        }
    }
}
