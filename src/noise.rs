//! Layered value noise on a wrapped 3-D lattice.
//!
//! Four octaves with 0.5 amplitude falloff and cosine interpolation between
//! lattice values. Output is in `[0, 1)`. The lattice is filled from a seed,
//! so two generators built from the same seed agree at every point.

use crate::prng::XorShift64;

const YWRAP_BITS: usize = 4;
const YWRAP: usize = 1 << YWRAP_BITS;
const ZWRAP_BITS: usize = 8;
const ZWRAP: usize = 1 << ZWRAP_BITS;
const LATTICE_SIZE: usize = 4095;

#[derive(Debug, Clone)]
pub struct ValueNoise {
    lattice: Vec<f64>,
    octaves: u32,
    falloff: f64,
}

impl ValueNoise {
    pub fn new(seed: u64) -> Self {
        let mut rng = XorShift64::from_seed(seed);
        let lattice = (0..=LATTICE_SIZE).map(|_| rng.next_unit()).collect();
        Self {
            lattice,
            octaves: 4,
            falloff: 0.5,
        }
    }

    pub fn sample2(&self, x: f64, y: f64) -> f64 {
        self.sample3(x, y, 0.0)
    }

    pub fn sample3(&self, x: f64, y: f64, z: f64) -> f64 {
        let (x, y, z) = (x.abs(), y.abs(), z.abs());

        let mut xi = x.floor() as usize;
        let mut yi = y.floor() as usize;
        let mut zi = z.floor() as usize;
        let mut xf = x - x.floor();
        let mut yf = y - y.floor();
        let mut zf = z - z.floor();

        let mut total = 0.0;
        let mut amplitude = 0.5;

        for _ in 0..self.octaves {
            let mut offset = xi + (yi << YWRAP_BITS) + (zi << ZWRAP_BITS);

            let rx = scaled_cosine(xf);
            let ry = scaled_cosine(yf);

            let mut n1 = self.at(offset);
            n1 += rx * (self.at(offset + 1) - n1);
            let mut n2 = self.at(offset + YWRAP);
            n2 += rx * (self.at(offset + YWRAP + 1) - n2);
            n1 += ry * (n2 - n1);

            offset += ZWRAP;
            n2 = self.at(offset);
            n2 += rx * (self.at(offset + 1) - n2);
            let mut n3 = self.at(offset + YWRAP);
            n3 += rx * (self.at(offset + YWRAP + 1) - n3);
            n2 += ry * (n3 - n2);

            n1 += scaled_cosine(zf) * (n2 - n1);

            total += n1 * amplitude;
            amplitude *= self.falloff;

            xi <<= 1;
            xf *= 2.0;
            yi <<= 1;
            yf *= 2.0;
            zi <<= 1;
            zf *= 2.0;

            if xf >= 1.0 {
                xi += 1;
                xf -= 1.0;
            }
            if yf >= 1.0 {
                yi += 1;
                yf -= 1.0;
            }
            if zf >= 1.0 {
                zi += 1;
                zf -= 1.0;
            }
        }

        total.clamp(0.0, 1.0 - f64::EPSILON)
    }

    fn at(&self, offset: usize) -> f64 {
        self.lattice[offset & LATTICE_SIZE]
    }
}

fn scaled_cosine(t: f64) -> f64 {
    0.5 * (1.0 - (t * std::f64::consts::PI).cos())
}
