//! Normal distribution sampling and cumulative probabilities.

use rand::Rng;

pub struct NormalDistribution {
    mean: f64,
    deviation: f64,
}

impl Default for NormalDistribution {
    fn default() -> Self {
        Self::standard()
    }
}

impl NormalDistribution {
    pub fn standard() -> Self {
        Self::new(0.0, 1.0)
    }

    pub fn new(mean: f64, deviation: f64) -> Self {
        Self { mean, deviation }
    }

    /// Box-Muller transform.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
        let u2: f64 = rng.random();
        let z = (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos();
        self.mean + self.deviation * z
    }

    pub fn cdf(&self, x: f64) -> f64 {
        let z = (x - self.mean) / self.deviation;
        0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
    }
}

/// Abramowitz & Stegun 7.1.26, accurate to about 1.5e-7.
fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let y = 1.0 - (((((A5 * t + A4) * t) + A3) * t + A2) * t + A1) * t * (-x * x).exp();
    sign * y
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn standard_cdf_values() {
        let dist = NormalDistribution::standard();
        assert!((dist.cdf(0.0) - 0.5).abs() < 1e-6);
        assert!((dist.cdf(1.96) - 0.975).abs() < 1e-3);
        assert!((dist.cdf(-1.96) - 0.025).abs() < 1e-3);
    }

    #[test]
    fn samples_match_requested_moments() {
        let dist = NormalDistribution::new(2.0, 3.0);
        let mut rng = StdRng::seed_from_u64(42);

        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| dist.sample(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let variance = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;

        assert!((mean - 2.0).abs() < 0.1);
        assert!((variance.sqrt() - 3.0).abs() < 0.1);
    }
}
