//! Black-Scholes Monte-Carlo replication.
//!
//! Prices a European option, then replays delta hedging along simulated
//! spot paths and histograms the replication P&L.

use std::any::Any;

use rand::Rng;

use crate::serial::{
    ArchiveError, ReadArchive, Serializable, WriteArchive, read_class, write_class,
};

use super::engine::SimulationEngine;
use super::histogram::{DEFAULT_INTERVALS, DistributionHistogram};
use super::math::NormalDistribution;
use super::request::SimulationRequest;
use super::result::SimulationResult;

pub const MODEL_BLACK_SCHOLES_SPOT: i32 = 1;
pub const MODEL_BLACK_SCHOLES_FUTURE_TRUNCATION: i32 = 2;
pub const MODEL_BLACK_SCHOLES_FUTURE_APPROXIMATION: i32 = 3;
pub const MODEL_BLACK: i32 = 4;
pub const MODEL_BUNEA: i32 = 5;

/// About one minute, expressed in years.
const MIN_TIME_TO_MATURITY: f64 = 1.0 / (365.0 * 24.0 * 60.0);

const PROGRESS_EVERY: i32 = 100;

#[derive(Clone, Debug, Default)]
pub struct BlackScholes {
    pub is_call: bool,
    pub spot_price: f64,
    pub strike_price: f64,
    pub time_to_option_expiration: f64,
    pub time_to_future_expiration: f64,
    /// Growth rate of the spot price in the physical measure.
    pub growth_rate: f64,
    pub interest_rate: f64,
    pub dividend_yield: f64,
    pub volatility: f64,
    /// Number of steps the time to expiration is divided into.
    pub replication_steps: i32,
    /// Number of replication paths to simulate.
    pub simulations_count: i32,
    pub pricing_model: i32,
}

impl BlackScholes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closed-form price under the selected model, or `None` for an unknown
    /// model id.
    pub fn price(&self) -> Option<f64> {
        match self.pricing_model {
            MODEL_BLACK_SCHOLES_SPOT
            | MODEL_BLACK_SCHOLES_FUTURE_TRUNCATION
            | MODEL_BLACK_SCHOLES_FUTURE_APPROXIMATION => Some(self.price_black_scholes()),
            MODEL_BLACK => Some(self.price_black()),
            MODEL_BUNEA => Some(self.price_bunea()),
            _ => None,
        }
    }

    fn intrinsic(&self) -> f64 {
        let side = if self.is_call { 1.0 } else { -1.0 };
        ((self.spot_price - self.strike_price) * side).max(0.0)
    }

    fn price_black_scholes(&self) -> f64 {
        self.price_generalized(self.interest_rate, self.dividend_yield)
    }

    /// Black's model for options on futures: the carry rate equals the rate.
    fn price_black(&self) -> f64 {
        self.price_generalized(self.interest_rate, self.interest_rate)
    }

    fn price_generalized(&self, r: f64, q: f64) -> f64 {
        let dist = NormalDistribution::standard();
        let s = self.spot_price;
        let x = self.strike_price;
        let t = self.time_to_option_expiration;
        let v = self.volatility;

        if t < MIN_TIME_TO_MATURITY {
            return self.intrinsic();
        }

        let vsqrt = v * t.sqrt();
        let d1 = ((s / x).ln() + (r - q + 0.5 * v * v) * t) / vsqrt;
        let d2 = d1 - vsqrt;

        if self.is_call {
            s * (-q * t).exp() * dist.cdf(d1) - x * (-r * t).exp() * dist.cdf(d2)
        } else {
            -s * (-q * t).exp() * dist.cdf(-d1) + x * (-r * t).exp() * dist.cdf(-d2)
        }
    }

    /// Prices off the discounted forward to the future's expiration.
    fn price_bunea(&self) -> f64 {
        let dist = NormalDistribution::standard();
        let t = self.time_to_option_expiration;
        let r = self.interest_rate;
        let q = self.dividend_yield;
        let v = self.volatility;
        let k = self.strike_price;

        if t < MIN_TIME_TO_MATURITY {
            return self.intrinsic();
        }

        let f = self.spot_price * ((r - q) * t).exp();
        let discount = (-(r - q) * (self.time_to_future_expiration - t)).exp();
        let fd = f * discount;

        let vsqrt = v * t.sqrt();
        let d1 = ((fd / k).ln() + (r + 0.5 * v * v) * t) / vsqrt;
        let d2 = d1 - vsqrt;

        if self.is_call {
            fd * dist.cdf(d1) - k * (-r * t).exp() * dist.cdf(d2)
        } else {
            -fd * dist.cdf(-d1) + k * (-r * t).exp() * dist.cdf(-d2)
        }
    }

    /// Central-difference delta.
    pub fn delta(&self) -> Option<f64> {
        let h = self.spot_price * 0.01;
        let mut higher = self.clone();
        let mut lower = self.clone();
        higher.spot_price += h;
        lower.spot_price -= h;
        Some((higher.price()? - lower.price()?) / (2.0 * h))
    }

    /// Geometric Brownian motion walk of the spot, one value per step plus
    /// the starting point, together with the remaining time at each step.
    fn simulate_path<R: Rng>(&self, rng: &mut R) -> (Vec<f64>, Vec<f64>) {
        let steps = self.replication_steps.max(1) as usize;
        let mut spot = Vec::with_capacity(steps + 1);
        let mut time = Vec::with_capacity(steps + 1);

        let dist = NormalDistribution::standard();
        let dt = self.time_to_option_expiration / steps as f64;
        let sqdt = dt.sqrt();
        let mut s = self.spot_price;

        for i in 0..=steps {
            let t = (self.time_to_option_expiration - dt * i as f64).max(0.0);
            spot.push(s);
            time.push(t);
            let eps = dist.sample(rng);
            s += s * (self.growth_rate * dt + self.volatility * eps * sqdt);
        }

        (spot, time)
    }

    /// Replicates the option along one random path: enter a delta position,
    /// rebalance at every step, close at expiration. Returns the residual
    /// bank account, ideally zero.
    pub fn simulate_replication<R: Rng>(&self, rng: &mut R) -> Option<f64> {
        let (spot, time) = self.simulate_path(rng);

        let mut qs = 0.0; // quantity in the asset
        let mut qb = 0.0; // quantity in the bank
        let mut model = self.clone();
        let dt_fut_opt = self.time_to_future_expiration - self.time_to_option_expiration;
        let last = spot.len() - 1;

        for i in 0..spot.len() {
            model.spot_price = spot[i];
            model.time_to_option_expiration = time[i];
            model.time_to_future_expiration = time[i] + dt_fut_opt;

            let p = model.price()?;
            let d = model.delta()?;
            let dt = if i > 0 { time[i - 1] - time[i] } else { 0.0 };
            let f = model.spot_price
                * ((model.interest_rate - model.dividend_yield) * model.time_to_option_expiration)
                    .exp();

            // Interest on the bank account.
            qb *= (self.interest_rate * dt).exp();

            let (underlier_price, underlier_quantity, dividend_yield) = match self.pricing_model {
                // Hedge in the spot, which pays dividends.
                MODEL_BLACK_SCHOLES_SPOT => (model.spot_price, d, self.dividend_yield),
                // Hedge in the future, delta adjusted for the carry.
                MODEL_BLACK_SCHOLES_FUTURE_APPROXIMATION => {
                    let adjustment = (-(model.interest_rate - model.dividend_yield)
                        * model.time_to_option_expiration)
                        .exp();
                    (f, d * adjustment, 0.0)
                }
                // Hedge in the future.
                MODEL_BLACK_SCHOLES_FUTURE_TRUNCATION | MODEL_BLACK | MODEL_BUNEA => (f, d, 0.0),
                _ => return None,
            };

            // Dividends accrue to the asset position.
            qs *= (dividend_yield * dt).exp();

            if i == 0 {
                // Enter: buy the delta, borrow the missing money.
                qs = underlier_quantity;
                qb = p - qs * underlier_price;
            } else if i < last {
                // Rebalance to the new delta.
                let dqs = underlier_quantity - qs;
                qs = underlier_quantity;
                qb -= dqs * underlier_price;
            } else {
                // Close: sell the position, pay off the option.
                qb += qs * underlier_price - p;
            }
        }

        Some(qb)
    }

    fn validate(&self) -> bool {
        if self.price().is_none() {
            tracing::warn!(model = self.pricing_model, "unknown pricing model");
            return false;
        }
        if self.replication_steps <= 0 || self.simulations_count <= 0 {
            tracing::warn!(
                steps = self.replication_steps,
                count = self.simulations_count,
                "simulation parameters out of range"
            );
            return false;
        }
        true
    }
}

impl SimulationRequest for BlackScholes {
    fn run(&self, engine: &SimulationEngine) {
        if !self.validate() {
            engine.notify_progress(0.0, None);
            return;
        }

        let mut rng = rand::rng();
        let mut histogram = DistributionHistogram::new();

        for i in (1..=self.simulations_count).rev() {
            if i % PROGRESS_EVERY == 0 {
                engine.notify_progress(i as f64 / self.simulations_count as f64, None);
            }

            if let Some(pnl) = self.simulate_replication(&mut rng) {
                histogram.add(pnl);
            }

            if engine.is_simulation_stop_requested() {
                tracing::info!("simulation interrupted");
                engine.notify_progress(0.0, None);
                return;
            }
        }

        histogram.compute();
        tracing::debug!(
            price = self.price(),
            mean = histogram.mean(),
            deviation = histogram.deviation(),
            "replication summary"
        );

        let mut result = SimulationResult::new();
        result.add(histogram.histogram(DEFAULT_INTERVALS));
        engine.notify_progress(0.0, Some(&result));
    }
}

impl Serializable for BlackScholes {
    fn hierarchy(&self) -> String {
        "simulation.BlackScholes".to_string()
    }

    fn new_instance(&self) -> Box<dyn Serializable> {
        Box::new(BlackScholes::new())
    }

    fn write_to(&self, archive: &mut WriteArchive) -> Result<(), ArchiveError> {
        write_class(archive, "BlackScholes", |body| {
            body.write_bool("IsCall", self.is_call)?;
            body.write_f32("SpotPrice", self.spot_price as f32)?;
            body.write_f32("StrikePrice", self.strike_price as f32)?;
            body.write_f32("TimeToOptionExpiration", self.time_to_option_expiration as f32)?;
            body.write_f32("TimeToFutureExpiration", self.time_to_future_expiration as f32)?;
            body.write_f32("GrowthRate", self.growth_rate as f32)?;
            body.write_f32("InterestRate", self.interest_rate as f32)?;
            body.write_f32("DividendYield", self.dividend_yield as f32)?;
            body.write_f32("Volatility", self.volatility as f32)?;
            body.write_i32("ReplicationSteps", self.replication_steps)?;
            body.write_i32("SimulationsCount", self.simulations_count)?;
            body.write_i32("PricingModel", self.pricing_model)
        })
    }

    fn read_from(&mut self, archive: &mut ReadArchive<'_>) -> Result<(), ArchiveError> {
        read_class(archive, "BlackScholes", |body| {
            self.is_call = body.read_bool("IsCall")?;
            self.spot_price = body.read_f32("SpotPrice")? as f64;
            self.strike_price = body.read_f32("StrikePrice")? as f64;
            self.time_to_option_expiration = body.read_f32("TimeToOptionExpiration")? as f64;
            self.time_to_future_expiration = body.read_f32("TimeToFutureExpiration")? as f64;
            self.growth_rate = body.read_f32("GrowthRate")? as f64;
            self.interest_rate = body.read_f32("InterestRate")? as f64;
            self.dividend_yield = body.read_f32("DividendYield")? as f64;
            self.volatility = body.read_f32("Volatility")? as f64;
            self.replication_steps = body.read_i32("ReplicationSteps")?;
            self.simulations_count = body.read_i32("SimulationsCount")?;
            self.pricing_model = body.read_i32("PricingModel")?;
            Ok(())
        })
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_message(
        self: Box<Self>,
    ) -> Result<Box<dyn crate::net::Message>, Box<dyn Serializable>> {
        Err(self)
    }

    fn into_simulation(
        self: Box<Self>,
    ) -> Result<Box<dyn SimulationRequest>, Box<dyn Serializable>> {
        Ok(self)
    }
}
