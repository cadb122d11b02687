//! Random search over reshapeable histograms.
//!
//! Each parameter's sampling distribution is a weighted histogram: one bin
//! per value for Choice and Ordinal parameters, and equal-width bins over
//! the linear (or `log10`) domain for Discrete and Continuous parameters.
//! All bins start with weight 1. [`Algorithm::grow`] shifts weight toward
//! (positive amount) or away from (negative amount) the bins containing a
//! configuration's values. Weights never drop below a small positive floor,
//! so no region of the space becomes unreachable.

use std::collections::BTreeMap;

use crate::algorithm::Algorithm;
use crate::error::Result;
use crate::ledger::ResultsLedger;
use crate::parameter::{self, Parameter, Scale};
use crate::rng_util;
use crate::types::Direction;
use crate::value::{Configuration, Value};

const DEFAULT_BINS: usize = 10;
const MIN_WEIGHT: f64 = 0.01;

/// One parameter's weighted histogram.
#[derive(Clone, Debug)]
struct Histogram {
    parameter: Parameter,
    weights: Vec<f64>,
}

impl Histogram {
    fn new(parameter: &Parameter, bins: usize) -> Self {
        let n = match parameter {
            Parameter::Choice { range, .. } | Parameter::Ordinal { range, .. } => range.len(),
            Parameter::Discrete { low, high, .. } => {
                let span = usize::try_from(high - low).unwrap_or(usize::MAX);
                bins.min(span.saturating_add(1))
            }
            Parameter::Continuous { .. } => bins,
        };
        Self {
            parameter: parameter.clone(),
            weights: vec![1.0; n.max(1)],
        }
    }

    /// Numeric domain in which bins are equally wide.
    fn domain(&self) -> Option<(f64, f64)> {
        let (lo, hi) = self.parameter.bounds()?;
        Some(match self.parameter.scale() {
            Scale::Linear => (lo, hi),
            Scale::Log => (lo.log10(), hi.log10()),
        })
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn bin_of(&self, value: &Value) -> Option<usize> {
        match &self.parameter {
            Parameter::Choice { .. } | Parameter::Ordinal { .. } => self.parameter.index_of(value),
            Parameter::Discrete { .. } | Parameter::Continuous { .. } => {
                let (lo, hi) = self.domain()?;
                let v = value.as_f64()?;
                let x = match self.parameter.scale() {
                    Scale::Linear => v,
                    Scale::Log => v.log10(),
                };
                let n = self.weights.len();
                if hi <= lo || !x.is_finite() {
                    return Some(0);
                }
                let pos = ((x - lo) / (hi - lo) * n as f64).floor().max(0.0) as usize;
                Some(pos.min(n - 1))
            }
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn sample(&self, rng: &mut fastrand::Rng) -> Value {
        let bin = rng_util::weighted_index(rng, &self.weights);
        match &self.parameter {
            Parameter::Choice { range, .. } | Parameter::Ordinal { range, .. } => {
                range[bin].clone()
            }
            Parameter::Discrete { low, high, .. } => {
                let v = self.sample_in_bin(rng, bin);
                Value::Int((v.round() as i64).clamp(*low, *high))
            }
            Parameter::Continuous { low, high, .. } => {
                Value::Float(self.sample_in_bin(rng, bin).clamp(*low, *high))
            }
        }
    }

    /// Uniform draw inside numeric bin `bin`, mapped back from the domain.
    #[allow(clippy::cast_precision_loss)]
    fn sample_in_bin(&self, rng: &mut fastrand::Rng, bin: usize) -> f64 {
        let (lo, hi) = self.domain().unwrap_or_default();
        let width = (hi - lo) / self.weights.len() as f64;
        let x = rng_util::f64_range(rng, lo + width * bin as f64, lo + width * (bin + 1) as f64);
        match self.parameter.scale() {
            Scale::Linear => x,
            Scale::Log => 10f64.powf(x),
        }
    }

    fn grow(&mut self, value: &Value, amount: f64) {
        if let Some(bin) = self.bin_of(value) {
            let w = &mut self.weights[bin];
            *w = (*w + amount).max(MIN_WEIGHT);
        }
    }
}

/// A random sampler whose distribution can be grown around good
/// configurations.
///
/// Used by [`Hyperband`](crate::bandit::Hyperband) with distribution growth
/// enabled and by [`NaturalSelection`](crate::bandit::NaturalSelection).
///
/// # Examples
///
/// ```
/// use hpsweep::algorithm::{Algorithm, GrowingSearch};
/// use hpsweep::ledger::ResultsLedger;
/// use hpsweep::parameter::Parameter;
/// use hpsweep::value::Configuration;
/// use hpsweep::Direction;
///
/// let space = vec![Parameter::choice("act", vec!["relu", "tanh"])];
/// let ledger = ResultsLedger::new();
/// let mut search = GrowingSearch::with_seed(1);
///
/// let first = search.get_suggestion(&space, &ledger, Direction::Minimize).unwrap().unwrap();
/// search.grow(&first, 100.0);
/// assert!(search.weights("act").unwrap().iter().any(|w| *w > 100.0));
/// ```
pub struct GrowingSearch {
    rng: fastrand::Rng,
    bins: usize,
    histograms: BTreeMap<String, Histogram>,
}

impl GrowingSearch {
    /// Creates a growing search with a random seed and 10 bins per numeric
    /// parameter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: fastrand::Rng::new(),
            bins: DEFAULT_BINS,
            histograms: BTreeMap::new(),
        }
    }

    /// Creates a growing search with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: fastrand::Rng::with_seed(seed),
            ..Self::new()
        }
    }

    /// Sets the number of bins for numeric parameters.
    ///
    /// # Panics
    ///
    /// Panics if `bins` is 0.
    #[must_use]
    pub fn bins(mut self, bins: usize) -> Self {
        assert!(bins >= 1, "bins must be >= 1, got {bins}");
        self.bins = bins;
        self
    }

    /// Current bin weights of parameter `name`, once it has been sampled.
    #[must_use]
    pub fn weights(&self, name: &str) -> Option<&[f64]> {
        self.histograms.get(name).map(|h| h.weights.as_slice())
    }

    fn histogram(&mut self, parameter: &Parameter) -> &mut Histogram {
        let bins = self.bins;
        let entry = self
            .histograms
            .entry(parameter.name().to_owned())
            .or_insert_with(|| Histogram::new(parameter, bins));
        if entry.parameter != *parameter {
            *entry = Histogram::new(parameter, bins);
        }
        entry
    }
}

impl Default for GrowingSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl Algorithm for GrowingSearch {
    fn get_suggestion(
        &mut self,
        parameters: &[Parameter],
        _results: &ResultsLedger,
        _direction: Direction,
    ) -> Result<Option<Configuration>> {
        parameter::validate_space(parameters)?;
        let mut config = Configuration::new();
        for p in parameters {
            let hist = self.histogram(p).clone();
            config.insert(p.name().to_owned(), hist.sample(&mut self.rng));
        }
        Ok(Some(config))
    }

    fn grow(&mut self, config: &Configuration, amount: f64) {
        for (name, value) in config {
            if let Some(hist) = self.histograms.get_mut(name) {
                hist.grow(value, amount);
            }
        }
    }
}
