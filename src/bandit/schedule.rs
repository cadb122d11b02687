//! Hyperband bracket arithmetic.
//!
//! For maximum epochs `R` and reduction factor `eta`:
//!
//! - `s_max = floor(log_eta(R))`, computed exactly in integers
//! - `B = (s_max + 1) * R`
//! - bracket `s` (from `s_max` down to 0) starts `n = ceil(B / R / (s + 1) * eta^s)`
//!   configurations with `r = R * eta^-s` epochs
//! - rung `i` in `0..=s` keeps `n_i = floor(n * eta^-i)` trials and trains them
//!   for `r_i = round(r * eta^i)` epochs (ties to even)
//! - bracket `s` is labelled run `s_max - s + 1`

/// One rung of a bracket.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rung {
    /// Position within the bracket, 0 for the fresh rung.
    pub index: u32,
    /// Number of trials trained in this rung (`n_i`).
    pub trials: usize,
    /// Epochs each trial trains in this rung (`r_i`).
    pub epochs: u64,
}

/// One successive-halving bracket.
#[derive(Clone, Debug, PartialEq)]
pub struct Bracket {
    /// The bracket index `s`.
    pub s: u32,
    /// The run label written to the ledger.
    pub run: i64,
    /// Initial number of configurations.
    pub n: usize,
    /// Initial epochs per configuration.
    pub r: f64,
    /// The rungs, fresh rung first.
    pub rungs: Vec<Rung>,
}

/// The complete Hyperband schedule for one `(R, eta)` pair.
///
/// ```
/// use hpsweep::bandit::BanditSchedule;
///
/// let schedule = BanditSchedule::new(81, 3);
/// assert_eq!(schedule.s_max(), 4);
/// assert_eq!(schedule.budget(), 405);
/// let first = &schedule.brackets()[0];
/// assert_eq!((first.rungs[0].trials, first.rungs[0].epochs), (81, 1));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct BanditSchedule {
    max_epochs: u64,
    eta: u64,
    s_max: u32,
    brackets: Vec<Bracket>,
}

impl BanditSchedule {
    /// Computes the schedule.
    ///
    /// # Panics
    ///
    /// Panics if `max_epochs` is 0 or `eta` is less than 2.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_possible_wrap
    )]
    pub fn new(max_epochs: u64, eta: u64) -> Self {
        assert!(max_epochs > 0, "max_epochs must be > 0, got {max_epochs}");
        assert!(eta >= 2, "eta must be >= 2, got {eta}");

        let mut s_max = 0_u32;
        while eta
            .checked_pow(s_max + 1)
            .is_some_and(|p| p <= max_epochs)
        {
            s_max += 1;
        }

        let brackets = (0..=s_max)
            .rev()
            .map(|s| {
                let eta_s = eta.pow(s);
                let n = (u64::from(s_max + 1) * eta_s).div_ceil(u64::from(s + 1));
                let r = max_epochs as f64 / eta_s as f64;
                let rungs = (0..=s)
                    .map(|i| Rung {
                        index: i,
                        trials: (n / eta.pow(i)) as usize,
                        epochs: (r * eta.pow(i) as f64).round_ties_even() as u64,
                    })
                    .collect();
                Bracket {
                    s,
                    run: i64::from(s_max - s + 1),
                    n: n as usize,
                    r,
                    rungs,
                }
            })
            .collect();

        Self {
            max_epochs,
            eta,
            s_max,
            brackets,
        }
    }

    /// `R`, the most epochs any trial trains in one rung.
    #[must_use]
    pub fn max_epochs(&self) -> u64 {
        self.max_epochs
    }

    /// The reduction factor.
    #[must_use]
    pub fn eta(&self) -> u64 {
        self.eta
    }

    /// `floor(log_eta(R))`.
    #[must_use]
    pub fn s_max(&self) -> u32 {
        self.s_max
    }

    /// `B = (s_max + 1) * R`.
    #[must_use]
    pub fn budget(&self) -> u64 {
        u64::from(self.s_max + 1) * self.max_epochs
    }

    /// Brackets in execution order (`s = s_max` first).
    #[must_use]
    pub fn brackets(&self) -> &[Bracket] {
        &self.brackets
    }

    /// Epochs the whole schedule trains: `sum(n_i * r_i)` over every rung.
    #[must_use]
    pub fn total_epochs(&self) -> u64 {
        self.brackets
            .iter()
            .flat_map(|b| &b.rungs)
            .map(|r| r.trials as u64 * r.epochs)
            .sum()
    }
}
