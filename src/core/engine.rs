use std::collections::BTreeMap;

use super::types::{
    ComparativeConfig, ComparativeResult, Deltas, DirectorProbability, Distributions, Meta,
    RetirementAge, RiskLevel, STATE_COUNT, SimulationConfig, SimulationError, SimulationMetrics,
    SimulationResult, Specialization, State, TransitionTable, UnemploymentYears,
};

const BURNOUT_DECAY: f64 = 0.5;
const MOMENTUM_DECAY: f64 = 0.9;
const PROMOTION_BONUS: f64 = 2.0;
const DEMOTION_PENALTY: f64 = 3.0;
const MIN_RETIREMENT_AGE: u32 = 55;

/// Per-individual decision record, owned by exactly one trajectory and
/// mutated once per simulated year.
#[derive(Debug, Clone)]
pub struct DecisionProfile {
    pub early_specialization: bool,
    pub risk_tolerance: RiskLevel,
    pub unemployment_history: Vec<u32>,
    pub burnout_score: f64,
    pub momentum_score: f64,
    pub total_promotions: u32,
    pub total_demotions: u32,
}

impl DecisionProfile {
    pub fn new(specialization: Specialization, risk_tolerance: RiskLevel) -> DecisionProfile {
        DecisionProfile {
            early_specialization: specialization == Specialization::Early,
            risk_tolerance,
            unemployment_history: Vec::new(),
            burnout_score: 0.0,
            momentum_score: 0.0,
            total_promotions: 0,
            total_demotions: 0,
        }
    }

    fn update_burnout(&mut self, state: State) {
        self.burnout_score += stress_increment(state);
        self.burnout_score = (self.burnout_score - BURNOUT_DECAY).max(0.0);
    }

    fn update_momentum(&mut self, old_state: State, new_state: State) {
        let old_rank = old_state.rank();
        let new_rank = new_state.rank();

        if new_rank > old_rank {
            self.momentum_score += PROMOTION_BONUS;
            self.total_promotions += 1;
        } else if new_rank < old_rank {
            self.momentum_score = (self.momentum_score - DEMOTION_PENALTY).max(0.0);
            self.total_demotions += 1;
        }

        self.momentum_score = (self.momentum_score * MOMENTUM_DECAY).max(0.0);
    }
}

fn stress_increment(state: State) -> f64 {
    match state {
        State::CSuite => 5.0,
        State::Vp => 4.0,
        State::Director => 3.0,
        State::Manager | State::Lead => 2.0,
        State::Senior => 1.0,
        State::Unemployed => -2.0,
        _ => 0.0,
    }
}

/// Applies the specialization and risk-tolerance boosts to a copy of the base
/// row, in that order, then renormalizes. A non-positive modified total is a
/// calibration defect, never recovered from.
pub fn modify_transitions(
    profile: &DecisionProfile,
    current: State,
    base: &[f64; STATE_COUNT],
) -> Result<[f64; STATE_COUNT], SimulationError> {
    let mut row = *base;

    if profile.early_specialization {
        match current {
            State::EntryLevel | State::Junior => {
                for target in [State::Junior, State::MidLevel, State::Senior] {
                    row[target.index()] *= 1.3;
                }
            }
            State::Senior | State::Lead => row[current.index()] *= 1.2,
            _ => {}
        }
    } else if matches!(current, State::Manager | State::Director | State::Vp) {
        for target in [State::Director, State::Vp, State::CSuite] {
            row[target.index()] *= 1.25;
        }
    }

    match profile.risk_tolerance {
        RiskLevel::High => match current {
            State::Unemployed => {
                row[State::MidLevel.index()] *= 1.5;
                row[State::Unemployed.index()] *= 0.75;
            }
            State::Senior | State::Lead | State::Manager => {
                for target in [State::Lead, State::Manager, State::Director] {
                    if target != current {
                        row[target.index()] *= 1.35;
                    }
                }
            }
            State::Director | State::Vp => {
                row[State::Vp.index()] *= 1.40;
                row[State::CSuite.index()] *= 1.40;
            }
            _ => {}
        },
        RiskLevel::Low => {
            if current == State::Unemployed {
                row[State::EntryLevel.index()] *= 1.3;
                row[State::Unemployed.index()] *= 1.05;
            }
            row[current.index()] *= 1.15;
        }
        RiskLevel::Medium => {}
    }

    let total: f64 = row.iter().sum();
    if total <= 0.0 {
        return Err(SimulationError::DegenerateRow(current));
    }
    for probability in row.iter_mut() {
        *probability /= total;
    }
    Ok(row)
}

/// Probability of a forced transition to Retired this year. Always 1 once
/// retired, always 0 below the age floor.
pub fn retirement_probability(profile: &DecisionProfile, state: State, age: u32) -> f64 {
    if state == State::Retired {
        return 1.0;
    }
    if age < MIN_RETIREMENT_AGE {
        return 0.0;
    }

    let mut probability = match age {
        a if a < 58 => 0.005,
        a if a < 62 => 0.03,
        a if a < 65 => 0.12,
        a if a < 68 => 0.30,
        _ => 0.60,
    };

    probability += (profile.burnout_score / 150.0).min(0.15);
    probability -= (profile.momentum_score / 80.0).min(0.10);

    if age > 60 && matches!(state, State::EntryLevel | State::Junior | State::MidLevel) {
        probability += 0.10;
    }
    if matches!(state, State::CSuite | State::Vp | State::Director) {
        probability -= 0.05;
    }
    if state == State::Unemployed && age > 58 {
        probability += 0.15;
    }

    probability.clamp(0.0, 1.0)
}

#[derive(Debug)]
pub struct TrajectoryOutcome {
    pub path: Vec<State>,
    pub profile: DecisionProfile,
}

/// Drives one full career from Entry Level to the horizon. The path includes
/// the initial state, so its length is `max_years + 1`.
pub fn simulate_trajectory(
    table: &TransitionTable,
    mut profile: DecisionProfile,
    max_years: u32,
    starting_age: u32,
    rng: &mut Rng,
) -> Result<TrajectoryOutcome, SimulationError> {
    let mut state = State::EntryLevel;
    let mut path = Vec::with_capacity(max_years as usize + 1);
    path.push(state);

    for year in 0..max_years {
        let age = starting_age + year + 1;

        if state == State::Retired {
            path.push(state);
            continue;
        }

        profile.update_burnout(state);

        if rng.next_f64() < retirement_probability(&profile, state, age) {
            state = State::Retired;
            path.push(state);
            continue;
        }

        let row = modify_transitions(&profile, state, table.row(state))?;
        let next = sample_categorical(&row, rng);
        profile.update_momentum(state, next);
        if next == State::Unemployed {
            profile.unemployment_history.push(year);
        }
        path.push(next);
        state = next;
    }

    Ok(TrajectoryOutcome { path, profile })
}

// Cumulative-distribution search; the row is already normalized. Rounding can
// leave a sliver past the last positive entry, which absorbs the draw.
fn sample_categorical(row: &[f64; STATE_COUNT], rng: &mut Rng) -> State {
    let draw = rng.next_f64();
    let mut cumulative = 0.0;
    let mut last_positive = State::EntryLevel;
    for (index, &probability) in row.iter().enumerate() {
        if probability <= 0.0 {
            continue;
        }
        cumulative += probability;
        last_positive = State::from_index(index);
        if draw < cumulative {
            return last_positive;
        }
    }
    last_positive
}

fn peak_state(path: &[State]) -> State {
    let mut peak = State::EntryLevel;
    let mut max_rank = 0;
    for &state in path {
        if state.rank() > max_rank {
            max_rank = state.rank();
            peak = state;
        }
    }
    peak
}

#[derive(Debug)]
struct BatchResult {
    peak_counts: [u32; STATE_COUNT],
    director_or_above: u32,
    retirement_ages: Vec<u32>,
    unemployment_durations: Vec<u32>,
    total: u32,
}

impl BatchResult {
    fn achievement_rate(&self) -> f64 {
        self.director_or_above as f64 / self.total as f64
    }
}

fn run_batch(
    table: &TransitionTable,
    config: &SimulationConfig,
    batch_id: u32,
) -> Result<BatchResult, SimulationError> {
    let director_rank = State::Director.rank();
    let mut result = BatchResult {
        peak_counts: [0; STATE_COUNT],
        director_or_above: 0,
        retirement_ages: Vec::new(),
        unemployment_durations: Vec::with_capacity(config.iterations as usize),
        total: 0,
    };

    for trajectory_id in 0..config.iterations {
        let mut rng = Rng::new(derive_seed(config.seed, batch_id, trajectory_id));
        let profile = DecisionProfile::new(config.specialization, config.risk_level);
        let outcome =
            simulate_trajectory(table, profile, config.max_years, config.starting_age, &mut rng)?;

        let peak = peak_state(&outcome.path);
        result.peak_counts[peak.index()] += 1;
        if peak.rank() >= director_rank {
            result.director_or_above += 1;
        }
        if let Some(index) = outcome.path.iter().position(|s| *s == State::Retired) {
            result.retirement_ages.push(config.starting_age + index as u32);
        }
        result
            .unemployment_durations
            .push(outcome.profile.unemployment_history.len() as u32);
        result.total += 1;
    }

    Ok(result)
}

// Resampling by rerun: each of the k interval batches is a fresh independent
// simulation over its own seed stream, not a resample of the primary batch.
fn bootstrap_achievement_rates(
    table: &TransitionTable,
    config: &SimulationConfig,
) -> Result<Vec<f64>, SimulationError> {
    let mut rates = Vec::with_capacity(config.ci_iterations as usize);
    for batch_id in 1..=config.ci_iterations {
        rates.push(run_batch(table, config, batch_id)?.achievement_rate());
    }
    Ok(rates)
}

pub fn run_simulation(
    table: &TransitionTable,
    config: &SimulationConfig,
) -> Result<SimulationResult, SimulationError> {
    config.validate()?;

    let primary = run_batch(table, config, 0)?;
    tracing::debug!(
        iterations = config.iterations,
        achievement_rate = primary.achievement_rate(),
        "primary batch complete"
    );

    let mut director_probability = DirectorProbability {
        mean: round_to(primary.achievement_rate(), 4),
        ci_lower: None,
        ci_upper: None,
    };
    if config.compute_ci {
        let mut rates = bootstrap_achievement_rates(table, config)?;
        director_probability.ci_lower = Some(round_to(percentile(&mut rates, 2.5), 4));
        director_probability.ci_upper = Some(round_to(percentile(&mut rates, 97.5), 4));
    }

    let ages: Vec<f64> = primary.retirement_ages.iter().map(|a| *a as f64).collect();
    let retirement_age = RetirementAge {
        mean: mean(&ages).map(|m| round_to(m, 2)),
        std: std_pop(&ages).map(|s| round_to(s, 2)),
    };

    let mut durations: Vec<f64> = primary
        .unemployment_durations
        .iter()
        .map(|d| *d as f64)
        .collect();
    let unemployment_years = UnemploymentYears {
        mean: mean(&durations).map(|m| round_to(m, 2)).unwrap_or(0.0),
        median: if durations.is_empty() {
            None
        } else {
            Some(round_to(percentile(&mut durations, 50.0), 2))
        },
        std: std_pop(&durations).map(|s| round_to(s, 2)),
    };

    let mut peak_role = BTreeMap::new();
    for state in State::ALL {
        let count = primary.peak_counts[state.index()];
        if count > 0 {
            peak_role.insert(
                state.label().to_string(),
                round_to(count as f64 / primary.total as f64, 4),
            );
        }
    }

    Ok(SimulationResult {
        metrics: SimulationMetrics {
            director_probability,
            retirement_age,
            unemployment_years,
        },
        distributions: Distributions { peak_role },
        meta: Meta {
            total_simulations: config.iterations,
            config: config.clone(),
        },
    })
}

/// Runs the three fixed intervention arms through the same pipeline and
/// reports achievement-rate deltas against the control arm.
pub fn run_comparative_analysis(
    table: &TransitionTable,
    config: &ComparativeConfig,
) -> Result<ComparativeResult, SimulationError> {
    let arm = |arm_id: u64, specialization: Specialization, risk_level: RiskLevel| {
        SimulationConfig {
            specialization,
            risk_level,
            iterations: config.iterations,
            compute_ci: config.compute_ci,
            ci_iterations: config.ci_iterations,
            seed: splitmix64(config.seed ^ arm_id),
            ..SimulationConfig::default()
        }
    };

    let control = run_simulation(table, &arm(1, Specialization::None, RiskLevel::Medium))?;
    let specialist = run_simulation(table, &arm(2, Specialization::Early, RiskLevel::Medium))?;
    let risktaker = run_simulation(table, &arm(3, Specialization::None, RiskLevel::High))?;
    tracing::debug!(
        control = control.metrics.director_probability.mean,
        specialist = specialist.metrics.director_probability.mean,
        risktaker = risktaker.metrics.director_probability.mean,
        "comparative arms complete"
    );

    let control_mean = control.metrics.director_probability.mean;
    let deltas = Deltas {
        specialist_vs_control: round_to(
            specialist.metrics.director_probability.mean - control_mean,
            4,
        ),
        risktaker_vs_control: round_to(
            risktaker.metrics.director_probability.mean - control_mean,
            4,
        ),
    };

    Ok(ComparativeResult {
        control,
        specialist,
        risktaker,
        deltas,
    })
}

// Gives every trajectory an independent, reproducible stream: batches inside
// one run and arms inside a comparative study never share RNG state.
fn derive_seed(base_seed: u64, batch_id: u32, trajectory_id: u32) -> u64 {
    let mixed = base_seed ^ ((batch_id as u64) << 32) ^ trajectory_id as u64;
    splitmix64(mixed)
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = x;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

pub struct Rng {
    state: u64,
}

impl Rng {
    pub fn new(seed: u64) -> Rng {
        let state = if seed == 0 {
            0xA5A5_A5A5_A5A5_A5A5
        } else {
            seed
        };
        Rng { state }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    fn next_f64(&mut self) -> f64 {
        const DENOM: f64 = (1_u64 << 53) as f64;
        let v = self.next_u64() >> 11;
        ((v as f64) + 0.5) / DENOM
    }
}

fn percentile(values: &mut [f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    values.sort_by(|a, b| a.total_cmp(b));

    let n = values.len();
    if n == 1 {
        return values[0];
    }

    let rank = (p / 100.0) * (n as f64 - 1.0);
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;

    if lower == upper {
        values[lower]
    } else {
        let w = rank - lower as f64;
        values[lower] * (1.0 - w) + values[upper] * w
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

fn std_pop(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    Some(variance.sqrt())
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
