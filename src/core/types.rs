use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const STATE_COUNT: usize = 11;

/// One discrete career stage. `Unemployed` and `Retired` both rank 0;
/// `Retired` is the only absorbing state.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum State {
    EntryLevel,
    Junior,
    MidLevel,
    Senior,
    Lead,
    Manager,
    Director,
    Vp,
    CSuite,
    Unemployed,
    Retired,
}

impl State {
    pub const ALL: [State; STATE_COUNT] = [
        State::EntryLevel,
        State::Junior,
        State::MidLevel,
        State::Senior,
        State::Lead,
        State::Manager,
        State::Director,
        State::Vp,
        State::CSuite,
        State::Unemployed,
        State::Retired,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> State {
        State::ALL[index]
    }

    /// Ordinal used to classify a transition as promotion, demotion, or lateral.
    pub fn rank(self) -> u32 {
        match self {
            State::EntryLevel => 1,
            State::Junior => 2,
            State::MidLevel => 3,
            State::Senior => 4,
            State::Lead => 5,
            State::Manager => 6,
            State::Director => 7,
            State::Vp => 8,
            State::CSuite => 9,
            State::Unemployed | State::Retired => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            State::EntryLevel => "Entry Level",
            State::Junior => "Junior",
            State::MidLevel => "Mid-Level",
            State::Senior => "Senior",
            State::Lead => "Lead",
            State::Manager => "Manager",
            State::Director => "Director",
            State::Vp => "VP",
            State::CSuite => "C-Suite",
            State::Unemployed => "Unemployed",
            State::Retired => "Retired",
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Specialization {
    Early,
    None,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("iterations must be > 0")]
    InvalidIterations,
    #[error("max_years must be > 0")]
    InvalidMaxYears,
    #[error("ci_iterations must be > 0 when compute_ci is set")]
    InvalidCiIterations,
    #[error("transition row for {} does not sum to 1", .0.label())]
    MalformedRow(State),
    #[error("transition row for {} contains a negative probability", .0.label())]
    NegativeProbability(State),
    #[error("Retired must transition only to itself")]
    NonAbsorbingRetired,
    #[error("modified transition row for {} has a non-positive total", .0.label())]
    DegenerateRow(State),
}

/// Base per-state transition rows. Immutable calibration data shared by
/// reference across every trajectory of a run.
#[derive(Clone, Debug)]
pub struct TransitionTable {
    rows: [[f64; STATE_COUNT]; STATE_COUNT],
}

impl TransitionTable {
    pub fn new(rows: [[f64; STATE_COUNT]; STATE_COUNT]) -> Result<TransitionTable, SimulationError> {
        for state in State::ALL {
            let row = &rows[state.index()];
            if row.iter().any(|p| *p < 0.0) {
                return Err(SimulationError::NegativeProbability(state));
            }
            let total: f64 = row.iter().sum();
            if (total - 1.0).abs() > 1e-9 {
                return Err(SimulationError::MalformedRow(state));
            }
        }
        if rows[State::Retired.index()][State::Retired.index()] != 1.0 {
            return Err(SimulationError::NonAbsorbingRetired);
        }
        Ok(TransitionTable { rows })
    }

    /// The calibrated base table: every row sums to 1, Retired is absorbing,
    /// and Unemployed re-enters the ladder through the junior bands.
    pub fn calibrated() -> TransitionTable {
        let mut rows = [[0.0; STATE_COUNT]; STATE_COUNT];
        let entries: [(State, &[(State, f64)]); STATE_COUNT] = [
            (
                State::EntryLevel,
                &[
                    (State::EntryLevel, 0.45),
                    (State::Junior, 0.30),
                    (State::MidLevel, 0.05),
                    (State::Unemployed, 0.20),
                ],
            ),
            (
                State::Junior,
                &[
                    (State::Junior, 0.40),
                    (State::MidLevel, 0.30),
                    (State::Senior, 0.05),
                    (State::EntryLevel, 0.10),
                    (State::Unemployed, 0.15),
                ],
            ),
            (
                State::MidLevel,
                &[
                    (State::MidLevel, 0.50),
                    (State::Senior, 0.20),
                    (State::Lead, 0.05),
                    (State::Junior, 0.10),
                    (State::Unemployed, 0.15),
                ],
            ),
            (
                State::Senior,
                &[
                    (State::Senior, 0.55),
                    (State::Lead, 0.15),
                    (State::Manager, 0.10),
                    (State::MidLevel, 0.10),
                    (State::Unemployed, 0.10),
                ],
            ),
            (
                State::Lead,
                &[
                    (State::Lead, 0.50),
                    (State::Manager, 0.20),
                    (State::Director, 0.05),
                    (State::Senior, 0.15),
                    (State::Unemployed, 0.10),
                ],
            ),
            (
                State::Manager,
                &[
                    (State::Manager, 0.55),
                    (State::Director, 0.15),
                    (State::Lead, 0.15),
                    (State::Senior, 0.05),
                    (State::Unemployed, 0.10),
                ],
            ),
            (
                State::Director,
                &[
                    (State::Director, 0.60),
                    (State::Vp, 0.10),
                    (State::Manager, 0.15),
                    (State::Unemployed, 0.15),
                ],
            ),
            (
                State::Vp,
                &[
                    (State::Vp, 0.65),
                    (State::CSuite, 0.08),
                    (State::Director, 0.15),
                    (State::Unemployed, 0.12),
                ],
            ),
            (
                State::CSuite,
                &[
                    (State::CSuite, 0.70),
                    (State::Vp, 0.10),
                    (State::Unemployed, 0.10),
                    (State::Retired, 0.10),
                ],
            ),
            (
                State::Unemployed,
                &[
                    (State::Unemployed, 0.40),
                    (State::EntryLevel, 0.30),
                    (State::Junior, 0.18),
                    (State::MidLevel, 0.10),
                    (State::Retired, 0.02),
                ],
            ),
            (State::Retired, &[(State::Retired, 1.0)]),
        ];

        for (from, row) in entries {
            for (to, probability) in row {
                rows[from.index()][to.index()] = *probability;
            }
        }

        TransitionTable { rows }
    }

    pub fn row(&self, state: State) -> &[f64; STATE_COUNT] {
        &self.rows[state.index()]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub specialization: Specialization,
    pub risk_level: RiskLevel,
    pub iterations: u32,
    pub max_years: u32,
    pub starting_age: u32,
    pub compute_ci: bool,
    pub ci_iterations: u32,
    pub seed: u64,
}

impl Default for SimulationConfig {
    fn default() -> SimulationConfig {
        SimulationConfig {
            specialization: Specialization::None,
            risk_level: RiskLevel::Medium,
            iterations: 2500,
            max_years: 45,
            starting_age: 22,
            compute_ci: false,
            ci_iterations: 30,
            seed: 42,
        }
    }
}

impl SimulationConfig {
    pub fn validate(&self) -> Result<(), SimulationError> {
        if self.iterations == 0 {
            return Err(SimulationError::InvalidIterations);
        }
        if self.max_years == 0 {
            return Err(SimulationError::InvalidMaxYears);
        }
        if self.compute_ci && self.ci_iterations == 0 {
            return Err(SimulationError::InvalidCiIterations);
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparativeConfig {
    pub iterations: u32,
    pub compute_ci: bool,
    pub ci_iterations: u32,
    pub seed: u64,
}

impl Default for ComparativeConfig {
    fn default() -> ComparativeConfig {
        ComparativeConfig {
            iterations: 2500,
            compute_ci: false,
            ci_iterations: 30,
            seed: 42,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DirectorProbability {
    pub mean: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_lower: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_upper: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetirementAge {
    pub mean: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UnemploymentYears {
    pub mean: f64,
    pub median: Option<f64>,
    pub std: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationMetrics {
    pub director_probability: DirectorProbability,
    pub retirement_age: RetirementAge,
    pub unemployment_years: UnemploymentYears,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Distributions {
    pub peak_role: BTreeMap<String, f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Meta {
    pub total_simulations: u32,
    pub config: SimulationConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimulationResult {
    pub metrics: SimulationMetrics,
    pub distributions: Distributions,
    pub meta: Meta,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Deltas {
    pub specialist_vs_control: f64,
    pub risktaker_vs_control: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparativeResult {
    pub control: SimulationResult,
    pub specialist: SimulationResult,
    pub risktaker: SimulationResult,
    pub deltas: Deltas,
}
