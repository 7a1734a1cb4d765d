mod engine;
mod types;

pub use engine::{
    DecisionProfile, Rng, TrajectoryOutcome, modify_transitions, retirement_probability,
    run_comparative_analysis, run_simulation, simulate_trajectory,
};
pub use types::{
    ComparativeConfig, ComparativeResult, Deltas, DirectorProbability, Distributions, Meta,
    RetirementAge, RiskLevel, STATE_COUNT, SimulationConfig, SimulationError, SimulationMetrics,
    SimulationResult, Specialization, State, TransitionTable, UnemploymentYears,
};
