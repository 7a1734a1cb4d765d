use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use pathdiverge::core::{
    ComparativeConfig, RiskLevel, SimulationConfig, Specialization, TransitionTable,
    run_comparative_analysis, run_simulation,
};

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliSpecialization {
    Early,
    None,
}

impl From<CliSpecialization> for Specialization {
    fn from(value: CliSpecialization) -> Self {
        match value {
            CliSpecialization::Early => Specialization::Early,
            CliSpecialization::None => Specialization::None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliRiskLevel {
    Low,
    Medium,
    High,
}

impl From<CliRiskLevel> for RiskLevel {
    fn from(value: CliRiskLevel) -> Self {
        match value {
            CliRiskLevel::Low => RiskLevel::Low,
            CliRiskLevel::Medium => RiskLevel::Medium,
            CliRiskLevel::High => RiskLevel::High,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pathdiverge",
    about = "Monte Carlo career trajectory simulator (decision-modified Markov chains)"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the simulation engine over HTTP.
    Serve {
        #[arg(long, default_value_t = 8080)]
        port: u16,
    },
    /// Run one simulation and print the result as JSON.
    Simulate {
        #[arg(long, value_enum, default_value_t = CliSpecialization::None)]
        specialization: CliSpecialization,
        #[arg(long, value_enum, default_value_t = CliRiskLevel::Medium)]
        risk_level: CliRiskLevel,
        #[arg(long, default_value_t = 2500)]
        iterations: u32,
        #[arg(long, default_value_t = 45)]
        max_years: u32,
        #[arg(long, default_value_t = 22)]
        starting_age: u32,
        #[arg(long, help = "Report a bootstrap 95% interval on the achievement rate")]
        compute_ci: bool,
        #[arg(long, default_value_t = 30)]
        ci_iterations: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Run the control/specialist/risktaker comparison and print JSON.
    Compare {
        #[arg(long, default_value_t = 2500)]
        iterations: u32,
        #[arg(long)]
        compute_ci: bool,
        #[arg(long, default_value_t = 30)]
        ci_iterations: u32,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let table = TransitionTable::calibrated();

    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = pathdiverge::api::run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Simulate {
            specialization,
            risk_level,
            iterations,
            max_years,
            starting_age,
            compute_ci,
            ci_iterations,
            seed,
        } => {
            let config = SimulationConfig {
                specialization: specialization.into(),
                risk_level: risk_level.into(),
                iterations,
                max_years,
                starting_age,
                compute_ci,
                ci_iterations,
                seed,
            };
            match run_simulation(&table, &config) {
                Ok(result) => print_json(&result),
                Err(e) => fail(&e.to_string()),
            }
        }
        Command::Compare {
            iterations,
            compute_ci,
            ci_iterations,
            seed,
        } => {
            let config = ComparativeConfig {
                iterations,
                compute_ci,
                ci_iterations,
                seed,
            };
            match run_comparative_analysis(&table, &config) {
                Ok(result) => print_json(&result),
                Err(e) => fail(&e.to_string()),
            }
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(e) => fail(&e.to_string()),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {message}");
    std::process::exit(1);
}
