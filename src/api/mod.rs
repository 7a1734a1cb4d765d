use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::{Json, State as AxumState},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::core::{
    ComparativeConfig, SimulationConfig, TransitionTable, run_comparative_analysis, run_simulation,
};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let table = Arc::new(TransitionTable::calibrated());

    // CORS stays permissive: the API is consumed by a browser frontend on a
    // different origin.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/simulate", post(simulate_handler))
        .route("/comparative", post(comparative_handler))
        .fallback(not_found_handler)
        .layer(cors)
        .with_state(table);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!("PathDiverge API listening on http://{addr}");

    axum::serve(listener, app).await
}

async fn root_handler() -> impl IntoResponse {
    Json(json!({
        "status": "online",
        "service": "PathDiverge Career Simulator",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn health_handler() -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "simulator": "loaded",
        "endpoints": ["/", "/simulate", "/comparative", "/health"],
    }))
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn simulate_handler(
    AxumState(table): AxumState<Arc<TransitionTable>>,
    Json(config): Json<SimulationConfig>,
) -> Response {
    info!(
        iterations = config.iterations,
        compute_ci = config.compute_ci,
        "simulate request"
    );
    match run_simulation(&table, &config) {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

async fn comparative_handler(
    AxumState(table): AxumState<Arc<TransitionTable>>,
    Json(config): Json<ComparativeConfig>,
) -> Response {
    info!(iterations = config.iterations, "comparative request");
    match run_comparative_analysis(&table, &config) {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use crate::core::{RiskLevel, SimulationConfig, Specialization, TransitionTable, run_simulation};

    #[test]
    fn empty_payload_uses_documented_defaults() {
        let config: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.specialization, Specialization::None);
        assert_eq!(config.risk_level, RiskLevel::Medium);
        assert_eq!(config.iterations, 2500);
        assert_eq!(config.max_years, 45);
        assert_eq!(config.starting_age, 22);
        assert!(!config.compute_ci);
        assert_eq!(config.ci_iterations, 30);
    }

    #[test]
    fn unknown_enum_values_are_rejected_at_the_boundary() {
        assert!(serde_json::from_str::<SimulationConfig>(r#"{"risk_level":"reckless"}"#).is_err());
        assert!(serde_json::from_str::<SimulationConfig>(r#"{"specialization":"late"}"#).is_err());
    }

    #[test]
    fn payload_overrides_are_applied() {
        let config: SimulationConfig = serde_json::from_str(
            r#"{"specialization":"early","risk_level":"high","iterations":100,"compute_ci":true}"#,
        )
        .unwrap();
        assert_eq!(config.specialization, Specialization::Early);
        assert_eq!(config.risk_level, RiskLevel::High);
        assert_eq!(config.iterations, 100);
        assert!(config.compute_ci);
    }

    #[test]
    fn result_wire_shape_matches_contract() {
        let table = TransitionTable::calibrated();
        let config = SimulationConfig {
            iterations: 100,
            seed: 9,
            ..SimulationConfig::default()
        };
        let result = run_simulation(&table, &config).unwrap();
        let value = serde_json::to_value(&result).unwrap();

        assert!(value["metrics"]["director_probability"]["mean"].is_number());
        // CI bounds are absent, not null, when not requested.
        assert!(
            value["metrics"]["director_probability"]
                .get("ci_lower")
                .is_none()
        );
        assert!(value["distributions"]["peak_role"].is_object());
        assert_eq!(value["meta"]["total_simulations"], 100);
        assert_eq!(value["meta"]["config"]["risk_level"], "medium");
    }

    #[test]
    fn empty_sample_serializes_as_null() {
        // Insufficient data is null on the wire, never zero.
        let value = serde_json::to_value(crate::core::RetirementAge {
            mean: None,
            std: None,
        })
        .unwrap();
        assert!(value["mean"].is_null());
        assert!(value["std"].is_null());
    }
}
