use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_prometheus::PrometheusMetricLayer;
use clap::{Args, Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusHandle;
use rubric_scorer::config::AppConfig;
use rubric_scorer::error::AppError;
use rubric_scorer::scoring::{
    Rubric, ScoreReport, SimilarityProvider, TermVectorSimilarity, TranscriptScorer,
};
use rubric_scorer::telemetry;
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
struct AppState {
    readiness: Arc<AtomicBool>,
    metrics: PrometheusHandle,
    scorer: Arc<TranscriptScorer>,
}

#[derive(Parser, Debug)]
#[command(
    name = "Rubric Scorer",
    about = "Score free-text transcripts against a weighted rubric",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Score a single transcript and print the breakdown
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    port: Option<u16>,
}

#[derive(Args, Debug)]
struct ScoreArgs {
    /// Path to a transcript text file
    #[arg(long, conflicts_with = "text")]
    transcript: Option<PathBuf>,
    /// Inline transcript text
    #[arg(long)]
    text: Option<String>,
    /// Override the configured rubric CSV path
    #[arg(long)]
    rubric: Option<PathBuf>,
    /// Recording duration in seconds (reserved for pacing criteria)
    #[arg(long)]
    duration_sec: Option<f64>,
    /// Score with the neutral semantic fallback instead of the built-in provider
    #[arg(long)]
    no_semantic: bool,
}

#[derive(Debug, Deserialize)]
struct ScoreRequest {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    duration_sec: Option<f64>,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("application error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => run_server(args).await,
        Command::Score(args) => run_score(args),
    }
}

fn similarity_provider(enabled: bool) -> Option<Arc<dyn SimilarityProvider>> {
    enabled.then(|| Arc::new(TermVectorSimilarity) as Arc<dyn SimilarityProvider>)
}

async fn run_server(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    // An invalid catalog is fatal: the service never starts without one.
    let rubric = Rubric::from_path(&config.rubric.path)?;
    let scorer = Arc::new(TranscriptScorer::new(
        rubric,
        similarity_provider(config.rubric.semantic_scoring),
    ));

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let state = AppState {
        readiness: readiness_flag.clone(),
        metrics: prometheus_handle,
        scorer: scorer.clone(),
    };

    let app = Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/api/v1/score", post(score_endpoint))
        .layer(prometheus_layer)
        .with_state(state);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        criteria = scorer.rubric().len(),
        semantic = config.rubric.semantic_scoring,
        "rubric scorer ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let ScoreArgs {
        transcript,
        text,
        rubric,
        duration_sec,
        no_semantic,
    } = args;

    let config = AppConfig::load()?;
    let rubric_path = rubric.unwrap_or(config.rubric.path);

    let transcript = match (transcript, text) {
        (Some(path), _) => std::fs::read_to_string(path)?,
        (None, Some(text)) => text,
        (None, None) => return Err(AppError::EmptyTranscript),
    };
    if transcript.trim().is_empty() {
        return Err(AppError::EmptyTranscript);
    }

    let rubric = Rubric::from_path(rubric_path)?;
    let scorer = TranscriptScorer::new(
        rubric,
        similarity_provider(!no_semantic && config.rubric.semantic_scoring),
    );

    let report = scorer.score(&transcript, duration_sec);
    render_report(&report);

    Ok(())
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn readiness_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

async fn metrics_endpoint(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

async fn score_endpoint(
    State(state): State<AppState>,
    Json(payload): Json<ScoreRequest>,
) -> Result<Json<ScoreReport>, AppError> {
    let transcript = payload.transcript.unwrap_or_default();
    if transcript.trim().is_empty() {
        return Err(AppError::EmptyTranscript);
    }

    Ok(Json(state.scorer.score(&transcript, payload.duration_sec)))
}

fn render_report(report: &ScoreReport) {
    println!("Transcript score: {:.2}%", report.overall_score);
    println!("Word count: {}", report.word_count);

    println!("\nCriterion breakdown");
    for criterion in &report.criteria {
        println!(
            "- {} | {} | {:.2} | {}",
            criterion.criterion_name, criterion.metric, criterion.score, criterion.feedback
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::OnceLock;

    const TEST_RUBRIC: &str = "\
criterion_id,criteria,metric,weight,details,keywords,min_words,max_words
c1,Planning,Covers planning,1,discusses project budget and timeline,\"budget,timeline\",5,200
";

    // PrometheusMetricLayer::pair installs a global recorder, so build the
    // state once and share it across tests.
    fn test_state() -> AppState {
        static STATE: OnceLock<AppState> = OnceLock::new();
        STATE
            .get_or_init(|| {
                let rubric =
                    Rubric::from_reader(Cursor::new(TEST_RUBRIC)).expect("test rubric parses");
                let (_, handle) = PrometheusMetricLayer::pair();
                AppState {
                    readiness: Arc::new(AtomicBool::new(true)),
                    metrics: handle,
                    scorer: Arc::new(TranscriptScorer::new(rubric, None)),
                }
            })
            .clone()
    }

    #[tokio::test]
    async fn score_endpoint_returns_report() {
        let request = ScoreRequest {
            transcript: Some("We discussed the budget and the timeline in detail.".to_string()),
            duration_sec: None,
        };

        let Json(report) = score_endpoint(State(test_state()), Json(request))
            .await
            .expect("report builds");

        assert_eq!(report.overall_score, 80.0);
        assert_eq!(report.criteria.len(), 1);
        assert_eq!(report.criteria[0].feedback, "Length OK");
    }

    #[tokio::test]
    async fn score_endpoint_rejects_missing_transcript() {
        let request = ScoreRequest {
            transcript: None,
            duration_sec: Some(30.0),
        };

        let err = score_endpoint(State(test_state()), Json(request))
            .await
            .expect_err("missing transcript rejected");

        assert!(matches!(err, AppError::EmptyTranscript));
    }

    #[tokio::test]
    async fn router_maps_empty_transcript_to_bad_request() {
        use axum::body::{to_bytes, Body};
        use axum::http::Request;
        use tower::ServiceExt;

        let app = Router::new()
            .route("/api/v1/score", post(score_endpoint))
            .with_state(test_state());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/score")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"duration_sec": 12.5}"#))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("error is JSON");
        assert_eq!(payload["error"], "no transcript provided");

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/v1/score")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        r#"{"transcript": "We discussed the budget and the timeline in detail."}"#,
                    ))
                    .expect("request builds"),
            )
            .await
            .expect("router responds");

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn score_endpoint_rejects_blank_transcript() {
        let request = ScoreRequest {
            transcript: Some("   \n".to_string()),
            duration_sec: None,
        };

        let err = score_endpoint(State(test_state()), Json(request))
            .await
            .expect_err("blank transcript rejected");

        assert!(matches!(err, AppError::EmptyTranscript));
    }
}
