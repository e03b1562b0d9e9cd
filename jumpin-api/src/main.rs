//! JumpIN' Web API
//!
//! Serves a single play session over JSON: clicks, move queries, hints,
//! undo/redo and level progression.

mod session;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use jumpin_core::{
    default_levels, load_dir, Board, GoalSpec, LayoutError, LevelError, Move, PlacedPiece, SIZE,
};
use jumpin_solver::{ConfigError, SearchOutcome, Solver, SolverConfig};

use crate::session::{ClickValidity, GameController, SessionError, DEFAULT_HISTORY_LIMIT};

// =============================================================================
// Application State
// =============================================================================

/// Shared application state
struct AppStateInner {
    session: Mutex<GameController>,
    /// Cancellation flag of the hint search in flight, if any
    hint: Mutex<Option<Arc<AtomicBool>>>,
}

type AppState = Arc<AppStateInner>;

type ApiError = (StatusCode, Json<ErrorModel>);

/// Everything a hint search owns: board and goal snapshot, settings, cancellation flag.
type HintJob = (Board, GoalSpec, SolverConfig, Arc<AtomicBool>);

fn bad_request(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorModel {
            detail: detail.into(),
        }),
    )
}

fn internal(detail: impl Into<String>) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorModel {
            detail: detail.into(),
        }),
    )
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, ApiError> {
    mutex.lock().map_err(|_| {
        error!("state lock poisoned");
        internal("Session state is unavailable")
    })
}

impl AppStateInner {
    /// Stop the outstanding hint search; its answer would be stale.
    fn cancel_hint(&self) -> Result<(), ApiError> {
        if let Some(flag) = lock(&self.hint)?.take() {
            flag.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    /// Snapshot the session for a hint search and register its cancellation
    /// flag, superseding any search in flight.
    ///
    /// The session lock is held until the flag is registered, so a move
    /// cannot land between the snapshot and the registration.
    fn begin_hint(&self) -> Result<HintJob, ApiError> {
        let session = lock(&self.session)?;
        let (board, goal, config) = session.hint_snapshot();
        let running = Arc::new(AtomicBool::new(true));
        if let Some(previous) = lock(&self.hint)?.replace(running.clone()) {
            previous.store(false, Ordering::SeqCst);
        }
        drop(session);
        Ok((board, goal, config, running))
    }
}

// =============================================================================
// JSON Models
// =============================================================================

#[derive(Serialize)]
struct GameStateModel {
    level: usize,
    level_name: String,
    level_count: usize,
    pieces: Vec<PlacedPiece>,
    /// Text notation of the board, one row per line
    text: String,
    pending: Option<(u8, u8)>,
    solved: bool,
    can_undo: bool,
    can_redo: bool,
}

#[derive(Deserialize)]
struct ClickRequest {
    x: u8,
    y: u8,
}

#[derive(Serialize)]
struct ClickModel {
    result: ClickValidity,
    game: GameStateModel,
}

#[derive(Serialize)]
struct HintModel {
    hint: Option<Move>,
    outcome: String,
}

#[derive(Serialize)]
struct LevelsModel {
    current: usize,
    names: Vec<String>,
}

#[derive(Serialize)]
struct HealthModel {
    status: String,
}

#[derive(Debug, Serialize)]
struct ErrorModel {
    detail: String,
}

fn session_to_model(session: &GameController) -> GameStateModel {
    let board = session.board();
    GameStateModel {
        level: session.current_level(),
        level_name: board.name().to_string(),
        level_count: session.level_count(),
        pieces: board
            .pieces()
            .map(|(x, y, piece)| PlacedPiece { x, y, piece })
            .collect(),
        text: board.to_string(),
        pending: session.pending(),
        solved: session.is_solved(),
        can_undo: session.can_undo(),
        can_redo: session.can_redo(),
    }
}

// =============================================================================
// API Endpoints
// =============================================================================

async fn get_game(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let session = lock(&state.session)?;
    Ok(Json(session_to_model(&session)))
}

async fn click(
    State(state): State<AppState>,
    payload: Result<Json<ClickRequest>, JsonRejection>,
) -> Result<Json<ClickModel>, ApiError> {
    let Json(req) = payload.map_err(|e| bad_request(e.body_text()))?;
    let mut session = lock(&state.session)?;
    let result = session.register_click(req.x, req.y);
    if result == ClickValidity::ValidMovemade {
        state.cancel_hint()?;
    }
    Ok(Json(ClickModel {
        result,
        game: session_to_model(&session),
    }))
}

async fn clear(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    session.clear_pending_position();
    Ok(Json(session_to_model(&session)))
}

async fn get_moves(
    State(state): State<AppState>,
    path: Result<Path<(u8, u8)>, PathRejection>,
) -> Result<Json<Vec<Move>>, ApiError> {
    let Path((x, y)) = path.map_err(|e| bad_request(e.body_text()))?;
    if x as usize >= SIZE || y as usize >= SIZE {
        return Err(bad_request("Position out of range"));
    }
    let session = lock(&state.session)?;
    Ok(Json(session.possible_moves(x, y)))
}

async fn get_hint(State(state): State<AppState>) -> Result<Json<HintModel>, ApiError> {
    let (board, goal, config, running) = state.begin_hint()?;

    let (hint, outcome) = tokio::task::spawn_blocking(move || {
        let mut solver = Solver::with_config(config);
        let hint = solver.next_best_move(&board, &goal, &running);
        (hint, solver.stats.outcome)
    })
    .await
    .map_err(|e| {
        error!(error = %e, "hint search failed");
        internal("Hint search failed")
    })?;

    if outcome == SearchOutcome::StateLimit {
        warn!("hint search hit the state limit");
    }
    Ok(Json(HintModel {
        hint,
        outcome: outcome.to_string(),
    }))
}

async fn undo(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    if !session.undo_move() {
        return Err(bad_request("Nothing to undo"));
    }
    state.cancel_hint()?;
    Ok(Json(session_to_model(&session)))
}

async fn redo(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    if !session.redo_move() {
        return Err(bad_request("Nothing to redo"));
    }
    state.cancel_hint()?;
    Ok(Json(session_to_model(&session)))
}

async fn reset(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    session.reset();
    state.cancel_hint()?;
    Ok(Json(session_to_model(&session)))
}

async fn next_level(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    if !session.increment_level() {
        return Err(bad_request("No more levels"));
    }
    state.cancel_hint()?;
    Ok(Json(session_to_model(&session)))
}

async fn first_level(State(state): State<AppState>) -> Result<Json<GameStateModel>, ApiError> {
    let mut session = lock(&state.session)?;
    session.set_to_first_level();
    state.cancel_hint()?;
    Ok(Json(session_to_model(&session)))
}

async fn get_levels(State(state): State<AppState>) -> Result<Json<LevelsModel>, ApiError> {
    let session = lock(&state.session)?;
    Ok(Json(LevelsModel {
        current: session.current_level(),
        names: session.level_names(),
    }))
}

async fn health() -> Json<HealthModel> {
    Json(HealthModel {
        status: "ok".to_string(),
    })
}

// =============================================================================
// Main
// =============================================================================

#[derive(Parser)]
#[command(about = "Serve a JumpIN' play session over HTTP")]
struct Args {
    /// Address to listen on.
    #[arg(long, default_value = "0.0.0.0:8000")]
    bind: SocketAddr,

    /// Directory of `*.json` level files. Defaults to the built-in pack.
    #[arg(long)]
    levels: Option<PathBuf>,

    /// Solver settings (TOML) used for hints.
    #[arg(long)]
    solver_config: Option<PathBuf>,

    /// Moves kept for undo and redo.
    #[arg(long, default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,
}

#[derive(Debug, Error)]
enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Level(#[from] LevelError),

    #[error("built-in levels are invalid: {0}")]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

fn build_session(args: &Args) -> Result<GameController, ServerError> {
    let levels = match &args.levels {
        Some(dir) => load_dir(dir)?,
        None => default_levels()?,
    };
    let config = match &args.solver_config {
        Some(path) => SolverConfig::load(path)?,
        None => SolverConfig::default(),
    };
    info!(levels = levels.len(), "levels loaded");
    Ok(GameController::new(levels)?
        .with_history_limit(args.history_limit)
        .with_solver_config(config))
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let state: AppState = Arc::new(AppStateInner {
        session: Mutex::new(build_session(&args)?),
        hint: Mutex::new(None),
    });

    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("JumpIN' API running on http://{}", args.bind);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/game", get(get_game))
        .route("/click", post(click))
        .route("/clear", post(clear))
        .route("/moves/{x}/{y}", get(get_moves))
        .route("/hint", get(get_hint))
        .route("/undo", post(undo))
        .route("/redo", post(redo))
        .route("/reset", post(reset))
        .route("/next-level", post(next_level))
        .route("/first-level", post(first_level))
        .route("/levels", get(get_levels))
        .route("/health", get(health))
        .layer(cors)
        .with_state(state)
}
