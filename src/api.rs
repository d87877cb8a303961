// API module for headless mode - HTTP endpoints to drive and inspect the particle field

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::FieldConfig;
use crate::driver::FrameLoop;
use crate::field::{FieldStats, ParticleField};
use crate::particle::Particle;
use crate::surface::{DrawCommand, RecordingSurface};
use crate::types::Bounds;
use ::rand::rngs::StdRng;

/// Virtual frame length used by the headless clock.
pub const FRAME_MS: f64 = 1000.0 / 60.0;
/// Upper bound for a single `/step` request, one minute of virtual time.
const MAX_STEPS: usize = 3_600;

// Everything one frame touches, behind a single lock so frames never overlap
pub struct Headless {
    pub field: ParticleField,
    pub frame_loop: FrameLoop,
    pub surface: RecordingSurface,
    pub rng: StdRng,
    pub clock_ms: f64,
}

impl Headless {
    pub fn new(field: ParticleField, rng: StdRng) -> Self {
        let mut headless = Self {
            field,
            frame_loop: FrameLoop::new(),
            surface: RecordingSurface::new(),
            rng,
            clock_ms: 0.0,
        };
        headless.restart();
        headless
    }

    pub fn restart(&mut self) {
        self.surface.clear();
        self.frame_loop
            .start(&mut self.field, &mut self.rng, &mut self.surface);
    }

    /// Advance the virtual clock by one frame and run it. The recorded commands
    /// afterwards are exactly the ones drawn by this frame.
    pub fn step(&mut self) {
        self.surface.clear();
        self.frame_loop
            .tick(&mut self.field, self.clock_ms, &mut self.surface, &mut self.rng);
        self.clock_ms += FRAME_MS;
    }
}

#[derive(Clone)]
pub struct ApiState {
    pub headless: Arc<Mutex<Headless>>,
}

impl ApiState {
    pub fn new(headless: Headless) -> Self {
        Self {
            headless: Arc::new(Mutex::new(headless)),
        }
    }
}

#[derive(Serialize)]
pub struct FieldStateResponse {
    pub width: f32,
    pub height: f32,
    pub running: bool,
    pub fading: bool,
    pub frames_run: u64,
    pub stats: FieldStats,
    pub particles: Vec<Particle>,
}

#[derive(Serialize)]
pub struct FrameResponse {
    pub frame: u64,
    pub surface_opacity: f32,
    pub lines: usize,
    pub commands: Vec<DrawCommand>,
}

#[derive(Deserialize)]
pub struct StepQuery {
    pub steps: Option<usize>,
}

#[derive(Deserialize)]
pub struct ResizeQuery {
    pub width: f32,
    pub height: f32,
}

fn state_response(h: &Headless) -> FieldStateResponse {
    FieldStateResponse {
        width: h.field.bounds.width,
        height: h.field.bounds.height,
        running: h.frame_loop.is_running(),
        fading: h.field.is_fading(),
        frames_run: h.frame_loop.frames_run(),
        stats: h.field.stats(),
        particles: h.field.particles.clone(),
    }
}

fn lock(api_state: &ApiState) -> Result<std::sync::MutexGuard<'_, Headless>, StatusCode> {
    api_state
        .headless
        .lock()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

// GET /state - Particles and statistics
async fn get_state(
    State(api_state): State<ApiState>,
) -> Result<Json<FieldStateResponse>, StatusCode> {
    let h = lock(&api_state)?;
    Ok(Json(state_response(&h)))
}

// GET /stats - Statistics only
async fn get_stats(State(api_state): State<ApiState>) -> Result<Json<FieldStats>, StatusCode> {
    let h = lock(&api_state)?;
    Ok(Json(h.field.stats()))
}

// GET /frame - Draw commands of the last frame
async fn get_frame(State(api_state): State<ApiState>) -> Result<Json<FrameResponse>, StatusCode> {
    let h = lock(&api_state)?;
    Ok(Json(FrameResponse {
        frame: h.field.frames(),
        surface_opacity: h.surface.opacity,
        lines: h.surface.line_count(),
        commands: h.surface.commands.clone(),
    }))
}

// GET /config - Active configuration
async fn get_config(State(api_state): State<ApiState>) -> Result<Json<FieldConfig>, StatusCode> {
    let h = lock(&api_state)?;
    Ok(Json(h.field.config.clone()))
}

// POST /restart - Start the animation over with a fresh pool
async fn restart(
    State(api_state): State<ApiState>,
) -> Result<Json<FieldStateResponse>, StatusCode> {
    let mut h = lock(&api_state)?;
    h.restart();
    info!("restart requested over HTTP");
    Ok(Json(state_response(&h)))
}

// POST /step?steps=N - Advance N virtual frames
async fn step(
    Query(params): Query<StepQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<FieldStateResponse>, StatusCode> {
    let steps = params.steps.unwrap_or(1);
    if steps > MAX_STEPS {
        return Err(StatusCode::BAD_REQUEST);
    }
    // Long runs are CPU bound; keep them off the async workers
    let headless = api_state.headless.clone();
    let response = tokio::task::spawn_blocking(move || {
        let mut h = headless
            .lock()
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
        for _ in 0..steps {
            h.step();
        }
        Ok::<_, StatusCode>(state_response(&h))
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "step task failed");
        StatusCode::INTERNAL_SERVER_ERROR
    })??;
    Ok(Json(response))
}

// POST /resize?width=W&height=H - Resize the virtual surface
async fn resize(
    Query(params): Query<ResizeQuery>,
    State(api_state): State<ApiState>,
) -> Result<Json<FieldStats>, StatusCode> {
    let bounds = Bounds::new(params.width, params.height).map_err(|e| {
        warn!(error = %e, "rejected resize");
        StatusCode::BAD_REQUEST
    })?;
    let mut h = lock(&api_state)?;
    h.field.resize(bounds);
    Ok(Json(h.field.stats()))
}

pub fn create_router(api_state: ApiState) -> Router {
    Router::new()
        .route("/state", get(get_state))
        .route("/stats", get(get_stats))
        .route("/frame", get(get_frame))
        .route("/config", get(get_config))
        .route("/restart", post(restart))
        .route("/step", post(step))
        .route("/resize", post(resize))
        .layer(CorsLayer::permissive())
        .with_state(api_state)
}

// Run the API server with the field ticking in the background
pub async fn run_server(api_state: ApiState, port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(api_state.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port, "particlefield headless API listening");
    info!("GET /state /stats /frame /config | POST /restart /step?steps=N /resize?width=W&height=H");

    let frame_task = tokio::spawn(frame_loop(api_state.clone()));
    let server_handle = tokio::spawn(async move { axum::serve(listener, app).await });

    tokio::select! {
        result = server_handle => {
            result??;
        }
        _ = frame_task => {
            warn!("frame loop ended unexpectedly");
        }
    }

    Ok(())
}

// Background task standing in for the display's frame callback
async fn frame_loop(api_state: ApiState) {
    let frame_duration = std::time::Duration::from_secs_f64(FRAME_MS / 1000.0);
    let mut interval = tokio::time::interval(frame_duration);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        {
            let mut h = match api_state.headless.lock() {
                Ok(h) => h,
                Err(_) => break,
            };
            h.step();
        }
    }
}
