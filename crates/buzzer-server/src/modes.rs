//! The three run modes: interactive server, load simulation, and both.

use std::sync::Arc;
use std::time::Instant;

use buzzer_api::{AppState, ServerError, build_router};
use buzzer_core::{BuzzerConfig, Engine};
use buzzer_loadgen::{LoadConfig, LoadGenerator};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::console;
use crate::error::AppError;

/// A running engine with its HTTP server.
struct Serving {
    engine: Arc<Engine>,
    stop: oneshot::Sender<()>,
    server: JoinHandle<Result<(), ServerError>>,
}

impl Serving {
    async fn start(config: &BuzzerConfig) -> Result<Self, AppError> {
        let listener = buzzer_api::bind(&config.server).await?;
        let engine = Arc::new(Engine::start(&config.engine));
        let router = build_router(Arc::new(AppState::new(Arc::clone(&engine))));

        let (stop, stopped) = oneshot::channel::<()>();
        let server = tokio::spawn(buzzer_api::serve(listener, router, async move {
            let _ = stopped.await;
        }));

        Ok(Self {
            engine,
            stop,
            server,
        })
    }

    /// Stop the engine first, then the HTTP server.
    async fn stop(self) -> Result<(), AppError> {
        self.engine.shutdown().await;
        if self.stop.send(()).is_err() {
            warn!("HTTP server had already stopped");
        }
        self.server.await??;
        Ok(())
    }
}

/// `server` mode: serve the API and take console commands until `exit`
/// or Ctrl-C.
pub async fn run_server(config: &BuzzerConfig) -> Result<(), AppError> {
    let serving = Serving::start(config).await?;

    println!("Server running on port {}", config.server.port);
    println!("Endpoint: POST http://localhost:{}/submit", config.server.port);
    println!("{}", console::HELP);
    println!("Waiting for user responses...");

    tokio::select! {
        result = console::run(&serving.engine) => result?,
        result = tokio::signal::ctrl_c() => {
            result?;
            info!("Ctrl-C received");
        }
    }

    println!("Shutting down server...");
    if let Some(winner) = serving.engine.get_winner() {
        println!(
            "Final winner: user {} with answer '{}'",
            winner.participant_id, winner.answer
        );
    }
    println!(
        "Total responses processed: {}",
        serving.engine.get_stats().total_responses
    );

    serving.stop().await
}

/// `mock` mode: drive simulated users against an external API.
pub async fn run_mock(config: &BuzzerConfig, api_url: &str) -> Result<(), AppError> {
    let load = LoadConfig::from(&config.loadgen);
    println!("Simulating {} users", load.users);
    println!("Target API: {api_url}");

    let generator = LoadGenerator::new(api_url, load)?;
    let report = generator.run().await;
    println!("{}", console::render_load_report(&report));
    Ok(())
}

/// `full` mode: serve the API, simulate users against it, report the
/// outcome, and shut down.
pub async fn run_full(config: &BuzzerConfig) -> Result<(), AppError> {
    let serving = Serving::start(config).await?;
    let url = format!("http://127.0.0.1:{}/submit", config.server.port);

    println!("Server port: {}", config.server.port);
    println!("Mock users: {}", config.loadgen.users);

    let started = Instant::now();
    let generator = LoadGenerator::new(url, LoadConfig::from(&config.loadgen))?;
    let report = generator.run().await;
    drop(generator);
    println!("{}", console::render_load_report(&report));

    serving.engine.flush().await;
    println!(
        "{}",
        console::render_final(&serving.engine.get_stats(), started.elapsed())
    );

    serving.stop().await
}
