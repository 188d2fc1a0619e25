use aibox::utils::logger;
use aibox::{router, AppState, ArtifactRegistry, CleaningEngine, LocalStorage, ServerArgs, Settings};
use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = ServerArgs::parse();

    // 初始化日誌
    logger::init_server_logger(args.verbose, args.log_json);

    let settings = match Settings::load(&args) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e);
            std::process::exit(1);
        }
    };
    tracing::debug!("Settings: {:?}", settings);

    tokio::fs::create_dir_all(&settings.artifact_dir)
        .await
        .with_context(|| format!("cannot create {}", settings.artifact_dir.display()))?;

    let ttl = match settings.artifact_ttl_secs {
        Some(secs) => Some(
            i64::try_from(secs)
                .ok()
                .and_then(chrono::Duration::try_seconds)
                .context("artifact_ttl_secs is out of range")?,
        ),
        None => None,
    };

    // 建立存儲與引擎
    let storage = LocalStorage::new(settings.artifact_dir.clone());
    let engine = Arc::new(CleaningEngine::new(storage, ArtifactRegistry::new(ttl)));

    if let Some(secs) = settings.artifact_ttl_secs {
        tracing::info!("🧹 Artifacts expire after {}s", secs);
        Arc::clone(&engine).spawn_sweeper(Duration::from_secs(secs.clamp(1, 60)));
    }

    let app = router(AppState::new(engine, &settings));

    let addr = settings.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;

    tracing::info!(
        "🚀 AI-in-a-Box API v{} listening on {} (artifacts in {})",
        env!("CARGO_PKG_VERSION"),
        addr,
        settings.artifact_dir.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("👋 Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
