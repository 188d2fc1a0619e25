use aibox::client::ApiClient;
use aibox::utils::{logger, validation::Validate};
use aibox::{dashboard_router, DashboardArgs, DashboardState};
use anyhow::Context;
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = DashboardArgs::parse();

    // 初始化日誌
    logger::init_server_logger(args.verbose, args.log_json);

    if let Err(e) = args.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }

    let client = ApiClient::new(args.client_config());
    if !client.health().await {
        tracing::warn!("⚠️ API not reachable at {} yet; uploads fall back to a local preview", args.api_url);
    }
    let app = dashboard_router(DashboardState::new(client, args.max_upload_bytes()));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    tracing::info!("🚀 AI-in-a-Box dashboard on {} → API {}", addr, args.api_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
        .context("server error")?;

    tracing::info!("👋 Dashboard stopped");
    Ok(())
}
