use lankamate::{handlers, AppState, Config, GeminiClient};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    if let Err(e) = init_logging() {
        eprintln!("Failed to initialize logging: {}", e);
        std::process::exit(1);
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            tracing::info!("Set GEMINI_API_KEY in the environment or in a .env file");
            std::process::exit(1);
        }
    };

    tracing::info!(
        "Initializing Gemini client (chat: {}, vision: {}, embeddings: {} x{})",
        config.chat_model,
        config.vision_model,
        config.embedding_model,
        config.embedding_dimensions
    );
    let gemini_client = GeminiClient::new(&config);

    let bind_addr = config.bind_addr;
    let session_idle = config.session_idle;
    let shared_state = Arc::new(AppState::new(Arc::new(gemini_client), config));

    // Chat sessions end with the browser tab; drop the ones nobody touches anymore.
    let sweep_state = shared_state.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sweep_state.sessions.expire_idle(session_idle).await;
            if removed > 0 {
                tracing::info!("🗑️ Expired {} idle chat session(s)", removed);
            }
        }
    });

    let app = handlers::app_router(shared_state);

    let listener = match tokio::net::TcpListener::bind(bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("❌ Failed to bind {}: {}", bind_addr, e);
            std::process::exit(1);
        }
    };
    tracing::info!("listening on {}", bind_addr);

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("❌ Server error: {}", e);
        std::process::exit(1);
    }
}

// Human-readable logs by default, JSON with LOG_FORMAT=json
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cfg!(debug_assertions) {
            "debug,lankamate=trace,reqwest=info,hyper=info,tower=info".to_string()
        } else {
            "info,lankamate=info,reqwest=warn,hyper=warn,tower=warn".to_string()
        }
    });

    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log_level))?;

    let fmt_layer = if std::env::var("LOG_FORMAT").as_deref() == Ok("json") {
        fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_target(true)
            .boxed()
    } else {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .boxed()
    };

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).try_init()?;

    tracing::info!("🤖 LankaMate AI starting up...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Build mode: {}", if cfg!(debug_assertions) { "development" } else { "production" });
    tracing::info!("Log level: {}", log_level);

    Ok(())
}
