//! # furl - نقطه ورود برنامه
//!
//! ## مفاهیم Rust در این فایل:
//! - `async fn main()`: تابع اصلی غیرهمزمان با tokio
//! - `?` operator: انتشار خطا به بالا
//! - Graceful shutdown: سرور بعد از Ctrl-C request‌های جاری رو تموم میکنه

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use furl::{
    api::create_router,
    config::{Config, Environment},
    error::{AppError, Result},
    services::{AppState, Shortener},
    storage::records,
    validators,
};

/// نقطه ورود اصلی برنامه
///
/// # Errors
/// خطا برمیگردونه اگه:
/// - تنظیمات نامعتبر باشن
/// - فایل رکوردها باز یا خونده نشه
/// - سرور استارت نشه
#[tokio::main]
async fn main() -> Result<()> {
    // اگه فایل .env نباشه اوکیه
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    config.validate()?;

    init_tracing(config.environment);
    info!("🚀 Starting furl...");

    let mut builder = Shortener::builder()
        .with_config(&config)
        .url_validator(validators::http_url)
        .key_validator(validators::url_safe_key);

    match &config.data_file {
        Some(path) => {
            let (urls, sink) = records::open(path)?;
            info!(path = %path.display(), records = urls.len(), "✅ Records loaded");
            builder = builder.data(urls).sink(sink);
        }
        None => warn!("FURL_DATA_FILE not set, keys live in memory only"),
    }

    let state = AppState::new(builder.build(), config.clone());
    let app = create_router(state);

    let addr = config.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    info!("🌐 Server listening on http://{} ({})", addr, config.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::Server(e.to_string()))?;

    info!("👋 Server stopped");
    Ok(())
}

/// منتظر Ctrl-C
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// راه‌اندازی سیستم tracing برای لاگینگ
///
/// - EnvFilter از متغیر RUST_LOG میخونه، اگه نبود default استفاده میکنه
/// - در production خروجی JSON، در development فرمت pretty
fn init_tracing(environment: Environment) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("furl=debug,tower_http=debug"));

    let registry = tracing_subscriber::registry().with(env_filter);

    if environment.is_production() {
        registry
            .with(fmt::layer().json().with_target(true).with_current_span(true))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_file(true)
                    .with_line_number(true)
                    .pretty(),
            )
            .init();
    }
}
