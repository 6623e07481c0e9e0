use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use filegate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let config = Config::load()?;

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "filegate",
        "filegate starting: RUST_LOG='{}', http_port={}, webapp_origin='{}', bucket_attachments='{}', bucket_avatars='{}', signed_url_ttl_secs={}",
        rust_log,
        config.http_port,
        config.webapp_url,
        config.s3.bucket_attachments,
        config.s3.bucket_avatars,
        config.signed_url_ttl_secs
    );

    filegate::server::run_with_config(config).await
}
