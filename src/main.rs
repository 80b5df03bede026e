use docparse_api::{serve, Config};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = Config::from_env();
    if let Err(e) = serve(config).await {
        tracing::error!("server error: {}", e);
        std::process::exit(1);
    }
}
