use clap::Parser;
use ngd_server::Config;
use tracing_subscriber::EnvFilter;

/// HTTP facade over the OS NGD features API.
#[derive(Debug, Parser)]
struct Args {
    /// The address to listen on.
    #[arg(long, default_value = "127.0.0.1:8080", env = "NGD_ADDR")]
    addr: String,

    /// The root of the upstream features API.
    #[arg(long, default_value = ngd_api::DEFAULT_BASE_URL, env = "NGD_BASE_URL")]
    base_url: String,

    /// The OAuth2 token endpoint.
    #[arg(long, default_value = ngd_api::DEFAULT_TOKEN_URL, env = "NGD_TOKEN_URL")]
    token_url: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let state = Config {
        base_url: args.base_url,
        token_url: args.token_url,
    }
    .build_state()?;
    let listener = tokio::net::TcpListener::bind(&args.addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, ngd_server::router(state)).await?;
    Ok(())
}
