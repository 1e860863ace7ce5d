use anyhow::Result;
use clap::Parser;
use instacap::app::App;
use instacap::models::Config;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "instacap")]
#[command(about = "Serve AI-generated Instagram captions for uploaded photos")]
struct CliArgs {
    /// Address to listen on, overriding BIND_ADDR.
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "instacap=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting instacap");

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let addr = args.bind.unwrap_or_else(|| config.bind_addr.clone());
    let listener = TcpListener::bind(addr.as_str()).await?;

    let app = App::new(&config);
    if let Err(e) = app.serve(listener).await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn test_bind_flag_is_optional() {
        let args = CliArgs::try_parse_from(["instacap"]).unwrap();
        assert!(args.bind.is_none());
    }

    #[test]
    fn test_bind_flag_parses() {
        let args = CliArgs::try_parse_from(["instacap", "--bind", "127.0.0.1:8080"]).unwrap();
        assert_eq!(args.bind.as_deref(), Some("127.0.0.1:8080"));
    }
}
