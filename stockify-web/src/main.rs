//! Stockify Web Server
//!
//! Session and token management service for the Stockify inventory system.

use clap::Parser;
use stockify_core::logging::{init_logging, LoggingConfig};
use stockify_web::{StockifyServer, WebConfig};

/// Stockify Web Server - session and access control service
#[derive(Parser)]
#[command(name = "stockify-web")]
#[command(about = "Session and token management for Stockify")]
#[command(version)]
struct Args {
    /// Server host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Server port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable development mode (refresh cookie is not marked secure)
    #[arg(long)]
    dev: bool,

    /// Database URL for the user store
    #[arg(long)]
    database_url: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let logging = LoggingConfig {
        level: args.log_level.clone(),
        ..LoggingConfig::default()
    };
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
        std::process::exit(1);
    }

    // Load environment variables
    dotenvy::dotenv().ok();

    let mut config = if args.dev {
        // Development mode carries a built-in signing secret
        WebConfig::default()
    } else {
        match WebConfig::from_env() {
            Ok(config) => config,
            Err(e) => {
                eprintln!("❌ Configuration error: {e}");
                std::process::exit(1);
            }
        }
    };

    // Command line arguments win over the environment
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if args.dev {
        config.dev_mode = true;
    }
    if let Some(database_url) = args.database_url {
        config.database_url = database_url;
    }

    println!("🚀 Starting Stockify Web Server");
    println!("📍 Server: http://{}:{}", config.host, config.port);
    println!("🔧 Development mode: {}", config.dev_mode);
    println!("🗄️  Database: {}", config.database_url);

    let server = match StockifyServer::new(config).await {
        Ok(server) => server,
        Err(e) => {
            if let stockify_web::WebError::Core(core) = &e {
                core.log();
            }
            eprintln!("❌ Failed to build server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.start().await {
        eprintln!("❌ Server failed to start: {e}");
        std::process::exit(1);
    }

    println!("✅ Server shut down gracefully");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_parsing() {
        let args = Args::parse_from(["stockify-web"]);
        assert!(args.host.is_none());
        assert!(!args.dev);

        let args = Args::parse_from([
            "stockify-web",
            "--host",
            "0.0.0.0",
            "--port",
            "3000",
            "--dev",
        ]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(3000));
        assert!(args.dev);
    }
}
