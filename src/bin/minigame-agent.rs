use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use minigame_agent::client::{LoginCode, QrCodeRequest, TemplateMessage};
use minigame_agent::server;
use minigame_agent::utils::config_loader;
use minigame_agent::utils::logging::{self, LogLevel};
use minigame_agent::ClientRegistry;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "minigame-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the current access token of a client.
    Token {
        #[arg(long)]
        client: String,
    },
    /// Exchange a login code for a session.
    Session {
        #[arg(long)]
        client: String,
        #[arg(long, conflicts_with = "anonymous_code", required_unless_present = "anonymous_code")]
        code: Option<String>,
        #[arg(long)]
        anonymous_code: Option<String>,
    },
    CheckSession {
        #[arg(long)]
        client: String,
        #[arg(long)]
        open_id: String,
        #[arg(long)]
        session_key: String,
    },
    SendTemplate {
        #[arg(long)]
        client: String,
        #[arg(long)]
        open_id: String,
        #[arg(long)]
        template_id: String,
        #[arg(long, default_value = "")]
        page: String,
        /// Template data as JSON.
        #[arg(long)]
        data: String,
        #[arg(long)]
        form_id: Option<String>,
        #[arg(long)]
        emphasis_keyword: Option<String>,
    },
    /// Generate and store a QR code, printing its URL.
    Qrcode {
        #[arg(long)]
        client: String,
        #[arg(long)]
        path: String,
        #[arg(long, default_value_t = 430)]
        width: u32,
        #[arg(long)]
        app_name: Option<String>,
    },
    /// Serve tokens and metrics over HTTP.
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load and validate YAML config
    // -------------------------------

    let args = Args::parse();
    let loaded = config_loader::run(&args.config).await?;
    logging::run(&loaded.service.settings, args.log_level).await?;

    // -------------------------------
    // 2. Build the client registry
    // -------------------------------

    let settings = &loaded.service.settings;
    let registry = Arc::new(ClientRegistry::from_settings(&settings.cache)?);

    let client_for = |name: &str| {
        loaded
            .clients
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow!("unknown client '{}'", name))
    };

    // -------------------------------
    // 3. Run the command
    // -------------------------------

    match args.command {
        Command::Token { client } => {
            let c = registry.get_or_create(&client_for(&client)?).await?;
            println!("{}", c.access_token().await?);
        }
        Command::Session {
            client,
            code,
            anonymous_code,
        } => {
            let login = match (code, anonymous_code) {
                (Some(code), _) => LoginCode::Code(code),
                (None, Some(code)) => LoginCode::Anonymous(code),
                (None, None) => return Err(anyhow!("--code or --anonymous-code is required")),
            };
            let c = registry.get_or_create(&client_for(&client)?).await?;
            let session = c.code2session(&login).await?;
            println!("{}", serde_json::to_string_pretty(&session)?);
        }
        Command::CheckSession {
            client,
            open_id,
            session_key,
        } => {
            let c = registry.get_or_create(&client_for(&client)?).await?;
            c.check_session(&open_id, &session_key).await?;
            println!("session is valid");
        }
        Command::SendTemplate {
            client,
            open_id,
            template_id,
            page,
            data,
            form_id,
            emphasis_keyword,
        } => {
            let message = TemplateMessage {
                to_user: open_id,
                template_id,
                page,
                data: serde_json::from_str(&data)
                    .map_err(|e| anyhow!("--data is not valid JSON: {}", e))?,
                form_id,
                emphasis_keyword,
            };
            let c = registry.get_or_create(&client_for(&client)?).await?;
            c.send_template_message(&message).await?;
            println!("sent");
        }
        Command::Qrcode {
            client,
            path,
            width,
            app_name,
        } => {
            let mut request = QrCodeRequest::new(path);
            request.width = width;
            if let Some(app_name) = app_name {
                request.app_name = app_name;
            }
            let c = registry.get_or_create(&client_for(&client)?).await?;
            let asset = c.generate_qr_code(&request).await?;
            println!("{}", asset.url);
        }
        Command::Serve => {
            info!("Service starting...");
            server::server::start(settings, registry, loaded.clients.clone()).await?;
        }
    }

    Ok(())
}
