use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use tracing::warn;

mod admin;
mod app;
mod handler;
mod logging;
mod server;
mod tui;
mod ui;

use app::App;
use fitconnect_core::replica::CLIENT_CONFIG_FILE;
use fitconnect_core::{ChatSession, Config, FileStore, ReplicaChat};
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "fitconnect")]
#[command(version)]
#[command(about = "FitConnect personal trainer matchmaking assistant")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the replica in the terminal
    Chat {
        /// Interface language (pt or en)
        #[arg(short, long)]
        lang: Option<String>,
    },
    /// Run the chat proxy and admin HTTP server
    Serve {
        /// Address to listen on, e.g. 0.0.0.0:3000
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Create the FitConnect replica and train it on the initial training file
    Create {
        /// Where to write the client config
        #[arg(short, long, default_value = CLIENT_CONFIG_FILE)]
        output: PathBuf,
    },
    /// Show the configured replica
    Info {
        /// Client config written by `create`
        #[arg(short, long, default_value = CLIENT_CONFIG_FILE)]
        client_config: PathBuf,
    },
    /// Print the effective configuration and report missing settings
    CheckConfig,
    /// Choose the chat language and save it to the config file
    Language {
        /// Language code (en or pt); prompts when omitted
        code: Option<String>,
    },
    /// Replica and training management
    #[command(subcommand)]
    Admin(AdminCommand),
}

#[derive(Subcommand)]
enum AdminCommand {
    /// List replicas owned by the configured owner
    List,
    /// Show one replica
    Details { uuid: String },
    /// Delete a replica
    Delete {
        uuid: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Upload training content from a file or inline text
    Upload {
        /// Target replica (defaults to REPLICA_UUID)
        #[arg(short, long)]
        replica: Option<String>,
        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
        #[arg(short, long)]
        text: Option<String>,
    },
    /// List local training files
    Files,
    /// Open a training file in $EDITOR
    EditFile {
        /// Path relative to the training directory
        name: Option<String>,
    },
    /// Show training entries grouped by replica
    Content {
        #[arg(short, long)]
        replica: Option<String>,
    },
    /// Delete a training entry
    DeleteContent {
        id: i64,
        #[arg(short, long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;

    // The terminal UI owns stderr, so the chat logs to a file instead
    let _guard = match &cli.command {
        Commands::Chat { .. } => logging::init_file(&config, &Config::data_dir()?),
        _ => logging::init_stderr(&config),
    };

    match cli.command {
        Commands::Chat { lang } => {
            if let Some(lang) = lang {
                config.language = Some(lang);
            }
            run_chat(&config).await?;
        }
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_address = bind;
            }
            server::serve(config).await?;
        }
        Commands::Create { output } => admin::create(&config, &output).await?,
        Commands::Info { client_config } => admin::info(&config, &client_config).await?,
        Commands::CheckConfig => {
            if !admin::check_config(&config) {
                std::process::exit(1);
            }
        }
        Commands::Language { code } => admin::set_language(&config, code)?,
        Commands::Admin(command) => run_admin(&config, command).await?,
    }

    Ok(())
}

async fn run_admin(config: &Config, command: AdminCommand) -> Result<()> {
    match command {
        AdminCommand::List => admin::list(config).await,
        AdminCommand::Details { uuid } => admin::details(config, &uuid).await,
        AdminCommand::Delete { uuid, yes } => admin::delete(config, &uuid, yes).await,
        AdminCommand::Upload { replica, file, text } => {
            admin::upload(config, replica, file, text).await
        }
        AdminCommand::Files => admin::files(config),
        AdminCommand::EditFile { name } => admin::edit_file(config, name),
        AdminCommand::Content { replica } => admin::content(config, replica.as_deref()).await,
        AdminCommand::DeleteContent { id, yes } => admin::delete_content(config, id, yes).await,
    }
}

async fn run_chat(config: &Config) -> Result<()> {
    let session = ChatSession::restore(FileStore::open_default()?, config.language());

    let backend = match ReplicaChat::from_config(config) {
        Ok(backend) => Some(backend),
        Err(e) => {
            warn!(error = %e, "replica not configured, replies will use fallback messages");
            None
        }
    };

    let mut app = App::new(session, backend);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();

    let result: Result<()> = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;
            match events.next().await {
                Some(event) => handler::handle_event(&mut app, event).await,
                None => break,
            }
        }
        Ok(())
    }
    .await;

    tui::restore()?;
    result
}
