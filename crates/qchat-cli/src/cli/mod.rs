//! CLI entry and dispatch.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use qchat_core::chat::ChatStore;
use qchat_core::client::ChatClient;
use qchat_core::config::{self, Config};
use qchat_core::session::ChatSession;
use qchat_core::storage::FileStorage;
use qchat_core::{interrupt, logging};

mod commands;
mod terminal;

#[derive(Parser)]
#[command(name = "qchat")]
#[command(version)]
#[command(about = "Streaming chat client for the terminal")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Directory holding saved chats (default: $QCHAT_HOME/chats)
    #[arg(long, global = true, env = "QCHAT_DATA_DIR", value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Sends one message and streams the reply to stdout
    Send {
        /// The message to send
        message: String,

        /// Continue an existing chat by ID
        #[arg(long, value_name = "ID")]
        chat: Option<String>,

        /// Print the reply as rendered HTML once it completes
        #[arg(long)]
        html: bool,
    },
    /// Starts an interactive chat (default)
    Chat {
        /// Continue an existing chat by ID
        #[arg(long, value_name = "ID")]
        chat: Option<String>,
    },
    /// Manage saved chats
    Chats {
        #[command(subcommand)]
        command: ChatsCommands,
    },
    /// Renders markdown from stdin to HTML
    Render,
    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum ChatsCommands {
    /// Lists saved chats grouped by age
    List,
    /// Creates an empty chat and prints its ID
    New,
    /// Shows the messages of a chat
    Show {
        /// The ID of the chat to show
        #[arg(value_name = "CHAT_ID")]
        id: String,

        /// Print messages as rendered HTML
        #[arg(long)]
        html: bool,
    },
    /// Deletes a chat and its messages
    Delete {
        /// The ID of the chat to delete
        #[arg(value_name = "CHAT_ID")]
        id: String,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
}

/// Settings shared by every command.
pub(crate) struct AppContext {
    config: Config,
    data_dir: Option<PathBuf>,
}

impl AppContext {
    pub(crate) fn store(&self) -> Result<ChatStore<FileStorage>> {
        let dir = self
            .data_dir
            .clone()
            .unwrap_or_else(|| self.config.chats_dir());
        let storage = FileStorage::open(dir.clone())
            .with_context(|| format!("open chat storage at {}", dir.display()))?;
        Ok(ChatStore::new(storage))
    }

    pub(crate) fn client(&self) -> Result<ChatClient> {
        let url = self.config.server_url()?;
        Ok(ChatClient::new(&url, self.config.connect_timeout())?)
    }

    /// Opens `chat_id`, or starts a new unsaved chat.
    pub(crate) fn session(&self, chat_id: Option<&str>) -> Result<ChatSession<FileStorage>> {
        let client = self.client()?;
        let store = self.store()?;
        match chat_id {
            Some(id) => ChatSession::open(client, store, id)
                .with_context(|| format!("load chat '{id}'")),
            None => Ok(ChatSession::new(client, store)),
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    interrupt::init().context("install Ctrl+C handler")?;
    let _log_guard = logging::init(&config::paths::logs_dir());

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli).await })
}

async fn dispatch(cli: Cli) -> Result<()> {
    let Cli { command, data_dir } = cli;
    let context = || -> Result<AppContext> {
        Ok(AppContext {
            config: Config::load().context("load config")?,
            data_dir: data_dir.clone(),
        })
    };

    match command {
        // default to chat mode
        None => commands::chat::run(&context()?, None).await,
        Some(Commands::Send {
            message,
            chat,
            html,
        }) => commands::send::run(&context()?, &message, chat.as_deref(), html).await,
        Some(Commands::Chat { chat }) => commands::chat::run(&context()?, chat.as_deref()).await,
        Some(Commands::Chats { command }) => {
            let ctx = context()?;
            match command {
                ChatsCommands::List => commands::chats::list(&ctx),
                ChatsCommands::New => commands::chats::new(&ctx),
                ChatsCommands::Show { id, html } => commands::chats::show(&ctx, &id, html),
                ChatsCommands::Delete { id } => commands::chats::delete(&ctx, &id),
            }
        }
        Some(Commands::Render) => commands::render::run(),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
        },
    }
}
