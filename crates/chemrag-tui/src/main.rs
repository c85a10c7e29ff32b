use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use crossterm::style::Stylize;
use tracing::info;

use chemrag_core::{split_emphasis, AskClient, Config, Conversation, Message, QueryDispatcher};

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;

#[derive(Parser)]
#[command(name = "chemrag")]
#[command(version, about = "Terminal chat client for the ChemRAG question-answering service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Backend base URL (overrides CHEMRAG_URL and the config file)
    #[arg(short, long, global = true)]
    url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask a single question and print the answer
    Ask {
        /// Your question
        question: String,
    },
    /// Show the resolved configuration, optionally saving a new backend URL
    Config {
        /// Persist this backend URL to the config file
        #[arg(long)]
        set_url: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    let base_url = config.resolve_base_url(cli.url.as_deref());

    match cli.command {
        None => {
            let log_path = logging::init_file(cli.verbose)?;
            info!(%base_url, log = %log_path.display(), "starting chat");
            run_tui(build_dispatcher(&config, &base_url)?, base_url).await
        }
        Some(Commands::Ask { question }) => {
            logging::init_stderr(cli.verbose)?;
            ask_once(build_dispatcher(&config, &base_url)?, &question).await
        }
        Some(Commands::Config { set_url: Some(url) }) => {
            config.base_url = Some(url);
            config.save()?;
            let base_url = config.resolve_base_url(cli.url.as_deref());
            show_config(&config, &base_url)
        }
        Some(Commands::Config { set_url: None }) => show_config(&config, &base_url),
    }
}

fn build_dispatcher(config: &Config, base_url: &str) -> Result<QueryDispatcher> {
    let client = match config.timeout() {
        Some(timeout) => AskClient::with_timeout(base_url, timeout)?,
        None => AskClient::new(base_url),
    };
    Ok(QueryDispatcher::new(client))
}

async fn run_tui(dispatcher: QueryDispatcher, base_url: String) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(dispatcher, base_url);

    let result = event_loop(&mut terminal, &mut app).await;

    tui::restore()?;
    result
}

async fn event_loop(terminal: &mut tui::Tui, app: &mut App) -> Result<()> {
    let mut events = tui::EventHandler::new(tui::TICK_RATE);

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event).await,
            None => break,
        }
    }

    info!(turns = app.conversation.len(), "chat closed");
    Ok(())
}

async fn ask_once(dispatcher: QueryDispatcher, question: &str) -> Result<()> {
    let mut conversation = Conversation::new();
    conversation.pending_mut().set_input(question);

    let Some(reply) = dispatcher.ask(&mut conversation).await else {
        bail!("question is empty");
    };
    print_reply(reply);
    Ok(())
}

fn print_reply(reply: &Message) {
    let answer: String = split_emphasis(&reply.content)
        .into_iter()
        .map(|segment| {
            if segment.emphasized {
                segment.text.bold().to_string()
            } else {
                segment.text.to_string()
            }
        })
        .collect();
    println!("{}", answer);

    if let Some(sources) = chemrag_core::citations(reply) {
        println!("\n{}", "Sources:".dim());
        for (i, src) in sources.iter().enumerate() {
            println!("  {}. {}", i + 1, src.as_str().underlined().blue());
        }
    }
}

fn show_config(config: &Config, base_url: &str) -> Result<()> {
    println!("{} {}", "config file:".bold(), Config::get_config_path()?.display());
    println!("{} {}", "base url:   ".bold(), base_url);
    match config.timeout() {
        Some(timeout) => println!("{} {}s", "timeout:    ".bold(), timeout.as_secs()),
        None => println!("{} none", "timeout:    ".bold()),
    }
    if let Ok(path) = logging::log_path() {
        println!("{} {}", "log file:   ".bold(), path.display());
    }
    Ok(())
}
