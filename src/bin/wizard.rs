//! PAT Agent terminal wizard
//!
//! Drives the wizard from a terminal: chat with the backend, inspect and
//! delete history, show the stage timeline, run the model-backed stages and
//! check model replies against their contracts without calling a model.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use indicatif::{ProgressBar, ProgressStyle};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use pat_agent::config::Settings;
use pat_agent::contracts::{parse_actions, parse_tables};
use pat_agent::llm::providers::create_provider;
use pat_agent::verification::{assertion_line, split_code_and_assertions};
use pat_agent::{
    ChatSession, ConfirmDialog, DialogOptions, DirectGateway, HistoryChannel, Interaction,
    LoadingOverlay, ModelGateway, PatAgentError, ProcessTables, RemoteGateway, StepStatus, Store,
    StructuredData, Timeline, WizardClient, Wizard,
};

#[derive(Parser)]
#[command(name = "pat-agent")]
#[command(about = "PAT Agent wizard - from a system description to PAT code")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (defaults to pat-agent.toml when present)
    #[arg(short, long)]
    config: Option<String>,

    /// Backend URL, overrides the settings
    #[arg(long, env = "PAT_AGENT_URL")]
    url: Option<String>,

    /// Send wizard prompts straight to the configured LLM provider instead of the backend
    #[arg(long)]
    direct: bool,

    /// Log at debug level instead of the configured `log_level`
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the backend a chat question
    Ask {
        question: String,
    },

    /// Show the chat history
    History {
        /// History channel (default, const, action, assertion, chatbot)
        #[arg(long)]
        channel: Option<String>,
    },

    /// Delete one message from the chat history
    Delete {
        index: usize,

        /// Skip the confirmation dialog
        #[arg(long)]
        yes: bool,
    },

    /// Show the stage timeline at a step (1-8)
    Timeline {
        step: u8,
    },

    /// Show one entry of the backend's algorithm catalog
    Algorithm {
        id: String,
    },

    /// Stage 1: classify a system description against the algorithm catalog
    Classify {
        description: String,
    },

    /// Stage 2: extract constants and variables from a structured description (JSON file)
    ExtractTables {
        data: PathBuf,
    },

    /// Stages 2 and 3: extract tables, then actions
    ExtractActions {
        data: PathBuf,
    },

    /// Check a saved constants/variables reply against a structured description
    ValidateTables {
        data: PathBuf,
        reply: PathBuf,
    },

    /// Check a saved actions reply against a tables file
    ValidateActions {
        tables: PathBuf,
        reply: PathBuf,
    },

    /// Split PAT code into one model per assertion
    Split {
        code: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenv::dotenv();
    let cli = Cli::parse();
    let mut settings = Settings::load(cli.config.as_deref()).context("loading settings")?;
    if let Some(url) = &cli.url {
        settings.client.base_url = url.clone();
    }

    let level = settings.log_filter(cli.verbose);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Ask { question } => ask(&settings, question).await,
        Commands::History { channel } => history(&settings, channel.as_deref()).await,
        Commands::Delete { index, yes } => delete(&settings, *index, *yes).await,
        Commands::Timeline { step } => {
            print_timeline(&Timeline::new(*step)?);
            Ok(())
        }
        Commands::Algorithm { id } => {
            let entry = with_loading(
                LoadingOverlay::new("Fetching algorithm"),
                client(&settings)?.fetch_algorithm_details(id),
            )
            .await?;
            println!("{} {}", entry.id.bold(), entry.name);
            println!("{}", entry.description);
            if !entry.implementation.is_empty() {
                println!("\n{}", entry.implementation);
            }
            Ok(())
        }
        Commands::Classify { description } => {
            let mut wizard = wizard(&settings, cli.direct)?;
            let intent = with_loading(
                LoadingOverlay::new("Classifying description"),
                wizard.classify(description),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&intent)?);
            print_timeline(&Timeline::at(wizard.stage().await));
            Ok(())
        }
        Commands::ExtractTables { data } => {
            let data: StructuredData = read_json(data)?;
            let mut wizard = wizard(&settings, cli.direct)?;
            let tables = with_loading(
                LoadingOverlay::new("Extracting constants and variables"),
                wizard.extract_tables(data),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&tables)?);
            Ok(())
        }
        Commands::ExtractActions { data } => {
            let data: StructuredData = read_json(data)?;
            let mut wizard = wizard(&settings, cli.direct)?;
            with_loading(
                LoadingOverlay::new("Extracting constants and variables"),
                wizard.extract_tables(data),
            )
            .await?;
            let actions = with_loading(
                LoadingOverlay::new("Extracting actions"),
                wizard.extract_actions(),
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
            Ok(())
        }
        Commands::ValidateTables { data, reply } => {
            let data: StructuredData = read_json(data)?;
            let reply = std::fs::read_to_string(reply)?;
            report(parse_tables(&reply, &data).map(|tables| {
                format!("{} processes", tables.processes.len())
            }))
        }
        Commands::ValidateActions { tables, reply } => {
            let tables: ProcessTables = read_json(tables)?;
            let reply = std::fs::read_to_string(reply)?;
            report(parse_actions(&reply, &tables).map(|actions| {
                format!("{} actions", actions.actions().count())
            }))
        }
        Commands::Split { code } => {
            let code = std::fs::read_to_string(code)?;
            let units = split_code_and_assertions(&code);
            if units.is_empty() {
                bail!("no #assert lines found");
            }
            for (i, unit) in units.iter().enumerate() {
                let assertion = assertion_line(unit).unwrap_or_default();
                println!("{}", format!("── unit {}: {}", i + 1, assertion).bold());
                println!("{}\n", unit);
            }
            Ok(())
        }
    }
}

fn client(settings: &Settings) -> Result<WizardClient> {
    Ok(WizardClient::new(settings.client_config())?)
}

fn wizard(settings: &Settings, direct: bool) -> Result<Wizard> {
    let gateway: Arc<dyn ModelGateway> = if direct {
        let provider_type = settings.llm.provider_type()?;
        let provider_settings = settings
            .llm
            .provider_settings_from_env()?
            .with_context(|| format!("no API key set for {}", provider_type))?;
        let mut gateway = DirectGateway::new(create_provider(&provider_type, provider_settings)?);
        if let Some(max_tokens) = settings.llm.max_tokens {
            gateway = gateway.with_max_tokens(max_tokens);
        }
        Arc::new(gateway)
    } else {
        Arc::new(RemoteGateway::new(client(settings)?))
    };
    Ok(Wizard::new(gateway, Store::new()))
}

async fn ask(settings: &Settings, question: &str) -> Result<()> {
    let session = ChatSession::new(client(settings)?, Store::new());
    with_loading(LoadingOverlay::new("Asking"), session.ask_question(question)).await?;

    match session.messages().await.last() {
        Some(last) => println!("{}", last.answer),
        None => println!("{}", "(no answer)".dimmed()),
    }
    Ok(())
}

async fn history(settings: &Settings, channel: Option<&str>) -> Result<()> {
    let client = client(settings)?;
    let messages = match channel.map(HistoryChannel::from_label) {
        None | Some(HistoryChannel::Default) => client.fetch_history().await?,
        Some(channel) => client.fetch_channel_history(channel).await?,
    };
    print_messages(&messages);
    Ok(())
}

async fn delete(settings: &Settings, index: usize, yes: bool) -> Result<()> {
    let session = ChatSession::new(client(settings)?, Store::new());
    session.fetch_history().await?;
    let messages = session.messages().await;
    let Some(target) = messages.get(index) else {
        bail!("no message at index {} ({} messages)", index, messages.len());
    };

    if !yes {
        let dialog = ConfirmDialog::new();
        let answer = dialog.open(
            DialogOptions::new()
                .with_title("Delete message")
                .with_message(format!("Delete \"{}\"?", target.question))
                .with_confirm_text("Delete"),
        );
        render_dialog(&dialog)?;
        if !answer.await {
            println!("{}", "Cancelled".yellow());
            return Ok(());
        }
    }

    session.delete_message(index).await?;
    println!("{}", "Deleted".green());
    print_messages(&session.messages().await);
    Ok(())
}

/// Show the pending dialog and feed the user's choice back into it
fn render_dialog(dialog: &ConfirmDialog) -> Result<()> {
    let Some(view) = dialog.view() else {
        return Ok(());
    };
    let prompt = format!(
        "{} {} [{} / {}]",
        view.title.bold(),
        view.message,
        view.confirm_text,
        view.cancel_text
    );
    let confirmed = Confirm::new().with_prompt(prompt).default(false).interact()?;
    debug!("Dialog answered {}", confirmed);
    if confirmed {
        dialog.confirm();
    } else {
        dialog.cancel();
    }
    Ok(())
}

/// Run `work` behind a spinner rendering `overlay`
async fn with_loading<T, F>(overlay: LoadingOverlay, work: F) -> Result<T, PatAgentError>
where
    F: Future<Output = Result<T, PatAgentError>>,
{
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(overlay.message());
    if overlay.show_dots {
        spinner.enable_steady_tick(Duration::from_millis(100));
    }

    let result = work.await;
    spinner.finish_and_clear();
    result
}

fn print_timeline(timeline: &Timeline) {
    for (stage, status) in timeline.steps() {
        let line = stage.to_string();
        match status {
            StepStatus::Past => println!("  {} {}", "✔".green(), line.green()),
            StepStatus::Current => println!("  {} {}", "▶".cyan(), line.cyan().bold()),
            StepStatus::Future => println!("  {} {}", "○".dimmed(), line.dimmed()),
        }
    }
}

fn print_messages(messages: &[Interaction]) {
    if messages.is_empty() {
        println!("{}", "No messages.".dimmed());
        return;
    }
    for (i, message) in messages.iter().enumerate() {
        println!("{} {}", format!("[{}]", i).bold(), message.timestamp.dimmed());
        println!("  {} {}", "Q:".cyan(), message.question);
        println!("  {} {}", "A:".green(), message.answer);
        if !message.pat.is_empty() {
            println!("  {} {}", "PAT:".yellow(), message.pat);
        }
    }
}

fn report(result: pat_agent::Result<String>) -> Result<()> {
    match result {
        Ok(summary) => {
            println!("{} {}", "valid:".green().bold(), summary);
            Ok(())
        }
        Err(PatAgentError::ContractViolation { contract, summary }) => {
            println!("{} {}", format!("{} contract violated:", contract).red().bold(), summary);
            std::process::exit(1);
        }
        Err(e) => Err(e.into()),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}
