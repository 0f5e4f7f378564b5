mod commands;
mod config;
mod render;

use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{timer::format_clock, HttpInterviewApi, SessionController};
use commands::{CodeBuffer, Input};
use shared::domain::InterviewConfig;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(about = "Terminal client for a mock technical interview")]
struct Args {
    /// Interview server base URL. Overrides the config file and environment.
    #[arg(long)]
    server_url: Option<String>,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    company: String,
    #[arg(long, default_value = "SDE")]
    role: String,
    #[arg(long, default_value = "SDE1")]
    level: String,
    #[arg(long, default_value = "DSA")]
    round_type: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = config::load_settings(args.config.as_deref())?;
    if let Some(server_url) = args.server_url.clone() {
        settings.server_url = server_url;
    }

    let filter = EnvFilter::try_new(&settings.log_filter)
        .with_context(|| format!("invalid log filter '{}'", settings.log_filter))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let api = HttpInterviewApi::new(&settings.server_url)
        .with_context(|| format!("invalid server url '{}'", settings.server_url))?;
    tracing::info!(server = %api.base_url(), "using interview server");
    let controller = SessionController::new(Arc::new(api));
    tokio::spawn(render::run(controller.subscribe_events()));

    let interview = InterviewConfig::new(args.company, args.role, args.level, args.round_type);
    println!("{}", commands::HELP);
    if let Err(err) = controller.start(interview.clone()).await {
        println!("{}", commands::start_failed(&err));
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut code = CodeBuffer::default();

    while let Some(line) = lines.next_line().await? {
        if code.is_open() {
            match commands::parse_line(&line) {
                Input::EndCode => spawn_run(&controller, code.close()),
                _ => code.push(&line),
            }
            continue;
        }

        match commands::parse_line(&line) {
            Input::Empty => {}
            Input::Say(text) => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    if let Err(err) = controller.send(&text).await {
                        println!("{err}");
                    }
                });
            }
            Input::BeginCode => code.open(),
            Input::EndCode => println!("No code block is open."),
            Input::RunFile(path) => match tokio::fs::read_to_string(&path).await {
                Ok(source) => spawn_run(&controller, source),
                Err(err) => println!("Cannot read '{}': {err}", path.display()),
            },
            Input::Time => println!("Elapsed {}", format_clock(controller.elapsed_seconds())),
            Input::Evaluate => {
                // The scorecard itself arrives through the event stream.
                if let Err(err) = controller.evaluate().await {
                    println!("{err}");
                }
            }
            Input::Dismiss => {
                if let Some(notification) = controller.current_notification().await {
                    controller.dismiss_notification(notification.id).await;
                }
            }
            Input::New => {
                controller.reset().await;
                if let Err(err) = controller.start(interview.clone()).await {
                    println!("{}", commands::start_failed(&err));
                }
            }
            Input::Quit => break,
            Input::Help => println!("{}", commands::HELP),
            Input::Unknown(raw) => println!("Unknown command '{raw}'. Type :help."),
        }
    }

    controller.reset().await;
    Ok(())
}

fn spawn_run(controller: &Arc<SessionController>, source: String) {
    let controller = controller.clone();
    tokio::spawn(async move {
        if let Err(err) = controller.run_code(&source).await {
            println!("{err}");
        }
    });
}
