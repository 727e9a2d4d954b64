//! Terminal player for quiz-night-back: polls the server, renders the current
//! screen and sends answers typed on stdin.

use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::Context;
use clap::Parser;
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{mpsc, oneshot},
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_night_back::{
    client::{
        api::HttpQuizApi,
        poller::{ClientState, Command, ConnectionStatus, PlayerClient, SubmitOutcome},
        reconciler::{PlayerView, Screen},
        store::LocalStore,
    },
    state::game::Choice,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Base URL of the quiz server
    #[arg(short = 's', long, default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Poll interval in milliseconds
    #[arg(short = 'i', long, default_value = "2000")]
    poll_interval_ms: u64,

    /// Request timeout in milliseconds; slower responses count as a lost connection
    #[arg(short = 't', long, default_value = "5000")]
    timeout_ms: u64,

    /// File keeping the player id and cached answers between runs
    #[arg(short = 'c', long, default_value = ".quiz-player.json")]
    cache: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let period = Duration::from_millis(args.poll_interval_ms.max(100));
    let request_timeout = Duration::from_millis(args.timeout_ms.max(100));

    let store = LocalStore::load(&args.cache)
        .with_context(|| format!("reading cache {}", args.cache.display()))?;
    let api = Arc::new(HttpQuizApi::new(&args.server, request_timeout)?);
    let client = PlayerClient::new(api, store, Some(args.cache.clone()))
        .with_request_timeout(request_timeout);
    let mut updates = client.subscribe();

    info!(server = %args.server, ?period, ?request_timeout, "starting player");
    println!("Type A, B, C or D to answer, r to refresh, q to quit.");

    let (commands, rx) = mpsc::channel(16);
    let poller = tokio::spawn(client.run(period, rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = updates.borrow_and_update().clone();
                println!("{}", render(&state));
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break;
                };
                match line.trim() {
                    "q" => break,
                    "r" => {
                        let _ = commands.send(Command::Foreground).await;
                    }
                    other => match Choice::from_str(&other.to_ascii_uppercase()) {
                        Ok(choice) => submit(&commands, choice).await,
                        Err(err) => println!("{err}"),
                    },
                }
            }
        }
    }

    drop(commands);
    let _ = poller.await;
    Ok(())
}

async fn submit(commands: &mpsc::Sender<Command>, choice: Choice) {
    let (reply, outcome) = oneshot::channel();
    if commands
        .send(Command::Submit { choice, reply })
        .await
        .is_err()
    {
        return;
    }
    match outcome.await {
        Ok(Ok(SubmitOutcome::Accepted(choice))) => println!("Answer {choice} submitted."),
        Ok(Ok(SubmitOutcome::AlreadyChosen(choice))) => {
            println!("You already answered {choice}.")
        }
        Ok(Err(err)) => println!("Could not submit: {err}"),
        Err(_) => {}
    }
}

fn render(state: &ClientState) -> String {
    let banner = match state.connection {
        ConnectionStatus::Connected => "",
        ConnectionStatus::ConnectionLost => "[connection lost, retrying...]\n",
        ConnectionStatus::Offline => "[offline, waiting for connection...]\n",
    };
    let body = match &state.view {
        None => "Connecting...".to_string(),
        Some(view) => render_view(view),
    };
    format!("{banner}{body}")
}

fn render_view(view: &PlayerView) -> String {
    let progress = format!("Question {}/{}", view.question_number, view.total_questions);
    match &view.screen {
        Screen::NoQuestions => {
            "No trivia game available yet. Ask the moderator to set up questions.".into()
        }
        Screen::Waiting => "Waiting for the game to start...".into(),
        Screen::Lobby => "Game is active. Waiting for the first question...".into(),
        Screen::Question {
            question,
            selected,
            answered_elsewhere,
            ..
        } => {
            let mut out = format!("{progress}\n{}\n", question.text);
            for choice in Choice::ALL {
                let marker = if *selected == Some(choice) { '>' } else { ' ' };
                out.push_str(&format!("{marker} {choice}. {}\n", question.options.get(choice)));
            }
            if *answered_elsewhere {
                out.push_str("You have already answered this question.\n");
            }
            out
        }
        Screen::Results {
            question,
            correct,
            tally,
            selected,
        } => {
            let mut out = format!("{progress}\n{}\n", question.text);
            for choice in Choice::ALL {
                let mark = match (choice == *correct, *selected == Some(choice)) {
                    (true, _) => "correct",
                    (false, true) => "your answer",
                    _ => "",
                };
                out.push_str(&format!(
                    "  {choice}. {} - {} players {mark}\n",
                    question.options.get(choice),
                    tally.count(choice)
                ));
            }
            out.push_str(&format!("Your score: {}/{}\n", view.score, view.total_questions));
            out
        }
        Screen::Final => format!(
            "Game over! Your final score: {}/{}. Thanks for playing!",
            view.score, view.total_questions
        ),
    }
}
