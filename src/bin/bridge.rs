use clap::Parser;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use verse_core::config::ProgressConfig;
use verse_core::{FileStore, LocationStatus, ProgressEngine};

/// Line protocol bridge between a host UI and the progress engine
#[derive(Parser, Debug)]
#[command(name = "verse_bridge", version, about)]
struct Cli {
    /// State snapshot file
    #[arg(default_value = "verse_state.bin")]
    state_path: PathBuf,
}

// Line protocol for a host UI. Every command gets exactly one response line on
// stdout; logs go to stderr.
fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut engine = ProgressEngine::from_file_or_new(&cli.state_path, ProgressConfig::default());
    info!(state = %cli.state_path.display(), "bridge starting");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let input = line?;
        debug!(input = %input, "<-");
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.first() == Some(&"EXIT") {
            writeln!(stdout, "BYE")?;
            stdout.flush()?;
            break;
        }

        let response = handle_command(&parts, &mut engine);
        debug!(response = %response, "->");
        writeln!(stdout, "{}", response)?;
        stdout.flush()?;
    }

    info!("bridge shutting down");
    Ok(())
}

fn handle_command(parts: &[&str], engine: &mut ProgressEngine<FileStore>) -> String {
    match parts {
        ["CHAT", location, score] => match score.parse::<f64>() {
            Ok(score) => status_line(&engine.finish_chat(location, score)),
            Err(_) => error_line("score must be a number"),
        },
        ["CARDS", location] => status_line(&engine.review_flashcards(location, Vec::new())),
        ["CARDS", location, indices] => {
            let parsed: Result<Vec<u32>, _> = indices
                .split(',')
                .filter(|s| !s.is_empty())
                .map(str::parse::<u32>)
                .collect();
            match parsed {
                Ok(remembered) => status_line(&engine.review_flashcards(location, remembered)),
                Err(_) => error_line("card indices must be comma separated numbers"),
            }
        }
        ["LOCATION", location] => ack(engine.enter_location(location)),
        ["JOURNEY", journey] => ack(engine.select_journey(journey)),
        ["AVATAR", url] => ack(engine.user().update_avatar(url)),
        ["UNLOCKED", location] => {
            let decision = engine.evaluate_unlock(location);
            format!("UNLOCKED {} {}", location, decision.is_unlocked())
        }
        ["OVERVIEW", journey] => {
            let entries: Vec<String> = engine
                .location_overview(journey)
                .iter()
                .map(|s| format!("{}:{}:{}", s.location_id, s.percentage, s.unlock.is_unlocked()))
                .collect();
            format!("OVERVIEW {} {}", journey, entries.join(" "))
                .trim_end()
                .to_string()
        }
        _ => {
            warn!(?parts, "unknown command");
            error_line("unknown command")
        }
    }
}

fn status_line(status: &LocationStatus) -> String {
    format!(
        "STATUS {} {} {} {}",
        status.location_id,
        status.percentage,
        status.fully_completed,
        status.unlock.is_unlocked()
    )
}

fn ack(ok: bool) -> String {
    if ok {
        "OK".to_string()
    } else {
        error_line("not persisted")
    }
}

fn error_line(reason: &str) -> String {
    format!("ERR {}", reason)
}
