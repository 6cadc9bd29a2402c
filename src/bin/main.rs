use clap::Parser;
use crossterm::style::Stylize;
use std::io::{stdin, stdout, Write};
use std::path::PathBuf;
use tracing::{info, warn};
use verse_core::config::ProgressConfig;
use verse_core::core::types::{AvatarProfile, Gender, UserIdentity};
use verse_core::core::unlock::UnlockDecision;
use verse_core::{FileStore, LocationStatus, ProgressEngine};

/// Interactive English Verse progress console
#[derive(Parser, Debug)]
#[command(name = "verse_engine", version, about)]
struct Cli {
    /// State snapshot file
    #[arg(default_value = "verse_state.bin")]
    state_path: PathBuf,

    /// Progress config file (JSON); built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ProgressConfig::load(path)?,
        None => ProgressConfig::default(),
    };

    let mut engine = ProgressEngine::from_file_or_new(&cli.state_path, config);
    info!(state = %cli.state_path.display(), "English Verse console started");

    println!("{}", "English Verse progress console. Type 'help' for commands.".bold());
    println!("---------------------------------------------------------------");

    loop {
        print_header(&mut engine);
        print!("\n> ");
        stdout().flush()?;

        let mut input = String::new();
        if stdin().read_line(&mut input)? == 0 {
            break;
        }
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((&command, rest)) = parts.split_first() else {
            continue;
        };

        match (command, rest) {
            ("exit", _) => break,
            ("help", _) => print_help(),
            ("login", [name, email]) => {
                let identity = UserIdentity {
                    email: email.to_string(),
                    name: name.to_string(),
                    role: "A".to_string(),
                    avatar: String::new(),
                };
                report(engine.user().write(&identity), "logged in");
            }
            ("journey", [id]) => report(engine.select_journey(id), "journey selected"),
            ("go", [location]) => report(engine.enter_location(location), "location entered"),
            ("level", [level]) => match level.parse() {
                Ok(level) => report(engine.learner().set_level(level), "level set"),
                Err(_) => println!("{}", "level must be a number".red()),
            },
            ("chat", [location, score]) => match score.parse::<f64>() {
                Ok(score) => print_status(&engine.finish_chat(location, score)),
                Err(_) => println!("{}", "score must be a number".red()),
            },
            ("cards", [location, indices]) => match parse_indices(indices) {
                Some(remembered) => print_status(&engine.review_flashcards(location, remembered)),
                None => println!("{}", "cards are comma separated numbers, e.g. 0,1,2".red()),
            },
            ("face", [face, gender]) => {
                let gender = match *gender {
                    "female" => Gender::Female,
                    _ => Gender::Male,
                };
                let profile = AvatarProfile {
                    face: face.to_string(),
                    gender,
                    ..engine.avatar().read()
                };
                let saved = engine.avatar().write(&profile) && engine.user().sync_avatar_from_profile();
                report(saved, "avatar regenerated");
            }
            ("avatar", [url]) => report(engine.user().update_avatar(url), "avatar updated"),
            ("map", _) => print_map(&mut engine),
            _ => println!("{}", "unknown command, try 'help'".yellow()),
        }
    }

    info!("English Verse console stopped");
    Ok(())
}

fn parse_indices(raw: &str) -> Option<Vec<u32>> {
    raw.split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().parse().ok())
        .collect()
}

fn report(ok: bool, what: &str) {
    if ok {
        println!("{}", what.green());
    } else {
        warn!(what, "change was not saved");
        println!("{}", format!("{}: not saved", what).red());
    }
}

fn print_header(engine: &mut ProgressEngine<FileStore>) {
    let who = engine
        .user()
        .read()
        .map(|u| format!("{} ({})", u.name, u.avatar))
        .unwrap_or_else(|| "nobody logged in".to_string());
    let state = engine.workflow_state();
    let level = engine.learner().read().level;
    println!(
        "\nLearner: {} | level {} | at {}",
        who.cyan(),
        level,
        state.current_location.as_deref().unwrap_or("-")
    );
}

fn print_status(status: &LocationStatus) {
    let line = format!("{} ({}): {}%", status.name, status.location_id, status.percentage);
    if status.fully_completed {
        println!("{}", line.green().bold());
    } else {
        println!("{}", line);
    }
}

fn print_map(engine: &mut ProgressEngine<FileStore>) {
    let Some(journey_id) = engine.learner().selected_journey() else {
        println!("{}", "no journey selected, use 'journey <id>'".yellow());
        return;
    };
    for status in engine.location_overview(&journey_id) {
        let lock = match &status.unlock {
            UnlockDecision::Completed => "done".to_string().green(),
            UnlockDecision::Open => "open".to_string().cyan(),
            UnlockDecision::LevelTooLow { required, .. } => format!("level {}", required).red(),
            UnlockDecision::AwaitingPrerequisite(p) => format!("after {}", p).yellow(),
        };
        println!("  {:<14} {:>3}%  {}", status.location_id, status.percentage, lock);
    }
}

fn print_help() {
    println!("Commands:");
    println!("  login <name> <email>     journey <id>        go <location>");
    println!("  chat <location> <score>  cards <location> 0,1,2");
    println!("  face <face> <gender>     avatar <url>        level <n>");
    println!("  map                      exit");
}
