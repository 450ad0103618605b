// Class Deck CLI
// Student client for a running deck, plus end-to-end validation scenarios

use clap::{Parser, Subcommand};
use colored::*;
use std::io::{self, Write};
use tokio::time::{sleep, Duration};

use class_deck::activity::{place, Container, SentimentAnalyzer, Thought, ThoughtClock};
use class_deck::peer::{ClassResult, ResultRow, RoomCode, StatusLevel, StudentClient, StudentUpdate};
use class_deck::quiz::DEFAULT_QUESTION_COUNT;

const WAIT: Duration = Duration::from_secs(5);

#[derive(Parser)]
#[command(name = "deck-cli")]
#[command(about = "Class Deck student and validation tool", long_about = None)]
struct Cli {
    /// Host address (default: 127.0.0.1:8080)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the host health endpoint
    Health,

    /// Show room code, join link and question count
    Config,

    /// Show the class quiz statistics
    Stats,

    /// Score a thought locally and preview its bubble
    Analyze {
        /// Text to score
        #[arg(short, long)]
        text: String,

        /// Container width (0 uses the default)
        #[arg(long, default_value_t = 0.0)]
        width: f64,

        /// Container height (0 uses the default)
        #[arg(long, default_value_t = 0.0)]
        height: f64,
    },

    /// Send a thought to a room as a student
    Thought {
        /// Room code shown on the deck
        #[arg(short, long)]
        room: String,

        /// Thought text
        #[arg(short, long)]
        text: String,
    },

    /// Answer a quiz question as a student
    Quiz {
        /// Room code shown on the deck
        #[arg(short, long)]
        room: String,

        /// Question number
        #[arg(short, long)]
        question: u32,

        /// Chosen option, e.g. B
        #[arg(short, long)]
        answer: String,

        /// Number of questions in the results table
        #[arg(long, default_value_t = DEFAULT_QUESTION_COUNT)]
        questions: u32,
    },

    /// Run automated validation scenarios against a running host
    Validate {
        /// Run all validation tests
        #[arg(short, long)]
        all: bool,

        /// Test specific scenario
        #[arg(short = 'n', long)]
        scenario: Option<String>,
    },

    /// Interactive mode - join a room and type commands
    Interactive {
        /// Room code shown on the deck
        #[arg(short, long)]
        room: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Health => {
            check_health(&cli.server).await;
        }
        Commands::Config => {
            check_config(&cli.server).await;
        }
        Commands::Stats => {
            show_stats(&cli.server).await;
        }
        Commands::Analyze { text, width, height } => {
            analyze(text, *width, *height);
        }
        Commands::Thought { room, text } => {
            if let Some(room) = parse_room(room) {
                send_thought(&cli.server, room, text).await;
            }
        }
        Commands::Quiz {
            room,
            question,
            answer,
            questions,
        } => {
            if let Some(room) = parse_room(room) {
                answer_question(&cli.server, room, *question, answer, *questions).await;
            }
        }
        Commands::Validate { all, scenario } => {
            if *all {
                run_all_validations(&cli.server).await;
            } else if let Some(s) = scenario {
                run_scenario(&cli.server, s).await;
            } else {
                println!("{}", "Use --all or --scenario <name>".yellow());
                list_scenarios();
            }
        }
        Commands::Interactive { room } => {
            if let Some(room) = parse_room(room) {
                interactive_mode(&cli.server, room).await;
            }
        }
    }
}

fn parse_room(raw: &str) -> Option<RoomCode> {
    match raw.parse() {
        Ok(room) => Some(room),
        Err(e) => {
            println!("{} {}", "✗".red(), e);
            None
        }
    }
}

async fn fetch_json(server: &str, path: &str) -> Result<serde_json::Value, String> {
    let url = format!("http://{}{}", server, path);
    let resp = reqwest::get(&url).await.map_err(|e| e.to_string())?;
    if !resp.status().is_success() {
        return Err(format!("{} returned {}", path, resp.status()));
    }
    resp.json::<serde_json::Value>().await.map_err(|e| e.to_string())
}

async fn check_health(server: &str) {
    println!("{}", "Checking deck health...".cyan());

    match fetch_json(server, "/deck/health").await {
        Ok(body) => {
            println!("{} Health check passed", "✓".green());
            println!("  Status: {}", body["status"].as_str().unwrap_or("unknown"));
            println!("  Service: {}", body["service"].as_str().unwrap_or("unknown"));
            println!("  Version: {}", body["version"].as_str().unwrap_or("unknown"));
        }
        Err(e) => {
            println!("{} Health check failed: {}", "✗".red(), e);
            println!("  Make sure the deck is running on {}", server);
        }
    }
}

async fn check_config(server: &str) {
    println!("{}", "Fetching room configuration...".cyan());

    match fetch_json(server, "/deck/config").await {
        Ok(body) => {
            println!("{} Config endpoint accessible", "✓".green());
            println!("\n{}", "═".repeat(50).green());
            println!(
                "{} {}",
                "Room Code:".bold(),
                body["room_code"].as_str().unwrap_or("unknown").green().bold()
            );
            println!("{}", "═".repeat(50).green());
            println!("  Join link: {}", body["join_link"].as_str().unwrap_or("-"));
            println!("  Host peer: {}", body["host_peer_id"].as_str().unwrap_or("-"));
            println!("  Questions: {}", body["question_count"]);
            println!("  Students:  {}", body["students"]);
        }
        Err(e) => {
            println!("{} Cannot fetch config: {}", "✗".red(), e);
        }
    }
}

async fn show_stats(server: &str) {
    println!("{}", "Fetching quiz statistics...".cyan());

    match fetch_json(server, "/deck/stats").await {
        Ok(body) => match serde_json::to_string_pretty(&body) {
            Ok(pretty) => println!("{}", pretty),
            Err(_) => println!("{}", body),
        },
        Err(e) => {
            println!("{} Cannot fetch stats: {}", "✗".red(), e);
        }
    }
}

fn analyze(text: &str, width: f64, height: f64) {
    let analyzer = SentimentAnalyzer::new();
    let clock = ThoughtClock::new();

    let Some(thought) = Thought::compose(text, &analyzer, &clock) else {
        println!("{} Nothing to analyze", "✗".yellow());
        return;
    };

    let container = Container::new(width, height);
    let bubble = place(&thought, container);

    println!("  Score: {}", thought.score.to_string().bold());
    println!("  Tone:  {:?} ({})", bubble.tone, bubble.color);
    println!(
        "  Bubble: {:.0}px at ({:.1}, {:.1}) in {}x{}, delay {:.2}s",
        bubble.size, bubble.x, bubble.y, container.width, container.height, bubble.animation_delay_secs
    );
}

/// Connect and wait for the first stats update, so the class view is populated
async fn join(server: &str, room: RoomCode, questions: u32) -> Option<StudentClient> {
    println!("{} Connecting to Room: {}...", "▶".cyan(), room);
    let mut client = StudentClient::connect(server, room, questions);

    match client
        .wait_for(WAIT, |u| {
            matches!(u, StudentUpdate::Connected { .. } | StudentUpdate::Failed(_))
        })
        .await
    {
        Some(StudentUpdate::Connected { .. }) => {
            println!("{} Connected to Host!", "✓".green());
            Some(client)
        }
        Some(StudentUpdate::Failed(status)) => {
            println!("{} {}", "✗".red(), status);
            None
        }
        _ => {
            println!("{} Timeout waiting for host", "✗".red());
            None
        }
    }
}

async fn send_thought(server: &str, room: RoomCode, text: &str) -> bool {
    let Some(client) = join(server, room, DEFAULT_QUESTION_COUNT).await else {
        return false;
    };

    let sent = client.session().lock().await.submit_thought(text);
    match &sent {
        Some(thought) => println!("{} Thought sent (score {})", "✓".green(), thought.score),
        None => println!("{} Thought text is empty", "✗".yellow()),
    }

    client.close().await;
    sent.is_some()
}

async fn answer_question(server: &str, room: RoomCode, question: u32, answer: &str, questions: u32) -> bool {
    let Some(mut client) = join(server, room, questions).await else {
        return false;
    };

    let session = client.session();
    let has_key = session.lock().await.answer_key().is_some();
    if !has_key
        && client
            .wait_for(WAIT, |u| matches!(u, StudentUpdate::QuizConfigured))
            .await
            .is_none()
    {
        println!("{} No answer key from host, answer will count as incorrect", "○".yellow());
    }

    let option = answer.trim().to_uppercase();
    let correct = session.lock().await.submit_answer(question, &option);
    if correct {
        println!("{} Q{}: {} is correct", "✓".green(), question, option);
    } else {
        println!("{} Q{}: {} is incorrect", "✗".red(), question, option);
    }

    if client
        .wait_for(WAIT, |u| matches!(u, StudentUpdate::StatsUpdated))
        .await
        .is_none()
    {
        println!("{} No stats update received", "○".yellow());
    }

    print_results(&session.lock().await.results());
    client.close().await;
    true
}

fn print_results(rows: &[ResultRow]) {
    println!("\n{}", "Your Results".bold());
    println!("{}", "─".repeat(40));
    println!("{:<10}{:<10}{}", "Question", "You", "Class");
    for row in rows {
        let mine = match row.mine {
            Some(true) => "✓".green(),
            Some(false) => "✗".red(),
            None => "-".normal(),
        };
        let class = match row.class {
            ClassResult::PercentCorrect(percent) => format!("{}% Correct", percent),
            ClassResult::NoData => "No Data".to_string(),
            ClassResult::Unknown => "-".to_string(),
        };
        println!("{:<10}{:<10}{}", format!("Q{}", row.question), mine, class);
    }
}

fn list_scenarios() {
    println!("\n{}", "Available Validation Scenarios:".bold());
    println!("  {} - Health endpoint responds", "health".cyan());
    println!("  {} - Student joins the configured room", "join-room".cyan());
    println!("  {} - Joining an unknown room reports host not found", "invalid-room".cyan());
    println!("  {} - Thought reaches the host's thought list", "thought".cyan());
    println!("  {} - Quiz answer is counted in class stats", "quiz".cyan());
    println!("\nExample: deck-cli validate --scenario join-room");
}

async fn run_scenario(server: &str, scenario: &str) -> bool {
    println!("\n{} {}", "Running scenario:".bold(), scenario.cyan());
    println!("{}", "─".repeat(60));

    let result = match scenario {
        "health" => validate_health(server).await,
        "join-room" => validate_join_room(server).await,
        "invalid-room" => validate_invalid_room(server).await,
        "thought" => validate_thought(server).await,
        "quiz" => validate_quiz(server).await,
        _ => {
            println!("{} Unknown scenario: {}", "✗".red(), scenario);
            list_scenarios();
            return false;
        }
    };

    if result {
        println!("\n{} Scenario passed", "✓".green().bold());
    } else {
        println!("\n{} Scenario failed", "✗".red().bold());
    }
    result
}

async fn run_all_validations(server: &str) {
    println!("\n{}", "Running All Validation Tests".bold().green());
    println!("{}\n", "═".repeat(60).green());

    let scenarios = ["health", "join-room", "invalid-room", "thought", "quiz"];

    let mut passed = 0;
    let mut failed = 0;

    for scenario in scenarios {
        if run_scenario(server, scenario).await {
            passed += 1;
        } else {
            failed += 1;
        }
        sleep(Duration::from_millis(300)).await;
    }

    println!("\n{}", "═".repeat(60).green());
    println!("{}", "Validation Summary".bold());
    println!("{}", "═".repeat(60).green());
    println!("  {} Passed: {}", "✓".green(), passed.to_string().green());
    println!("  {} Failed: {}", "✗".red(), failed.to_string().red());
    println!("  Total: {}", passed + failed);

    if failed == 0 {
        println!("\n{}", "All validations passed!".green().bold());
    } else {
        println!("\n{}", "Some validations failed. Check output above.".yellow());
    }
}

async fn host_room(server: &str) -> Option<RoomCode> {
    let body = match fetch_json(server, "/deck/config").await {
        Ok(body) => body,
        Err(e) => {
            println!("{} Cannot fetch config: {}", "✗".red(), e);
            return None;
        }
    };
    body["room_code"].as_str().and_then(|code| code.parse().ok())
}

async fn validate_health(server: &str) -> bool {
    match fetch_json(server, "/deck/health").await {
        Ok(body) if body["status"] == "healthy" => {
            println!("{} Deck is healthy", "✓".green());
            true
        }
        Ok(body) => {
            println!("{} Unexpected health response: {}", "✗".red(), body);
            false
        }
        Err(e) => {
            println!("{} Health check failed: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_join_room(server: &str) -> bool {
    let Some(room) = host_room(server).await else {
        return false;
    };
    let Some(mut client) = join(server, room, DEFAULT_QUESTION_COUNT).await else {
        return false;
    };

    let configured = client
        .wait_for(WAIT, |u| matches!(u, StudentUpdate::QuizConfigured))
        .await
        .is_some();
    let has_stats = client.session().lock().await.class_stats().is_some();
    client.close().await;

    if has_stats && configured {
        println!("{} Received class stats and answer key", "✓".green());
        true
    } else {
        println!("{} Missing initial stats or answer key", "✗".red());
        false
    }
}

async fn validate_invalid_room(server: &str) -> bool {
    let Some(room) = host_room(server).await else {
        return false;
    };
    // any code other than the host's own is unknown
    let other = if room.as_str() == "ZZZZ" { "YYYY" } else { "ZZZZ" };
    println!("  Attempting to join room {}...", other);

    let Ok(other) = other.parse::<RoomCode>() else {
        return false;
    };
    let mut client = StudentClient::connect(server, other, DEFAULT_QUESTION_COUNT);
    let update = client
        .wait_for(WAIT, |u| matches!(u, StudentUpdate::Failed(_)))
        .await;

    match update {
        Some(StudentUpdate::Failed(status)) if status.message.starts_with("Host not found") => {
            println!("{} {}", "✓".green(), status);
            true
        }
        Some(StudentUpdate::Failed(status)) => {
            println!("{} Unexpected failure: {}", "✗".red(), status);
            false
        }
        _ => {
            println!("{} Joining an unknown room did not fail", "✗".red());
            false
        }
    }
}

async fn validate_thought(server: &str) -> bool {
    let Some(room) = host_room(server).await else {
        return false;
    };
    let marker = format!("validation thought {}", rand::random::<u32>());
    if !send_thought(server, room, &marker).await {
        return false;
    }

    sleep(Duration::from_millis(300)).await;
    match fetch_json(server, "/deck/thoughts").await {
        Ok(body) => {
            let found = body
                .as_array()
                .map(|thoughts| thoughts.iter().any(|t| t["text"] == marker.as_str()))
                .unwrap_or(false);
            if found {
                println!("{} Thought stored by host", "✓".green());
            } else {
                println!("{} Thought not found on host", "✗".red());
            }
            found
        }
        Err(e) => {
            println!("{} Cannot fetch thoughts: {}", "✗".red(), e);
            false
        }
    }
}

async fn validate_quiz(server: &str) -> bool {
    let Some(room) = host_room(server).await else {
        return false;
    };
    let before = match fetch_json(server, "/deck/stats").await {
        Ok(body) => body["total"]["correct"].as_u64().unwrap_or(0) + body["total"]["incorrect"].as_u64().unwrap_or(0),
        Err(e) => {
            println!("{} Cannot fetch stats: {}", "✗".red(), e);
            return false;
        }
    };

    if !answer_question(server, room, 1, "A", DEFAULT_QUESTION_COUNT).await {
        return false;
    }

    match fetch_json(server, "/deck/stats").await {
        Ok(body) => {
            let after = body["total"]["correct"].as_u64().unwrap_or(0)
                + body["total"]["incorrect"].as_u64().unwrap_or(0);
            if after == before + 1 {
                println!("{} Answer counted ({} -> {})", "✓".green(), before, after);
                true
            } else {
                println!("{} Expected {} answers, host has {}", "✗".red(), before + 1, after);
                false
            }
        }
        Err(e) => {
            println!("{} Cannot fetch stats: {}", "✗".red(), e);
            false
        }
    }
}

async fn interactive_mode(server: &str, room: RoomCode) {
    println!("\n{}", "Interactive Mode".bold().green());
    println!("{}", "═".repeat(60).green());
    println!("Type {} for help, {} to quit\n", "help".cyan(), "quit".cyan());

    let mut client = StudentClient::connect(server, room, DEFAULT_QUESTION_COUNT);
    let session = client.session();

    // Spawn task to report updates from the host
    let receive_task = tokio::spawn(async move {
        while let Some(update) = client.next_update().await {
            match update {
                StudentUpdate::Connected { flushed } => {
                    println!("\n{} Connected to Host! ({} queued sent)", "◀".green(), flushed)
                }
                StudentUpdate::StatsUpdated => println!("\n{} Class stats updated", "◀".green()),
                StudentUpdate::QuizConfigured => println!("\n{} Answer key received", "◀".green()),
                StudentUpdate::Disconnected => println!("\n{} Disconnected", "◀".yellow()),
                StudentUpdate::Failed(status) => println!("\n{} {}", "◀".red(), status),
                StudentUpdate::Ignored => {}
            }
        }
    });

    loop {
        print!("{} ", "►".cyan());
        if io::stdout().flush().is_err() {
            break;
        }

        let mut input = String::new();
        if io::stdin().read_line(&mut input).is_err() {
            break;
        }

        let input = input.trim();
        if input.is_empty() {
            continue;
        }

        let (command, rest) = input.split_once(' ').unwrap_or((input, ""));
        match command {
            "quit" | "exit" => {
                println!("Goodbye!");
                break;
            }
            "help" => print_interactive_help(),
            "status" => {
                let session = session.lock().await;
                let status = session.status();
                let marker = match status.level {
                    StatusLevel::Success => "✓".green(),
                    StatusLevel::Error => "✗".red(),
                    StatusLevel::Info => "○".cyan(),
                };
                println!("{} {} ({} queued)", marker, status, session.pending());
            }
            "thought" => match session.lock().await.submit_thought(rest) {
                Some(thought) => println!("{} Thought submitted (score {})", "✓".green(), thought.score),
                None => println!("{} Usage: thought <text>", "✗".yellow()),
            },
            "answer" => {
                let mut parts = rest.split_whitespace();
                let question = parts.next().and_then(|q| q.parse::<u32>().ok());
                match (question, parts.next()) {
                    (Some(question), Some(option)) => {
                        let option = option.to_uppercase();
                        if session.lock().await.submit_answer(question, &option) {
                            println!("{} Q{}: correct", "✓".green(), question);
                        } else {
                            println!("{} Q{}: incorrect", "✗".red(), question);
                        }
                    }
                    _ => println!("{} Usage: answer <question> <option>", "✗".yellow()),
                }
            }
            "results" => print_results(&session.lock().await.results()),
            _ => println!("{} Unknown command. Type 'help' for the list.", "✗".yellow()),
        }
    }

    receive_task.abort();
}

fn print_interactive_help() {
    println!("\n{}", "Interactive Mode Commands".bold());
    println!("{}", "─".repeat(60));
    println!("  {} <text>              send a thought", "thought".cyan());
    println!("  {} <question> <option>  answer a quiz question", "answer".cyan());
    println!("  {}                    your answers next to the class", "results".cyan());
    println!("  {}                     connection status", "status".cyan());
    println!("  {}                       leave the room", "quit".cyan());
    println!();
}
