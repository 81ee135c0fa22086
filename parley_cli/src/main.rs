//! Interactive console for teaching and querying Parley dialogue rules.

use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use parley_dialogue::{
    DialogueRuntime, DialogueStore, DialogueTelemetry, EditOptions, InboundDisposition,
    MatchRequest, Messenger, NormalizeConfig, TeachRequest,
};
use shared_event_bus::FileEventPublisher;
use shared_logging::LogLevel;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Requester key used for the single console session.
const SESSION: &str = "console";

#[derive(Parser, Debug)]
#[command(name = "parley", version, about = "Teachable dialogue console")]
struct Cli {
    /// Names the bot answers to; stripped from questions before matching.
    #[arg(long = "bot-name", default_value = "Parley")]
    bot_names: Vec<String>,
    /// JSON snapshot of taught dialogues, loaded on start and saved on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Structured log file.
    #[arg(long)]
    log_path: Option<PathBuf>,
    /// JSON-lines event log.
    #[arg(long)]
    event_log: Option<PathBuf>,
}

/// Options of one `teach` line.
#[derive(Parser, Debug, Default)]
#[command(name = "teach", no_binary_name = true, disable_help_flag = true)]
struct TeachArgs {
    /// Question text.
    #[arg(short, long)]
    question: Option<String>,
    /// Answer text.
    #[arg(short, long)]
    answer: Option<String>,
    /// Suppress the question/answer confusion hint.
    #[arg(short, long)]
    ignore_hint: bool,
    /// Match the question as a pattern.
    #[arg(short = 'x', long)]
    regexp: bool,
    /// Force literal matching.
    #[arg(short = 'X', long)]
    no_regexp: bool,
    /// Redirect the answer to another dialogue.
    #[arg(long)]
    redirect: Option<String>,
    /// Anything unclaimed; surfaces the extra-arguments diagnostic.
    rest: Vec<String>,
}

/// Options of one `find` line.
#[derive(Parser, Debug, Default)]
#[command(name = "find", no_binary_name = true, disable_help_flag = true)]
struct FindArgs {
    /// Question text or pattern.
    #[arg(short, long)]
    question: Option<String>,
    /// Answer text or pattern.
    #[arg(short, long)]
    answer: Option<String>,
    /// Treat criteria as patterns.
    #[arg(short = 'x', long)]
    regexp: bool,
    /// Force literal comparison.
    #[arg(short = 'X', long)]
    no_regexp: bool,
}

/// Messenger printing outbound text to the console.
#[derive(Debug, Default)]
struct ConsoleMessenger;

#[async_trait]
impl Messenger for ConsoleMessenger {
    async fn send_text(&self, _session: &str, text: &str) -> Result<()> {
        println!("parley> {text}");
        Ok(())
    }
}

fn pattern_mode(regexp: bool, no_regexp: bool) -> Option<bool> {
    if no_regexp {
        Some(false)
    } else if regexp {
        Some(true)
    } else {
        None
    }
}

/// Returns the argument tail when the line invokes the given command.
fn command_rest<'a>(line: &'a str, command: &str) -> Option<&'a str> {
    let rest = line.strip_prefix(command)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

/// Splits a command line into tokens, honoring single and double quotes.
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    for c in line.chars() {
        match (quote, c) {
            (Some(q), _) if c == q => quote = None,
            (Some(_), _) => current.push(c),
            (None, '"' | '\'') => quote = Some(c),
            (None, _) if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            (None, _) => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Pulls leading `#id` tokens out of a token list, returning the parsed
/// targets. Extraction stops at the first other token so option values that
/// happen to look like ids stay untouched.
fn extract_targets(tokens: Vec<String>) -> (Vec<String>, Vec<u32>) {
    let mut rest = Vec::new();
    let mut targets = Vec::new();
    let mut leading = true;
    for token in tokens {
        if leading {
            if let Some(id) = token.strip_prefix('#').and_then(|id| id.parse::<u32>().ok()) {
                targets.push(id);
                continue;
            }
            leading = false;
        }
        rest.push(token);
    }
    (rest, targets)
}

fn teach_request(args: TeachArgs, targets: Vec<u32>) -> TeachRequest {
    TeachRequest {
        options: EditOptions {
            question: args.question,
            answer: args.answer,
            original: None,
            pattern_mode: pattern_mode(args.regexp, args.no_regexp),
            ignore_hint: args.ignore_hint,
            redirect: args.redirect,
        },
        targets,
        extra_args: args.rest,
    }
}

fn print_records(records: &[parley_dialogue::DialogueRecord]) {
    if records.is_empty() {
        println!("parley> no dialogues");
        return;
    }
    for record in records {
        let mode = if record.flags.is_pattern() { "pattern" } else { "literal" };
        println!(
            "parley> #{} [{}] {:?} -> {:?}",
            record.id, mode, record.original, record.answer
        );
    }
}

async fn run(cli: Cli) -> Result<()> {
    let store = match &cli.snapshot {
        Some(path) if path.exists() => DialogueStore::load(path)?,
        _ => DialogueStore::default(),
    };
    let config = NormalizeConfig {
        appellatives: cli.bot_names.clone(),
        ..NormalizeConfig::default()
    };
    let mut runtime = DialogueRuntime::with_store(store, config, Arc::new(ConsoleMessenger));

    if cli.log_path.is_some() || cli.event_log.is_some() {
        let mut builder = DialogueTelemetry::builder("parley_cli").min_level(LogLevel::Info);
        if let Some(path) = &cli.log_path {
            builder = builder.log_path(path);
        }
        if let Some(path) = &cli.event_log {
            builder = builder.event_publisher(Arc::new(FileEventPublisher::new(path)?));
        }
        runtime = runtime.with_telemetry(builder.build()?);
    }

    let stdin = tokio::io::stdin();
    let mut lines = BufReader::new(stdin).lines();
    while let Some(line) = lines.next_line().await? {
        // Continuations intercept the next message before any command
        // handling, so this comes first even for command-shaped lines.
        if let InboundDisposition::Resolved(_) = runtime.handle_message(SESSION, &line).await? {
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed == "quit" || trimmed == "exit" {
            break;
        }
        if trimmed == "dialogues" {
            print_records(&runtime.store().all());
            continue;
        }
        if let Some(rest) = command_rest(trimmed, "teach") {
            let (tokens, targets) = extract_targets(tokenize(rest));
            match TeachArgs::try_parse_from(tokens) {
                Ok(args) => {
                    runtime.teach(SESSION, teach_request(args, targets)).await?;
                }
                Err(err) => println!("parley> {err}"),
            }
            continue;
        }
        if let Some(rest) = command_rest(trimmed, "find") {
            match FindArgs::try_parse_from(tokenize(rest)) {
                Ok(args) => {
                    let request = MatchRequest {
                        pattern_mode: pattern_mode(args.regexp, args.no_regexp),
                        question: args.question.clone(),
                        original: args.question,
                        answer: args.answer,
                    };
                    print_records(&runtime.lookup(&request));
                }
                Err(err) => println!("parley> {err}"),
            }
            continue;
        }
        if let Some(answer) = runtime.reply(trimmed) {
            println!("parley> {answer}");
        }
    }

    if let Some(path) = &cli.snapshot {
        runtime.store().save(path)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    run(Cli::parse()).await
}
