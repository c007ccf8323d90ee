//! Command-line front-end for the word store.
//!
//! # Responsibility
//! - Parse commands and forward them to `WordStore`.
//! - Render words as plain text or JSON.
//!
//! # Invariants
//! - All persistence rules live in `wordspreader_core`; this binary only maps
//!   arguments to store calls.
//! - Logging is enabled only when `--log-dir` is given.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;
use wordspreader_core::{
    core_version, default_log_level, init_logging, FieldUpdate, RepoResult, Word, WordStore,
    WordUpdate,
};

const DEFAULT_DB_FILE_NAME: &str = "wordspreader.sqlite3";

#[derive(Parser, Debug)]
#[command(name = "wordspreader", version, about = "Keep named text snippets with tags")]
struct Cli {
    /// SQLite database file
    #[arg(long, env = "WORDSPREADER_DB", default_value = DEFAULT_DB_FILE_NAME)]
    db: PathBuf,

    /// Absolute directory for rolling log files
    #[arg(long, env = "WORDSPREADER_LOG_DIR")]
    log_dir: Option<String>,

    /// trace|debug|info|warn|error
    #[arg(long, env = "WORDSPREADER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Create a new word
    Add {
        name: String,
        #[arg(default_value = "")]
        content: String,
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },
    /// Show one word
    Show { name: String },
    /// List words, optionally only those carrying a tag
    List {
        #[arg(long)]
        tag: Option<String>,
    },
    /// List every tag in use
    Tags,
    /// Change content, tags and/or name of a word
    Edit(EditArgs),
    /// Rename a word
    Rename { old_name: String, new_name: String },
    /// Delete a word
    Rm { name: String },
    /// Find words whose name matches a LIKE pattern (`%`, `_`)
    Search { pattern: String },
    /// Print the core version
    Version,
}

#[derive(Args, Debug, PartialEq, Eq)]
struct EditArgs {
    name: String,
    /// Replace content
    #[arg(long, conflicts_with = "clear_content")]
    content: Option<String>,
    /// Set content to an empty string
    #[arg(long)]
    clear_content: bool,
    /// Replace the tag set (repeatable)
    #[arg(short, long = "tag", conflicts_with = "clear_tags")]
    tags: Vec<String>,
    /// Remove every tag
    #[arg(long)]
    clear_tags: bool,
    /// New name, applied after content and tags
    #[arg(long)]
    rename: Option<String>,
}

impl EditArgs {
    fn into_update(self) -> (String, WordUpdate) {
        let content = if self.clear_content {
            FieldUpdate::Clear
        } else {
            FieldUpdate::from(self.content)
        };
        let tags = if self.clear_tags {
            FieldUpdate::Clear
        } else if self.tags.is_empty() {
            FieldUpdate::Keep
        } else {
            FieldUpdate::Set(self.tags.into_iter().collect())
        };
        let update = WordUpdate {
            content,
            tags,
            new_name: self.rename,
        };
        (self.name, update)
    }
}

fn main() {
    let cli = Cli::parse();
    if let Err(err) = start(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn start(cli: Cli) -> Result<()> {
    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).map_err(anyhow::Error::msg)?;
    }

    if cli.command == Command::Version {
        println!("wordspreader_core version={}", core_version());
        return Ok(());
    }

    let mut store = WordStore::open(&cli.db)
        .with_context(|| format!("failed to open word database `{}`", cli.db.display()))?;
    info!("event=cli_start module=cli status=ok");

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli.command, cli.json, &mut store, &mut out)
}

fn run(command: Command, json: bool, store: &mut WordStore, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Add {
            name,
            content,
            tags,
        } => {
            let word = store.create(name, content, tags)?;
            print_word(out, &word, json)?;
        }
        Command::Show { name } => match store.fetch(&name)? {
            Some(word) => print_word(out, &word, json)?,
            None => bail!("word not found: `{name}`"),
        },
        Command::List { tag } => {
            let words = store.list(tag.as_deref()).collect::<RepoResult<Vec<_>>>()?;
            print_words(out, &words, json)?;
        }
        Command::Tags => {
            let tags = store.all_tag_names().collect::<RepoResult<Vec<_>>>()?;
            if json {
                writeln!(out, "{}", serde_json::to_string(&tags)?)?;
            } else {
                for tag in tags {
                    writeln!(out, "{tag}")?;
                }
            }
        }
        Command::Edit(args) => {
            let (name, update) = args.into_update();
            let final_name = update.new_name.clone().unwrap_or_else(|| name.clone());
            store.update(&name, update)?;
            if let Some(word) = store.fetch(&final_name)? {
                print_word(out, &word, json)?;
            }
        }
        Command::Rename { old_name, new_name } => {
            store.rename(&old_name, &new_name)?;
            writeln!(out, "renamed `{old_name}` to `{new_name}`")?;
        }
        Command::Rm { name } => {
            store.delete(&name)?;
            writeln!(out, "deleted `{name}`")?;
        }
        Command::Search { pattern } => {
            let words = store.search(&pattern)?;
            print_words(out, &words, json)?;
        }
        Command::Version => {
            writeln!(out, "wordspreader_core version={}", core_version())?;
        }
    }
    Ok(())
}

fn print_word(out: &mut impl Write, word: &Word, json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(word)?)?;
        return Ok(());
    }

    writeln!(out, "{}{}", word.name, format_tags(word))?;
    if !word.content.is_empty() {
        writeln!(out, "{}", word.content)?;
    }
    Ok(())
}

fn print_words(out: &mut impl Write, words: &[Word], json: bool) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(words)?)?;
        return Ok(());
    }

    for word in words {
        writeln!(out, "{}{}", word.name, format_tags(word))?;
    }
    Ok(())
}

fn format_tags(word: &Word) -> String {
    if word.tags.is_empty() {
        return String::new();
    }
    let joined = word.tags.iter().cloned().collect::<Vec<_>>().join(", ");
    format!(" [{joined}]")
}
