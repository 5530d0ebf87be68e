use std::io;
use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use taskdeck::commands::*;
use taskdeck::config::Config;
use taskdeck::models::{Frequency, Priority, TaskFilter, Theme};
use taskdeck::storage::{FileStore, Storage};
use taskdeck::tasks::TaskRepository;
use taskdeck::theme::ThemeService;
use taskdeck::Result;

#[derive(Parser)]
#[command(name = "taskdeck", version)]
#[command(about = "Task manager with tags, subtasks and recurring tasks", long_about = None)]
struct Cli {
    /// Directory holding the JSON data files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Skip generating due recurring tasks before running the command
    #[arg(long, global = true)]
    no_auto: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[arg(short, long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        /// Category, "General" if omitted
        #[arg(short, long)]
        category: Option<String>,
        /// Due date, YYYY-MM-DD or a full ISO 8601 timestamp
        #[arg(short, long)]
        due: Option<String>,
    },
    /// List tasks
    List {
        /// Case-insensitive title search
        #[arg(short, long, default_value = "")]
        search: String,
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<String>,
        /// Only tasks carrying this tag
        #[arg(short, long)]
        tag: Option<String>,
        /// Only active recurring tasks
        #[arg(long)]
        recurring: bool,
        #[arg(long, value_enum, default_value_t = SortKey::Created)]
        sort: SortKey,
    },
    /// Show every field of a task
    Show { id: u64 },
    /// Edit a task
    Edit {
        id: u64,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short, long, value_enum)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, conflicts_with = "clear_due")]
        due: Option<String>,
        /// Remove the due date
        #[arg(long)]
        clear_due: bool,
    },
    /// Flip a task between done and pending
    Toggle { id: u64 },
    /// Remove a task
    Remove { id: u64 },
    /// Show task counts
    Stats,
    /// List categories in use
    Categories,
    /// Manage tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },
    /// Manage a task's checklist
    Subtask {
        #[command(subcommand)]
        command: SubtaskCommands,
    },
    /// Manage a task's notes
    Notes {
        #[command(subcommand)]
        command: NotesCommands,
    },
    /// Turn reminders on or off for a task
    Remind {
        id: u64,
        #[arg(value_parser = ["on", "off"])]
        state: String,
    },
    /// Manage recurring tasks
    Recur {
        #[command(subcommand)]
        command: RecurCommands,
    },
    /// Show or change the colour theme
    Theme {
        #[command(subcommand)]
        command: ThemeCommands,
    },
    /// Reset storage (delete all tasks and settings)
    Reset {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// List all tags
    List,
    /// Show how many tasks use each tag
    Stats,
    /// Add a tag to a task
    Add { id: u64, tag: String },
    /// Remove a tag from a task
    Remove { id: u64, tag: String },
    /// Replace a task's tags with a comma-separated list
    Set { id: u64, tags: String },
    /// List tasks carrying a tag
    Find { tag: String },
}

#[derive(Subcommand)]
enum SubtaskCommands {
    /// Add a subtask
    Add { id: u64, title: String },
    /// Check or uncheck a subtask
    Toggle { id: u64, subtask_id: String },
    /// Remove a subtask
    Remove { id: u64, subtask_id: String },
    /// Rename a subtask
    Rename { id: u64, subtask_id: String, title: String },
    /// Show checklist progress
    Stats { id: u64 },
}

#[derive(Subcommand)]
enum NotesCommands {
    /// Replace a task's notes
    Set { id: u64, notes: String },
    /// Print a task's notes
    Show { id: u64 },
    /// Remove a task's notes
    Clear { id: u64 },
}

#[derive(Subcommand)]
enum RecurCommands {
    /// Make a task recurring
    Set {
        id: u64,
        #[arg(value_enum)]
        frequency: Frequency,
    },
    /// Stop a task from recurring
    Stop { id: u64 },
    /// List recurring tasks
    List,
    /// Print the due date following a date
    Next {
        from: String,
        #[arg(value_enum)]
        frequency: Frequency,
    },
    /// Create the next occurrence of a recurring task now
    Generate { id: u64 },
    /// Create every occurrence that is due
    Auto,
}

#[derive(Subcommand)]
enum ThemeCommands {
    /// Print the current theme
    Show,
    /// Set the theme
    Set {
        #[arg(value_enum)]
        theme: Theme,
    },
    /// Switch between light and dark
    Toggle,
}

fn init_tracing() {
    // Tracing is opt-in via RUST_LOG.
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|raw| {
            let raw = raw.trim();
            if raw.is_empty() {
                return None;
            }
            EnvFilter::try_new(raw).ok()
        })
        .unwrap_or_else(|| EnvFilter::new("off"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    let repo = TaskRepository::new(Storage::new(FileStore::new(config.data_dir.clone())));
    let themes = ThemeService::new(repo.storage(), config.default_theme);
    let mut palette = Palette::default();
    themes.initialize(&mut palette);

    let auto = !cli.no_auto
        && !matches!(
            cli.command,
            Commands::Completions { .. }
                | Commands::Reset { .. }
                | Commands::Recur { command: RecurCommands::Auto }
        );
    if auto {
        cmd_recur_auto(&repo);
    }

    match cli.command {
        Commands::Add { title, priority, category, due } => {
            cmd_add(&repo, title, priority, category, due)?;
        }
        Commands::List { search, priority, category, tag, recurring, sort } => {
            let filter = TaskFilter { search, priority, category, tag, recurring_only: recurring };
            cmd_list(&repo, &palette, &filter, sort);
        }
        Commands::Show { id } => cmd_show(&repo, &palette, id)?,
        Commands::Edit { id, title, priority, category, due, clear_due } => {
            cmd_edit(&repo, id, title, priority, category, due, clear_due)?;
        }
        Commands::Toggle { id } => cmd_toggle(&repo, id)?,
        Commands::Remove { id } => cmd_remove(&repo, id)?,
        Commands::Stats => cmd_stats(&repo, &palette),
        Commands::Categories => cmd_categories(&repo),
        Commands::Tag { command } => match command {
            TagCommands::List => cmd_tag_list(&repo),
            TagCommands::Stats => cmd_tag_stats(&repo, &palette),
            TagCommands::Add { id, tag } => cmd_tag_add(&repo, id, &tag)?,
            TagCommands::Remove { id, tag } => cmd_tag_remove(&repo, id, &tag)?,
            TagCommands::Set { id, tags } => cmd_tag_set(&repo, id, &tags)?,
            TagCommands::Find { tag } => cmd_tag_find(&repo, &palette, &tag),
        },
        Commands::Subtask { command } => match command {
            SubtaskCommands::Add { id, title } => cmd_subtask_add(&repo, id, &title)?,
            SubtaskCommands::Toggle { id, subtask_id } => {
                cmd_subtask_toggle(&repo, id, &subtask_id)?
            }
            SubtaskCommands::Remove { id, subtask_id } => {
                cmd_subtask_remove(&repo, id, &subtask_id)?
            }
            SubtaskCommands::Rename { id, subtask_id, title } => {
                cmd_subtask_rename(&repo, id, &subtask_id, &title)?
            }
            SubtaskCommands::Stats { id } => cmd_subtask_stats(&repo, id)?,
        },
        Commands::Notes { command } => match command {
            NotesCommands::Set { id, notes } => cmd_notes_set(&repo, id, &notes)?,
            NotesCommands::Show { id } => cmd_notes_show(&repo, id)?,
            NotesCommands::Clear { id } => cmd_notes_clear(&repo, id)?,
        },
        Commands::Remind { id, state } => cmd_remind(&repo, id, state == "on")?,
        Commands::Recur { command } => match command {
            RecurCommands::Set { id, frequency } => cmd_recur_set(&repo, id, frequency)?,
            RecurCommands::Stop { id } => cmd_recur_stop(&repo, id)?,
            RecurCommands::List => cmd_recur_list(&repo, &palette),
            RecurCommands::Next { from, frequency } => cmd_recur_next(&from, frequency)?,
            RecurCommands::Generate { id } => cmd_recur_generate(&repo, id)?,
            RecurCommands::Auto => {
                if cmd_recur_auto(&repo).is_empty() {
                    println!("No recurring tasks due.");
                }
            }
        },
        Commands::Theme { command } => match command {
            ThemeCommands::Show => cmd_theme_show(&themes),
            ThemeCommands::Set { theme } => cmd_theme_set(&themes, theme)?,
            ThemeCommands::Toggle => cmd_theme_toggle(&themes),
        },
        Commands::Reset { force } => cmd_reset(&repo, force)?,
        Commands::Completions { shell } => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    return Err(taskdeck::Error::invalid_input(format!(
                        "unsupported shell: {shell}"
                    )));
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "taskdeck", &mut io::stdout());
        }
    }
    Ok(())
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("Error: {}", err);
        std::process::exit(err.exit_code());
    }
}
