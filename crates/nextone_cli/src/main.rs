//! `nextone` command-line entry point.
//!
//! # Responsibility
//! - Parse arguments, resolve paths, start logging and open the store.
//! - Print rendered results; all task logic lives in `nextone_core`.
//!
//! # Invariants
//! - A store that fails to open or migrate ends the process with an error.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use log::warn;
use nextone_core::{
    init_logging, open_store, parse_task_id, render_all, render_task, AppConfig,
    JsonFileScratchStore, ScratchStore, SqliteTaskRepository, TaskId, TaskService, TaskStatus,
    SCHEMA_VERSION,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "nextone", version, about = "A small persistent task list")]
struct Cli {
    /// Database path (overrides NEXTONE_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error (overrides NEXTONE_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a pending task
    Add {
        /// Task text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// List tasks, done first then pending
    List,
    /// Show one task
    Show { id: String },
    /// Flip a task between pending and done
    Toggle { id: String },
    /// Mark a task done
    Done { id: String },
    /// Mark a task pending again
    Open { id: String },
    /// Delete a task
    Delete { id: String },
    /// Highlight a task in listings
    Select { id: String },
    /// Attach a one-word tag to a task
    #[command(name = "addtag")]
    AddTag { id: String, tag: String },
    /// Remove a tag from a task
    #[command(name = "rmtag")]
    RmTag { id: String, tag: String },
    /// Print every task as JSON
    Json,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::resolve(cli.db, cli.log_level)?;

    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create `{}`", parent.display()))?;
    }
    if let Err(err) = init_logging(&config.log_level, &config.log_dir) {
        eprintln!("warning: file logging disabled: {err}");
    }

    let repo = open_store(&config.db_path, SCHEMA_VERSION).with_context(|| {
        format!(
            "failed to open task store `{}`",
            config.db_path.display()
        )
    })?;
    let service = TaskService::new(repo);
    let mut scratch = JsonFileScratchStore::open(&config.scratch_path);

    match cli.command.unwrap_or(Command::List) {
        Command::Add { text } => {
            let task = service.create_task(&text.join(" "))?;
            println!("Task {} created", task.id.unwrap_or_default());
        }
        Command::List => print_list(&service, &scratch)?,
        Command::Show { id } => {
            let id = parse_id(&id)?;
            match service.get_task(id)? {
                Some(task) => println!("{}", render_task(&task, service.selected_task(&scratch))),
                None => bail!("can't find task {id}"),
            }
        }
        Command::Toggle { id } => {
            let task = service.toggle_task(parse_id(&id)?)?;
            println!("{}", render_task(&task, service.selected_task(&scratch)));
        }
        Command::Done { id } => set_status(&service, &scratch, &id, TaskStatus::Done)?,
        Command::Open { id } => set_status(&service, &scratch, &id, TaskStatus::Pending)?,
        Command::Delete { id } => {
            let id = parse_id(&id)?;
            if !service.delete_task(id)? {
                warn!("event=cli_delete module=cli status=noop id={}", id);
                println!("No task {id} to delete");
            }
            print_list(&service, &scratch)?;
        }
        Command::Select { id } => {
            service.select_task(&mut scratch, parse_id(&id)?)?;
            print_list(&service, &scratch)?;
        }
        Command::AddTag { id, tag } => {
            let task = service.add_tag(parse_id(&id)?, &tag)?;
            println!("{}", render_task(&task, service.selected_task(&scratch)));
        }
        Command::RmTag { id, tag } => {
            let task = service.remove_tag(parse_id(&id)?, &tag)?;
            println!("{}", render_task(&task, service.selected_task(&scratch)));
        }
        Command::Json => println!("{}", service.export_json()?),
    }

    Ok(())
}

fn parse_id(raw: &str) -> Result<TaskId> {
    match parse_task_id(raw) {
        Some(id) => Ok(id),
        None => bail!("task id must be an integer, got `{raw}`"),
    }
}

fn set_status(
    service: &TaskService<SqliteTaskRepository>,
    scratch: &dyn ScratchStore,
    raw_id: &str,
    status: TaskStatus,
) -> Result<()> {
    let task = service.set_task_status(parse_id(raw_id)?, status)?;
    println!("{}", render_task(&task, service.selected_task(scratch)));
    Ok(())
}

fn print_list(service: &TaskService<SqliteTaskRepository>, scratch: &dyn ScratchStore) -> Result<()> {
    let rendered = render_all(service.repository(), scratch)?;
    print!("{}", rendered.text);
    println!("{} tasks.", rendered.count);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{parse_id, Cli, Command};
    use clap::Parser;

    #[test]
    fn add_joins_words_and_accepts_global_db() {
        let cli = Cli::parse_from(["nextone", "add", "buy", "milk", "--db", "/tmp/t.db"]);
        assert_eq!(cli.db.as_deref(), Some(std::path::Path::new("/tmp/t.db")));
        match cli.command {
            Some(Command::Add { text }) => assert_eq!(text.join(" "), "buy milk"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn no_subcommand_parses() {
        let cli = Cli::parse_from(["nextone"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn tag_commands_use_short_names() {
        let cli = Cli::parse_from(["nextone", "addtag", "12", "home"]);
        match cli.command {
            Some(Command::AddTag { id, tag }) => assert_eq!((id.as_str(), tag.as_str()), ("12", "home")),
            other => panic!("unexpected command: {other:?}"),
        }

        let cli = Cli::parse_from(["nextone", "rmtag", "12", "home"]);
        assert!(matches!(cli.command, Some(Command::RmTag { .. })));
    }

    #[test]
    fn parse_id_rejects_non_integers() {
        assert_eq!(parse_id("17").unwrap(), 17);
        assert!(parse_id("seventeen").is_err());
    }
}
