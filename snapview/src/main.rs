mod backend;
mod dbus_client;
mod modification;
mod restore;
mod session;
mod ui;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use snapview_common::*;
use std::process::ExitCode;

use backend::{BackendResult, SnapperBackend};
use dbus_client::SnapperClient;
use modification::FileModification;
use restore::{restore_files, RestoreObserver};
use session::{NewSnapshot, Session, SnapshotChanges};
use ui::comparison_view::{self, DiffChoice, OverviewHeader};
use ui::{dialogs, error_helpers, snapshot_list};

#[derive(Parser)]
#[command(author, version, about = "Browse, compare and restore snapper snapshots")]
struct Cli {
    /// Snapper configuration to work with
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Do not color diff output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print machine readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List snapper configurations
    Configs,
    /// Show the snapshot summary table
    List,
    /// Create a new snapshot
    Create {
        /// Snapshot type: single, pre or post
        #[arg(short = 't', long = "type", default_value = "single")]
        snapshot_type: String,
        /// Pre snapshot a post snapshot is paired with
        #[arg(long)]
        pre: Option<u32>,
        #[arg(short, long, default_value = "")]
        description: String,
        /// Cleanup algorithm: timeline, number or empty
        #[arg(long, default_value = "")]
        cleanup: String,
        /// User data as key=value,key=value
        #[arg(short, long)]
        userdata: Option<String>,
    },
    /// Modify description, cleanup algorithm or user data of a snapshot
    Modify {
        num: u32,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        cleanup: Option<String>,
        /// User data as key=value,key=value (replaces the current set)
        #[arg(short, long)]
        userdata: Option<String>,
    },
    /// Delete a snapshot (a pre or post snapshot together with its partner)
    Delete {
        num: u32,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the files changed in a snapshot
    Show {
        num: u32,
        /// Show how this file changed
        #[arg(long)]
        file: Option<String>,
        #[command(flatten)]
        diff: DiffArgs,
    },
    /// Print the diff of one changed file
    Diff {
        num: u32,
        file: String,
        #[command(flatten)]
        diff: DiffArgs,
    },
    /// Restore changed files from a snapshot
    Restore {
        num: u32,
        /// Files to restore, relative to the subvolume
        files: Vec<String>,
        /// Restore every changed file
        #[arg(long, conflicts_with = "files")]
        all: bool,
        /// Restore from the second snapshot of a pair
        #[arg(long)]
        from_second: bool,
        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
}

/// Which trees a file is compared between
#[derive(Args)]
struct DiffArgs {
    /// Compare a single snapshot with another snapshot
    #[arg(long, conflicts_with_all = ["first_current", "second_current"])]
    against: Option<u32>,
    /// Compare the first snapshot of a pair with the current system
    #[arg(long, conflicts_with = "second_current")]
    first_current: bool,
    /// Compare the second snapshot of a pair with the current system
    #[arg(long)]
    second_current: bool,
}

impl DiffArgs {
    fn choice(&self) -> DiffChoice {
        if let Some(other) = self.against {
            DiffChoice::Other(other)
        } else if self.first_current {
            DiffChoice::FirstToCurrent
        } else if self.second_current {
            DiffChoice::SecondToCurrent
        } else {
            DiffChoice::Default
        }
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // Backend failures were already shown with their action heading
            if e.downcast_ref::<SnapperError>().is_none() {
                eprintln!("Error: {e:#}");
            }
            ExitCode::FAILURE
        }
    }
}

/// Show a backend failure and turn it into an application error
fn check<T>(action: Action, result: BackendResult<T>) -> Result<T> {
    result.map_err(|e| {
        error_helpers::show_error_with_context(action, &e);
        anyhow::Error::new(e)
    })
}

fn flush_notices<B: SnapperBackend>(session: &mut Session<B>) {
    for notice in session.take_notices() {
        error_helpers::show_popup(&notice);
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{text}");
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut config = SnapviewConfig::new().context("Failed to load configuration")?;
    if cli.no_color {
        config.color = false;
    }

    let default_config = cli
        .config
        .clone()
        .unwrap_or_else(|| config.default_config.clone());
    let client = SnapperClient::new()?;
    let mut session = Session::new(client, &default_config);

    session.read_configs();
    flush_notices(&mut session);

    let command = cli.command.unwrap_or(Commands::List);
    if let Commands::Configs = command {
        return print_configs(&session, cli.json);
    }

    let name = cli
        .config
        .unwrap_or_else(|| session.current_config().to_string());
    check(Action::Initialize, session.initialize(&name))?;
    check(Action::ReadSnapshots, session.read_snapshots())?;

    let result = dispatch(&mut session, &config, command, cli.json);
    if let Some(tag) = session.last_error() {
        log::debug!("last backend error: {tag}");
    }
    result
}

fn dispatch<B: SnapperBackend>(
    session: &mut Session<B>,
    config: &SnapviewConfig,
    command: Commands,
    json: bool,
) -> Result<()> {
    match command {
        Commands::Configs => print_configs(session, json),
        Commands::List => list(session, config, json),
        Commands::Create {
            snapshot_type,
            pre,
            description,
            cleanup,
            userdata,
        } => {
            let args = NewSnapshot {
                snapshot_type,
                pre,
                description,
                cleanup,
                userdata: userdata.as_deref().map(parse_userdata).unwrap_or_default(),
            };
            let num = check(Action::Create, session.create_snapshot(&args))?;
            println!("{num}");
            Ok(())
        }
        Commands::Modify {
            num,
            description,
            cleanup,
            userdata,
        } => {
            let changes = SnapshotChanges {
                description,
                cleanup,
                userdata: userdata.as_deref().map(parse_userdata),
            };
            if check(Action::Modify, session.modify_snapshot(num, &changes))? {
                println!("Snapshot {num} modified.");
            } else {
                println!("Nothing to change.");
            }
            Ok(())
        }
        Commands::Delete { num, yes } => delete(session, num, yes),
        Commands::Show { num, file, diff } => {
            show(session, config, num, file.as_deref(), diff.choice(), json)
        }
        Commands::Diff { num, file, diff } => {
            let selection = select(session, num)?;
            let modification = file_modification(session, config, &selection, &file, diff.choice())?;
            print!("{}", comparison_view::colorize_diff(&modification.diff, config.color));
            Ok(())
        }
        Commands::Restore {
            num,
            files,
            all,
            from_second,
            yes,
        } => restore(session, config, num, files, all, from_second, yes),
    }
}

fn print_configs<B: SnapperBackend>(session: &Session<B>, json: bool) -> Result<()> {
    if json {
        return print_json(&session.configs());
    }

    for name in session.configs() {
        let marker = if name == session.current_config() { '*' } else { ' ' };
        println!("{marker} {name}");
    }
    Ok(())
}

fn list<B: SnapperBackend>(session: &Session<B>, config: &SnapviewConfig, json: bool) -> Result<()> {
    let summary = snapshot_list::summary_rows(session.snapshots());

    if json {
        return print_json(&summary);
    }

    println!(
        "Current Configuration: {} ({})",
        session.current_config(),
        session.subvolume()
    );
    print!("{}", snapshot_list::render_table(&summary.rows, &config.date_format));
    Ok(())
}

fn delete<B: SnapperBackend>(session: &mut Session<B>, num: u32, yes: bool) -> Result<()> {
    let name = match session.snapshot(num) {
        Some(snapshot) => match (snapshot.snapshot_type, snapshot.post_num) {
            (SnapshotType::Post, _) => format_range(snapshot.pre_num, snapshot.num),
            (SnapshotType::Pre, Some(post)) => format_range(Some(snapshot.num), post),
            _ => snapshot.name(),
        },
        None => num.to_string(),
    };

    if !yes && !dialogs::confirm(&dialogs::delete_question(&name))? {
        return Ok(());
    }

    let deleted = check(Action::Delete, session.delete_snapshot(num))?;
    log::info!("deleted {deleted:?}");
    Ok(())
}

/// The selected snapshot with its comparison range and changed files
struct Selection {
    kind: SnapshotType,
    first: u32,
    second: u32,
    index: FileIndex,
}

fn select<B: SnapperBackend>(session: &mut Session<B>, num: u32) -> Result<Selection> {
    let index = session.index_of(num).ok_or(SnapperError::NotFound);
    let index = check(Action::Compare, index)?;

    let snapshot = check(Action::Compare, session.select(index))?;
    let kind = snapshot.snapshot_type;
    let (first, second) = Session::<B>::comparison_range(snapshot);

    let files = check(Action::Compare, session.read_modified_files_index(first, second))?;
    Ok(Selection {
        kind,
        first,
        second,
        index: files,
    })
}

fn file_modification<B: SnapperBackend>(
    session: &mut Session<B>,
    config: &SnapviewConfig,
    selection: &Selection,
    file: &str,
    choice: DiffChoice,
) -> Result<FileModification> {
    if !selection.index.contains_key(file) {
        bail!("{file} was not changed in snapshot {}", selection.first);
    }

    let (from, to) = choice
        .resolve(selection.kind, selection.first, selection.second)
        .map_err(|e| anyhow!(e))?;

    check(
        Action::Compare,
        session.file_modification(file, from, to, &config.diff_command),
    )
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    header: &'a OverviewHeader,
    tree: &'a [TreeItem],
    file: Option<&'a str>,
    modification: Option<&'a FileModification>,
}

fn show<B: SnapperBackend>(
    session: &mut Session<B>,
    config: &SnapviewConfig,
    num: u32,
    file: Option<&str>,
    choice: DiffChoice,
    json: bool,
) -> Result<()> {
    let selection = select(session, num)?;

    let header = {
        let second = if selection.kind == SnapshotType::Single {
            selection.first
        } else {
            selection.second
        };
        let path = session.snapshot_path(second);
        let pre = session.snapshot(selection.first).cloned();
        let snapshot = session
            .snapshot(second)
            .cloned()
            .ok_or_else(|| anyhow!("Snapshot '{second}' was not found."))?;

        match selection.kind {
            SnapshotType::Single => comparison_view::overview_header(None, &snapshot, &path),
            _ => comparison_view::overview_header(pre.as_ref(), &snapshot, &path),
        }
    };
    flush_notices(session);

    let tree = build_tree(selection.index.keys());
    let items = tree_items(&selection.index, &tree);

    let modification = match file {
        Some(file) => Some(file_modification(session, config, &selection, file, choice)?),
        None => None,
    };

    if json {
        return print_json(&ShowOutput {
            header: &header,
            tree: &items,
            file,
            modification: modification.as_ref(),
        });
    }

    print!("{}", comparison_view::render_header(&header, &config.date_format));
    println!();
    print!("{}", comparison_view::render_tree(&items));

    if let (Some(file), Some(modification)) = (file, modification) {
        println!();
        println!("{file}");
        for line in comparison_view::modification_text(&modification) {
            println!("{line}");
        }
        if let Some(diff) = comparison_view::diff_body(&modification) {
            println!();
            print!("{}", comparison_view::colorize_diff(diff, config.color));
        }

        let created = comparison_view::file_was_created(&selection.index, file);
        let (first, second) = comparison_view::restore_labels(selection.kind, created);
        let actions: Vec<&str> = first.into_iter().chain([second]).collect();
        println!();
        println!("Actions: {}", actions.join(", "));
    }

    Ok(())
}

/// Prints restored files as they are handled
struct TerminalObserver;

impl RestoreObserver for TerminalObserver {
    fn progress(&mut self, done: usize, total: usize) {
        log::debug!("restored {done} of {total}");
    }

    fn log_line(&mut self, line: &str) {
        println!("{line}");
    }
}

fn restore<B: SnapperBackend>(
    session: &mut Session<B>,
    config: &SnapviewConfig,
    num: u32,
    files: Vec<String>,
    all: bool,
    from_second: bool,
    yes: bool,
) -> Result<()> {
    let selection = select(session, num)?;

    if from_second && selection.kind == SnapshotType::Single {
        bail!("A single snapshot has no second snapshot to restore from");
    }

    let files: Vec<String> = if all {
        selection.index.keys().cloned().collect()
    } else {
        files
            .into_iter()
            .filter(|file| {
                let known = selection.index.contains_key(file);
                if !known {
                    log::warn!("{file} was not changed, skipping");
                }
                known
            })
            .collect()
    };

    if files.is_empty() {
        dialogs::show_info("No file was selected for restoring");
        return Ok(());
    }

    let source = if from_second {
        for file in &files {
            comparison_view::check_restore_from_second(selection.kind, &selection.index, file)
                .map_err(|e| anyhow!(e))?;
        }
        selection.second
    } else {
        selection.first
    };

    if !yes {
        let question = match files.as_slice() {
            [file] if !from_second && comparison_view::file_was_created(&selection.index, file) => {
                dialogs::remove_file_question(&session.file_full_path(file))
            }
            [file] => dialogs::copy_file_question(&session.file_full_path(file), source),
            _ => {
                let full_paths: Vec<String> =
                    files.iter().map(|f| session.file_full_path(f)).collect();
                dialogs::restore_files_question(source, &full_paths)
            }
        };
        if !dialogs::confirm(&question)? {
            return Ok(());
        }
    }

    let report = restore_files(
        session,
        source,
        &files,
        &config.copy_command,
        &mut TerminalObserver,
    );
    flush_notices(session);

    if report.failed > 0 || report.skipped > 0 {
        let popup = ErrorPopup {
            heading: Action::Restore.heading().to_string(),
            details: format!(
                "{} of {} files could not be restored.",
                report.failed + report.skipped,
                files.len()
            ),
        };
        error_helpers::show_popup(&popup);
        bail!("restore incomplete");
    }

    Ok(())
}
