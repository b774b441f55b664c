use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use colored::Colorize;
use gvs_backend::{Backend, Git2Backend};
use gvs_cache::{MemoryTree, NodeTree, Notification, ProjectStatusCache};
use gvs_session::{Session, SessionConfig, StatusEvent};
use gvs_types::{ChangeKind, GutterHighlight, LineMarker, LineMarkers};
use serde::Serialize;
use tokio::runtime::Runtime;
use tokio::sync::broadcast::error::RecvError;

use crate::cli::*;

const RESULT_TIMEOUT: Duration = Duration::from_secs(30);

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    let app = App {
        config,
        format: cli.format,
        runtime: Runtime::new().context("starting async runtime")?,
        backend: Arc::new(Git2Backend::new()),
    };
    match cli.command {
        Command::Status(args) => cmd_status(&app, args),
        Command::Diff(args) => cmd_diff(&app, args),
        Command::Next(args) => cmd_navigate(&app, args, Direction::Next),
        Command::Prev(args) => cmd_navigate(&app, args, Direction::Previous),
        Command::Watch(args) => cmd_watch(&app, args),
    }
}

struct App {
    config: SessionConfig,
    format: OutputFormat,
    runtime: Runtime,
    backend: Arc<dyn Backend>,
}

impl App {
    fn session(&self) -> Session {
        Session::new(self.backend.clone(), self.config.clone())
    }

    /// Register the project governing `path` and make it current.
    ///
    /// Returns the session and the project root (the repository's
    /// working directory).
    fn open_project(&self, path: &Path) -> anyhow::Result<(Session, PathBuf)> {
        let root = self
            .backend
            .discover(path)
            .ok_or_else(|| anyhow!("not a git working directory: {}", path.display()))?;
        let mut session = self.session();
        session.handle(StatusEvent::ProjectAdded(root.clone()));
        if !session.cache().is_registered(&root) {
            bail!("could not open repository at {}", root.display());
        }
        Ok((session, root))
    }

    fn wait_for_result(&self, session: &mut Session) -> anyhow::Result<()> {
        self.runtime
            .block_on(async { tokio::time::timeout(RESULT_TIMEOUT, session.next_result()).await })
            .map(|_| ())
            .map_err(|_| anyhow!("timed out waiting for the repository"))
    }
}

fn absolute(path: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let path = path.unwrap_or_else(|| PathBuf::from("."));
    fs::canonicalize(&path).with_context(|| format!("resolving {}", path.display()))
}

// ---------------------------------------------------------------
// status
// ---------------------------------------------------------------

#[derive(Serialize)]
struct StatusReport {
    root: PathBuf,
    changes: Vec<ChangeEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    folders: Option<Vec<PathBuf>>,
}

#[derive(Serialize)]
struct ChangeEntry {
    path: PathBuf,
    kind: ChangeKind,
}

fn cmd_status(app: &App, args: StatusArgs) -> anyhow::Result<()> {
    let path = absolute(args.path)?;
    let (mut session, root) = app.open_project(&path)?;
    session.handle(StatusEvent::CurrentProjectChanged(Some(root.clone())));
    app.wait_for_result(&mut session)?;

    let folders = if args.tree {
        let tree = MemoryTree::scan(&root)?;
        let mut folders = Vec::new();
        for folder in tree.folders() {
            if session.cache_mut().vcs_status_changes(&tree, folder)
                == ChangeKind::FolderContainsChanges
            {
                if let Some(path) = tree.file_path(folder) {
                    folders.push(path.to_path_buf());
                }
            }
        }
        folders.sort();
        Some(folders)
    } else {
        None
    };

    let report = status_report(session.cache(), &root, folders);
    print_status(&report, app.format)
}

fn status_report(cache: &ProjectStatusCache, root: &Path, folders: Option<Vec<PathBuf>>) -> StatusReport {
    let changes = cache
        .project(root)
        .map(|project| {
            project
                .changes()
                .sorted()
                .into_iter()
                .map(|(path, kind)| ChangeEntry {
                    path: path.to_path_buf(),
                    kind,
                })
                .collect()
        })
        .unwrap_or_default();
    StatusReport {
        root: root.to_path_buf(),
        changes,
        folders,
    }
}

fn print_status(report: &StatusReport, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Project {}", report.root.display().to_string().bold());
    if report.changes.is_empty() {
        println!("\nNo uncommitted changes.");
    } else {
        println!();
        for entry in &report.changes {
            let label = match entry.kind {
                ChangeKind::Modified => "modified:".yellow(),
                ChangeKind::Untracked => "untracked:".green(),
                other => other.to_string().normal(),
            };
            println!("  {:<11} {}", label, relative(&entry.path, &report.root));
        }
    }
    if let Some(folders) = &report.folders {
        if !folders.is_empty() {
            println!("\nFolders containing changes:");
            for folder in folders {
                let shown = relative(folder, &report.root);
                let shown = if shown.is_empty() { ".".to_string() } else { shown };
                println!("  {}", shown.cyan());
            }
        }
    }
    Ok(())
}

fn relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

// ---------------------------------------------------------------
// diff / next / prev
// ---------------------------------------------------------------

#[derive(Serialize)]
struct LineEntry {
    line: u32,
    added: bool,
    deleted: bool,
}

/// Open the project governing `file`, make it the current document and
/// wait for its markers.
///
/// Returns `None` for ignored files, which are never diffed.
fn load_document(app: &App, file: &Path) -> anyhow::Result<Option<(Session, PathBuf)>> {
    let file = fs::canonicalize(file).with_context(|| format!("resolving {}", file.display()))?;
    let (mut session, root) = app.open_project(&file)?;

    let repo = app.backend.open(&root)?;
    let rel = file.strip_prefix(&root).unwrap_or(&file);
    if repo.is_ignored(rel)? {
        return Ok(None);
    }

    session.handle(StatusEvent::CurrentEditorChanged(Some(file.clone())));
    app.wait_for_result(&mut session)?;
    Ok(Some((session, file)))
}

fn cmd_diff(app: &App, args: DiffArgs) -> anyhow::Result<()> {
    let Some((session, file)) = load_document(app, &args.file)? else {
        println!("{} is ignored.", args.file.display());
        return Ok(());
    };
    let markers = session.cache().current_file_diff().cloned().unwrap_or_default();

    if app.format == OutputFormat::Json {
        let lines: Vec<LineEntry> = markers
            .iter()
            .map(|(line, marker)| LineEntry {
                line,
                added: marker.contains(LineMarker::ADDED),
                deleted: marker.contains(LineMarker::DELETED),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&lines)?);
        return Ok(());
    }

    if markers.is_empty() {
        println!("No changed lines in {}.", file.display());
        return Ok(());
    }
    let line_count = line_count(&file);
    println!("{}", file.display().to_string().bold());
    for (row, highlight) in markers.highlights(line_count) {
        let label = match highlight {
            GutterHighlight::Added => "added".green(),
            GutterHighlight::Deleted => "deleted".red(),
            GutterHighlight::AddedAndDeleted => "changed".yellow(),
        };
        println!("  {:>6}  {}", row + 1, label);
    }
    print_trailing_deletions(&markers, line_count);
    Ok(())
}

/// Deletions anchored past the end of the file have no gutter row.
fn print_trailing_deletions(markers: &LineMarkers, line_count: u32) {
    let trailing = markers.iter().filter(|(line, _)| *line > line_count).count();
    if trailing > 0 {
        println!("  {} marker(s) past the end of the file", trailing.to_string().dimmed());
    }
}

fn line_count(file: &Path) -> u32 {
    fs::read_to_string(file)
        .map(|text| u32::try_from(text.lines().count()).unwrap_or(u32::MAX))
        .unwrap_or(0)
}

#[derive(Clone, Copy)]
enum Direction {
    Next,
    Previous,
}

fn cmd_navigate(app: &App, args: NavArgs, direction: Direction) -> anyhow::Result<()> {
    let Some((session, _)) = load_document(app, &args.file)? else {
        println!("{} is ignored.", args.file.display());
        return Ok(());
    };
    let found = match direction {
        Direction::Next => session.cache().next_changed_line(args.line),
        Direction::Previous => session.cache().previous_changed_line(args.line),
    };

    if app.format == OutputFormat::Json {
        println!("{}", serde_json::json!({ "from": args.line, "line": found }));
        return Ok(());
    }
    match found {
        Some(line) => println!("{line}"),
        None => println!("{}", "no changed line".dimmed()),
    }
    Ok(())
}

// ---------------------------------------------------------------
// watch
// ---------------------------------------------------------------

fn cmd_watch(app: &App, args: WatchArgs) -> anyhow::Result<()> {
    let path = absolute(args.path)?;
    let (mut session, root) = app.open_project(&path)?;
    let mut notes = session.subscribe();
    let interval = app.config.watch_interval();

    if app.format == OutputFormat::Text {
        println!(
            "Watching {} every {} ms (Ctrl-C to stop)",
            root.display().to_string().bold(),
            interval.as_millis()
        );
    }
    session.handle(StatusEvent::CurrentProjectChanged(Some(root.clone())));

    app.runtime.block_on(async {
        let mut ticker = tokio::time::interval(interval);
        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);
        loop {
            tokio::select! {
                _ = &mut ctrl_c => break,
                _ = ticker.tick() => session.handle(StatusEvent::ApplicationActivated),
                _ = session.next_result() => {}
                note = notes.recv() => match note {
                    Ok(Notification::StatusChanged { root: changed }) => {
                        let report = status_report(session.cache(), &changed, None);
                        print_status(&report, app.format)?;
                    }
                    Ok(Notification::CurrentFileDiffChanged) | Err(RecvError::Lagged(_)) => {}
                    Err(RecvError::Closed) => break,
                },
            }
        }
        Ok::<(), anyhow::Error>(())
    })?;

    session.handle(StatusEvent::ProjectRemoved(root));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvs_types::FileChangeSet;

    #[test]
    fn relative_paths_inside_root() {
        assert_eq!(relative(Path::new("/p/src/a.rs"), Path::new("/p")), "src/a.rs");
        assert_eq!(relative(Path::new("/q/b.rs"), Path::new("/p")), "/q/b.rs");
    }

    #[test]
    fn status_report_for_unknown_project_is_empty() {
        let backend: Arc<dyn Backend> = Arc::new(gvs_backend::InMemoryBackend::new());
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let cache = ProjectStatusCache::new(backend, tx, 4);
        let report = status_report(&cache, Path::new("/p"), None);
        assert!(report.changes.is_empty());
        assert!(report.folders.is_none());
    }

    #[test]
    fn status_report_is_sorted_and_serializable() {
        let backend = Arc::new(gvs_backend::InMemoryBackend::new());
        backend.create_repo("/p");
        let (tx, _rx) = tokio::sync::mpsc::unbounded_channel();
        let mut cache = ProjectStatusCache::new(backend, tx, 4);
        cache.register_project("/p");
        let changes: FileChangeSet = [
            (PathBuf::from("/p/z.rs"), ChangeKind::Untracked),
            (PathBuf::from("/p/a.rs"), ChangeKind::Modified),
        ]
        .into_iter()
        .collect();
        cache.merge_file_change_set(Path::new("/p"), changes);

        let report = status_report(&cache, Path::new("/p"), Some(vec![PathBuf::from("/p")]));
        let paths: Vec<&Path> = report.changes.iter().map(|e| e.path.as_path()).collect();
        assert_eq!(paths, vec![Path::new("/p/a.rs"), Path::new("/p/z.rs")]);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["changes"][0]["kind"], "Modified");
        assert_eq!(json["folders"][0], "/p");
    }

    #[test]
    fn line_count_of_missing_file_is_zero() {
        assert_eq!(line_count(Path::new("/definitely/not/here.txt")), 0);
    }
}
