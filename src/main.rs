//! spacetree - Lazy, size-aware directory tree scanner.
//!
//! Usage:
//!   spacetree scan [PATH]              Scan one level with live progress
//!   spacetree expand PATH              List one directory, no progress
//!   spacetree export [PATH] -d N       Expand N levels and dump JSON
//!   spacetree delete PATH [--yes]      Delete a file or directory tree
//!   spacetree reveal PATH              Show PATH in the file manager
//!   spacetree --help                   Show help

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Context, Result, bail, eyre};
use tracing_subscriber::EnvFilter;

use spacetree_core::{Entry, EntryTree, ScanConfig, sort_by_size};
use spacetree_ops::{DeleteOutcome, delete_entry, reveal};
use spacetree_scan::{ScanEvent, ScanProgress, ScanService, Scanner};

#[derive(Parser)]
#[command(
    name = "spacetree",
    version,
    about = "Lazy, size-aware directory tree scanner",
    long_about = "spacetree shows where disk space goes one directory level at a time.\n\n\
                  Every listed directory carries the size of its whole subtree; \
                  deeper levels are only listed when asked for."
)]
struct Cli {
    #[command(flatten)]
    options: ScanOptions,

    #[command(subcommand)]
    command: Command,
}

/// Flags shared by every scanning subcommand.
#[derive(Args)]
struct ScanOptions {
    /// Follow symbolic links into directories
    #[arg(short = 'L', long, global = true)]
    follow_symlinks: bool,

    /// Do not descend into other filesystems
    #[arg(short = 'x', long, global = true)]
    one_file_system: bool,

    /// Count hard-linked files once
    #[arg(long, global = true)]
    dedupe_hardlinks: bool,

    /// Skip entries whose name starts with a dot
    #[arg(long, global = true)]
    no_hidden: bool,

    /// Glob of names to skip (repeatable)
    #[arg(short, long = "ignore", global = true)]
    ignore: Vec<String>,

    /// Directory reader threads (0 = automatic)
    #[arg(short = 'j', long, default_value = "0", global = true)]
    threads: usize,
}

impl ScanOptions {
    fn config(&self, root: &Path) -> Result<ScanConfig> {
        ScanConfig::builder()
            .root(root)
            .follow_symlinks(self.follow_symlinks)
            .cross_filesystems(!self.one_file_system)
            .dedupe_hardlinks(self.dedupe_hardlinks)
            .include_hidden(!self.no_hidden)
            .ignore_patterns(self.ignore.clone())
            .threads(self.threads)
            .build()
            .map_err(|e| eyre!("Invalid configuration: {e}"))
    }
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory and show its children by size
    Scan {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Number of entries to show
        #[arg(short = 'n', long, default_value = "20")]
        top: usize,
    },

    /// List one directory level without progress output
    Expand {
        /// Directory to list
        path: PathBuf,
    },

    /// Export a scan to JSON
    Export {
        /// Path to scan
        #[arg(default_value = ".")]
        path: PathBuf,

        /// Number of directory levels to list
        #[arg(short, long, default_value = "1")]
        depth: u32,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Delete a file or directory tree
    Delete {
        /// Path to delete
        path: PathBuf,

        /// Do not ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Show a path in the system file manager
    Reveal {
        /// Path to reveal
        path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Scan { path, top } => {
            run_scan(&cli.options, &path, top).await?;
        }
        Command::Expand { path } => {
            run_expand(&cli.options, &path)?;
        }
        Command::Export {
            path,
            depth,
            output,
        } => {
            run_export(&cli.options, &path, depth, output)?;
        }
        Command::Delete { path, yes } => {
            run_delete(&path, yes)?;
        }
        Command::Reveal { path } => {
            let path = path.canonicalize().context("Invalid path")?;
            if !reveal(&path) {
                bail!("Could not open a file manager for {}", path.display());
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Scan a root on the background service, drawing progress on stderr.
async fn run_scan(options: &ScanOptions, path: &Path, top_n: usize) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let service = ScanService::new(options.config(&path)?);

    eprintln!("Scanning {}...", path.display());

    let mut handle = service.start_root_scan(path.clone());
    let mut tree = None;
    while let Some(event) = handle.events.recv().await {
        match event {
            ScanEvent::Progress(progress) => draw_progress(&progress),
            ScanEvent::Root { result, .. } => {
                clear_progress();
                tree = Some(result.context("Scan failed")?);
            }
            ScanEvent::Expanded { .. } => {}
        }
    }
    let mut tree = tree.ok_or_else(|| eyre!("Scan ended without a result"))?;
    tree.sort_by_size();

    println!();
    println!("{}", "─".repeat(60));
    println!(" {} - {}", path.display(), format_size(tree.total_size()));
    println!(
        " {} entries, scanned in {:.2}s",
        tree.contents.len(),
        tree.scan_duration.as_secs_f64()
    );
    println!("{}", "─".repeat(60));
    println!();

    print_entries(&tree.contents, tree.total_size(), top_n);

    if tree.has_warnings() {
        println!();
        println!("{} warning(s) during scan", tree.warnings.len());
    }

    Ok(())
}

/// List a single directory synchronously, no progress.
fn run_expand(options: &ScanOptions, path: &Path) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let scanner = Scanner::new(options.config(&path)?);

    let mut entries = scanner.scan_dir(&path, None).context("Scan failed")?;
    sort_by_size(&mut entries);

    let total = entries.iter().map(|e| e.size).sum();
    print_entries(&entries, total, usize::MAX);

    Ok(())
}

/// Scan a root, expand `depth - 1` further levels and write the tree as JSON.
fn run_export(
    options: &ScanOptions,
    path: &Path,
    depth: u32,
    output: Option<PathBuf>,
) -> Result<()> {
    let path = path.canonicalize().context("Invalid path")?;
    let scanner = Scanner::new(options.config(&path)?);

    eprintln!("Scanning {}...", path.display());

    let mut tree = scanner.scan_root(None).context("Scan failed")?;
    expand_levels(&scanner, &mut tree, depth);
    tree.sort_by_size();

    let json = serde_json::to_string_pretty(&tree)?;

    match output {
        Some(output_path) => {
            std::fs::write(&output_path, json)?;
            eprintln!("Exported to {}", output_path.display());
        }
        None => {
            println!("{}", json);
        }
    }

    Ok(())
}

/// Expand every directory level by level until `depth` levels are listed.
fn expand_levels(scanner: &Scanner, tree: &mut EntryTree, depth: u32) {
    let mut frontier = expandable_paths(&tree.contents);

    for _ in 1..depth {
        let mut next = Vec::new();
        for dir in frontier {
            if let Err(error) = scanner.expand(tree, &dir) {
                tracing::warn!(path = %dir.display(), %error, "expansion failed");
                continue;
            }
            if let Some(children) = tree.find(&dir).and_then(|e| e.contents.as_deref()) {
                next.extend(expandable_paths(children));
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
}

fn expandable_paths(entries: &[Entry]) -> Vec<PathBuf> {
    entries
        .iter()
        .filter(|e| e.is_expandable())
        .map(|e| e.path.clone())
        .collect()
}

/// Delete a path after confirmation.
fn run_delete(path: &Path, yes: bool) -> Result<()> {
    // Made absolute, not canonicalized: a final symlink is deleted as a link.
    let path = std::path::absolute(path).context("Invalid path")?;
    let path = path.as_path();
    let metadata = std::fs::symlink_metadata(path)
        .with_context(|| format!("Cannot delete {}", path.display()))?;
    let is_directory = metadata.is_dir();

    if !yes && !confirm(path, is_directory)? {
        eprintln!("Cancelled");
        return Ok(());
    }

    match delete_entry(path, is_directory) {
        DeleteOutcome::Deleted { path } => {
            println!("Deleted {}", path.display());
            Ok(())
        }
        DeleteOutcome::Failed { error } => Err(error.into()),
    }
}

fn confirm(path: &Path, is_directory: bool) -> Result<bool> {
    let what = if is_directory { "directory" } else { "file" };
    eprint!("Delete {} {}? [y/N] ", what, path.display());
    std::io::stderr().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn draw_progress(progress: &ScanProgress) {
    eprint!(
        "\r\x1b[2K{} files, {} dirs, {}  {}",
        progress.files_count,
        progress.dirs_count,
        format_size(progress.bytes_count),
        truncate(&progress.current_path.display().to_string(), 50)
    );
    let _ = std::io::stderr().flush();
}

fn clear_progress() {
    eprint!("\r\x1b[2K");
}

/// Print entries with their share of `total`.
fn print_entries(entries: &[Entry], total: u64, top_n: usize) {
    for entry in entries.iter().take(top_n) {
        let ratio = if total > 0 {
            entry.size as f64 / total as f64 * 100.0
        } else {
            0.0
        };
        let dir_marker = if entry.is_dir() { "/" } else { "" };
        let note = entry
            .error
            .as_deref()
            .map(|e| format!("  ({e})"))
            .unwrap_or_default();

        println!(
            "  {:<40} {:>10} {:>5.1}% {}{}",
            truncate(&format!("{}{}", entry.name, dir_marker), 40),
            format_size(entry.size),
            ratio,
            make_bar(ratio / 100.0, 10),
            note
        );
    }

    let remaining = entries.len().saturating_sub(top_n);
    if remaining > 0 {
        println!("  ... and {} more", remaining);
    }
}

/// Create a simple ASCII bar.
fn make_bar(ratio: f64, width: usize) -> String {
    let filled = (ratio * width as f64).round() as usize;
    let empty = width.saturating_sub(filled);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to at most `max_len` characters.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{head}…")
    }
}
