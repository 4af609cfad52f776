//! CLI binary for vce2flashquiz.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use vce2flashquiz::pipeline::input::{classify_input, InputKind};
use vce2flashquiz::{
    convert, convert_dir, inspect_with, parse_markup, BatchReport, ConversionConfig,
    ConversionOutput, ConversionProgressCallback, ConversionStats, FileOutcome, PageSelection,
    ParseWarning, ProgressCallback, write_markup,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for directory runs: one bar over all files plus a log
/// line per finished file. Files finish out of order when concurrency > 1.
struct CliProgressCallback {
    bar: ProgressBar,
    warnings: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            warnings: AtomicUsize::new(0),
        })
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
        self.bar.reset_eta();
    }

    fn on_file_start(&self, path: &Path) {
        self.bar.set_message(file_name(path));
    }

    fn on_file_complete(&self, path: &Path, questions: usize, warnings: usize) {
        self.warnings.fetch_add(warnings, Ordering::SeqCst);
        let note = if warnings > 0 {
            yellow(&format!("{warnings} warnings"))
        } else {
            String::new()
        };
        self.bar.println(format!(
            "  {} {:<40} {}  {}",
            green("✓"),
            file_name(path),
            dim(&format!("{questions:>4} questions")),
            note,
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, path: &Path, error: &str) {
        // Keep the log tidy: first line of the error only.
        let msg = error.lines().next().unwrap_or(error);
        self.bar.println(format!(
            "  {} {:<40} {}",
            red("✗"),
            file_name(path),
            red(msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_files: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = total_files.saturating_sub(success_count);
        let warnings = self.warnings.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} files converted  {}",
                green("✔"),
                bold(&success_count.to_string()),
                dim(&format!("{warnings} warnings")),
            );
        } else {
            eprintln!(
                "{} {}/{} files converted  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total_files,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One exam to stdout
  vce2flashquiz exam.pdf

  # One exam to a file, with a time limit
  vce2flashquiz exam.pdf -o exam.md --time-limit 90

  # Every PDF in a directory (writes exam-1.md next to exam-1.pdf, …)
  vce2flashquiz ./exams/

  # Verify the emitted markup parses back to the same questions
  vce2flashquiz --check exam.pdf > /dev/null

  # Inspect PDF metadata only
  vce2flashquiz --inspect-only exam.pdf

  # Structured output (questions, warnings, stats)
  vce2flashquiz --json exam.pdf > exam.json

RECOGNISED LAYOUT:
  Question start   @mc 1) …   @sata 2) …   @tf 3) …   4) …   QUESTION 5
  Option           a) text    A. text
  Answer           = a, c     = ABCD     = true     Correct Answer: B

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   Path to a specific libpdfium
  RUST_LOG          Log filter (overrides --verbose / --quiet)
  VCE2FQ_*          Default for the matching flag, e.g. VCE2FQ_PASS_SCORE=80

EXIT STATUS:
  0 when every file converted (warnings do not count), 1 otherwise.
"#;

/// Convert VCE exam-export PDFs into FlashQuiz markup.
#[derive(Parser, Debug)]
#[command(
    name = "vce2flashquiz",
    version,
    about = "Convert VCE exam-export PDFs into FlashQuiz markup",
    long_about = "Convert VCE exam-export PDFs into FlashQuiz markup. A single file is \
written to stdout (or --output); a directory converts every PDF directly inside it and \
writes one .md per .pdf.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// PDF file or directory of PDFs.
    input: PathBuf,

    /// Write markup to this file instead of stdout (single-file mode).
    #[arg(short, long, env = "VCE2FQ_OUTPUT")]
    output: Option<PathBuf>,

    /// Quiz title (default: first line before question 1, then PDF title).
    #[arg(long, env = "VCE2FQ_TITLE")]
    title: Option<String>,

    /// Time limit in minutes.
    #[arg(long, env = "VCE2FQ_TIME_LIMIT")]
    time_limit: Option<u32>,

    /// Pass score in percent.
    #[arg(long, env = "VCE2FQ_PASS_SCORE", default_value_t = 70,
          value_parser = clap::value_parser!(u8).range(0..=100))]
    pass_score: u8,

    /// Keep question order fixed.
    #[arg(long, env = "VCE2FQ_NO_SHUFFLE")]
    no_shuffle: bool,

    /// Reveal the answer after each question.
    #[arg(long, env = "VCE2FQ_SHOW_ANSWER")]
    show_answer: bool,

    /// Value of the `exam-range` frontmatter key.
    #[arg(long, env = "VCE2FQ_EXAM_RANGE")]
    exam_range: Option<String>,

    /// Number questions 1..n instead of using the printed numbers.
    #[arg(long, env = "VCE2FQ_RENUMBER")]
    renumber: bool,

    /// Vertical tolerance in points for joining text runs into one line.
    #[arg(long, env = "VCE2FQ_LINE_TOLERANCE", default_value_t = 2.0)]
    line_tolerance: f32,

    /// Keyword marking an exhibit reference (repeatable).
    #[arg(long = "exhibit-keyword", env = "VCE2FQ_EXHIBIT_KEYWORDS",
          value_delimiter = ',', default_value = "exhibit")]
    exhibit_keywords: Vec<String>,

    /// Do not resolve or inline exhibit images.
    #[arg(long, env = "VCE2FQ_NO_EXHIBITS")]
    no_exhibits: bool,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "VCE2FQ_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "VCE2FQ_PASSWORD")]
    password: Option<String>,

    /// Number of PDFs converted at once in directory mode.
    #[arg(short, long, env = "VCE2FQ_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Output structured JSON instead of markup.
    #[arg(long, env = "VCE2FQ_JSON")]
    json: bool,

    /// Re-parse the emitted markup and fail if it differs from the questions.
    #[arg(long)]
    check: bool,

    /// Print PDF metadata only, no conversion.
    #[arg(long)]
    inspect_only: bool,

    /// Disable progress bar.
    #[arg(long, env = "VCE2FQ_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "VCE2FQ_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "VCE2FQ_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let kind = classify_input(&cli.input).context("Cannot read input")?;
    let is_dir = matches!(kind, InputKind::Directory(_));

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = is_dir && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    match kind {
        InputKind::File(path) if cli.inspect_only => run_inspect(&cli, &path, &config).await,
        InputKind::File(path) => run_file(&cli, &path, &config).await,
        InputKind::Directory(_) if cli.inspect_only => {
            anyhow::bail!("--inspect-only expects a single PDF file")
        }
        InputKind::Directory(dir) => {
            if cli.output.is_some() {
                anyhow::bail!("--output only applies to a single PDF; directory mode writes <name>.md next to each PDF");
            }
            run_dir(&cli, &dir, &config).await
        }
    }
}

// ── Modes ────────────────────────────────────────────────────────────────────

async fn run_inspect(cli: &Cli, path: &Path, config: &ConversionConfig) -> Result<()> {
    let meta = inspect_with(path, config)
        .await
        .context("Failed to inspect PDF")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&meta).context("Failed to serialize metadata")?
        );
    } else {
        println!("File:         {}", path.display());
        if let Some(ref t) = meta.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {}", a);
        }
        if let Some(ref s) = meta.subject {
            println!("Subject:      {}", s);
        }
        println!("Pages:        {}", meta.page_count);
        println!("PDF Version:  {}", meta.pdf_version);
        if let Some(ref p) = meta.producer {
            println!("Producer:     {}", p);
        }
        if let Some(ref c) = meta.creator {
            println!("Creator:      {}", c);
        }
    }
    Ok(())
}

async fn run_file(cli: &Cli, path: &Path, config: &ConversionConfig) -> Result<()> {
    let output = convert(path, config)
        .await
        .with_context(|| format!("Conversion of {} failed", path.display()))?;

    if cli.check {
        check_round_trip(&output)?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref out_path) = cli.output {
        write_output(out_path, &output.markup).await?;
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.markup.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        print_summary(path, &output.stats, &output.warnings, cli.output.as_deref());
        if cli.check {
            eprintln!("{} markup re-parses to the same questions", green("✔"));
        }
    }
    Ok(())
}

async fn run_dir(cli: &Cli, dir: &Path, config: &ConversionConfig) -> Result<()> {
    let report = convert_dir(dir, config)
        .await
        .with_context(|| format!("Cannot convert directory {}", dir.display()))?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        print_batch_summary(&report, config.progress_callback.is_some());
    }

    if !report.all_succeeded() {
        anyhow::bail!(
            "{} of {} files failed to convert",
            report.failed(),
            report.files.len()
        );
    }
    Ok(())
}

// ── Helpers ──────────────────────────────────────────────────────────────────

/// Fail when the emitted markup does not parse back to the same questions.
fn check_round_trip(output: &ConversionOutput) -> Result<()> {
    let reparsed = parse_markup(&output.markup).context("Emitted markup does not parse")?;
    for (emitted, back) in output.document.questions.iter().zip(&reparsed.questions) {
        if emitted != back {
            anyhow::bail!(
                "Round-trip mismatch at question {}: emitted {:?}, re-parsed {:?}",
                emitted.ordinal,
                emitted,
                back
            );
        }
    }
    if reparsed.questions.len() != output.document.questions.len() {
        anyhow::bail!(
            "Round-trip mismatch: {} questions emitted, {} re-parsed",
            output.document.questions.len(),
            reparsed.questions.len()
        );
    }
    if reparsed.frontmatter != output.document.frontmatter {
        anyhow::bail!("Round-trip mismatch in frontmatter");
    }
    Ok(())
}

async fn write_output(path: &Path, markup: &str) -> Result<()> {
    write_markup(path, markup)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

fn print_summary(
    input: &Path,
    stats: &ConversionStats,
    warnings: &[ParseWarning],
    output: Option<&Path>,
) {
    eprintln!(
        "{}  {} questions from {} blocks  {}/{} pages  {}ms{}",
        if warnings.is_empty() {
            green("✔")
        } else {
            yellow("⚠")
        },
        stats.questions,
        stats.blocks,
        stats.processed_pages,
        stats.total_pages,
        stats.total_duration_ms,
        output
            .map(|p| format!("  →  {}", bold(&p.display().to_string())))
            .unwrap_or_default(),
    );
    print_warnings(input, warnings);
}

fn print_warnings(input: &Path, warnings: &[ParseWarning]) {
    if warnings.is_empty() {
        return;
    }
    let summary = ConversionStats::warning_summary(warnings);
    let counts: Vec<String> = summary.iter().map(|(k, n)| format!("{n} {k}")).collect();
    eprintln!(
        "   {} {}: {}",
        yellow("warnings"),
        file_name(input),
        counts.join(", ")
    );
    for w in warnings {
        eprintln!("     {}", dim(&w.to_string()));
    }
}

fn print_batch_summary(report: &BatchReport, bar_was_shown: bool) {
    for outcome in &report.files {
        match outcome {
            FileOutcome::Converted {
                input,
                output,
                stats,
                warnings,
            } => {
                if !bar_was_shown {
                    eprintln!(
                        "{} {} → {}  {} questions",
                        green("✓"),
                        input.display(),
                        output.display(),
                        stats.questions
                    );
                }
                print_warnings(input, warnings);
            }
            FileOutcome::Failed { input, error } => {
                if !bar_was_shown {
                    eprintln!("{} {}  {}", red("✗"), input.display(), red(error));
                }
            }
        }
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let pages = parse_page_selection(&cli.pages)?;

    let mut builder = ConversionConfig::builder()
        .pass_score(cli.pass_score)
        .shuffle(!cli.no_shuffle)
        .show_answer(cli.show_answer)
        .renumber(cli.renumber)
        .line_tolerance(cli.line_tolerance)
        .exhibit_keywords(cli.exhibit_keywords.iter().cloned())
        .embed_exhibits(!cli.no_exhibits)
        .pages(pages)
        .concurrency(cli.concurrency);

    if let Some(ref title) = cli.title {
        builder = builder.quiz_title(title.clone());
    }
    if let Some(minutes) = cli.time_limit {
        builder = builder.time_limit(minutes);
    }
    if let Some(ref range) = cli.exam_range {
        builder = builder.exam_range(range.clone());
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_page_selection(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: usize = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: usize = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }
        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let pages: Vec<usize> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<usize>()
                    .with_context(|| format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;
        if let Some(&p) = pages.iter().find(|&&p| p < 1) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", p);
        }
        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: usize = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }
    Ok(PageSelection::Single(page))
}
