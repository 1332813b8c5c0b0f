//! CLI binary for pdf-rulecheck.
//!
//! A thin shim over the library crate: `serve` runs the HTTP service,
//! `extract` prints a document's text, `check` judges rules against it.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use pdf_rulecheck::pipeline::input::load_pdf;
use pdf_rulecheck::pipeline::pdfium;
use pdf_rulecheck::server::{self, AppState};
use pdf_rulecheck::{
    check_document, EvaluationProgressCallback, EvaluatorConfig, ProgressCallback, RuleEvaluator,
    RuleVerdict, ServerConfig, TextExtractor,
};
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const SPINNER: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress for `check`: one bar over the rule list and one log
/// line per verdict.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {pos:>3}/{len} rules  ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(SPINNER),
        );
        bar.set_prefix("Checking");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl EvaluationProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_rules: usize) {
        self.bar.set_length(total_rules as u64);
        self.bar.reset_eta();
    }

    fn on_rule_start(&self, index: usize, _total: usize, _rule: &str) {
        self.bar.set_message(format!("rule {}", index + 1));
    }

    fn on_rule_error(&self, _index: usize, _total: usize, _error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
    }

    fn on_rule_complete(&self, index: usize, total: usize, verdict: &RuleVerdict) {
        let mark = if verdict.status.is_pass() {
            green("✓")
        } else {
            red("✗")
        };
        let rule: String = verdict.rule.chars().take(60).collect();
        self.bar.println(format!(
            "  {mark} Rule {:>3}/{:<3}  {:<60}  {}",
            index + 1,
            total,
            rule,
            dim(&format!("{:>3}%", verdict.confidence)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_rules: usize, passed: usize) {
        self.bar.finish_and_clear();
        let errors = self.errors.load(Ordering::SeqCst);
        eprintln!(
            "{} {}/{} rules passed{}",
            if passed == total_rules {
                green("✔")
            } else {
                red("✘")
            },
            bold(&passed.to_string()),
            total_rules,
            if errors > 0 {
                format!("  ({errors} LLM calls failed)")
            } else {
                String::new()
            }
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on :4000
  pdf-rulecheck serve

  # Print the text of a local or remote PDF
  pdf-rulecheck extract invoice.pdf
  pdf-rulecheck extract https://example.com/contract.pdf --json

  # Judge rules against a document
  pdf-rulecheck check invoice.pdf --rule "States a total amount" --rule "Is dated"
  pdf-rulecheck check contract.pdf --rules-file rules.txt --json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Google Gemini API key (model: GEMINI_MODEL, default gemini-2.0-flash)
  OPENAI_API_KEY            OpenAI API key
  ANTHROPIC_API_KEY         Anthropic API key
  EDGEQUAKE_LLM_PROVIDER    Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL           Override model ID
  PORT                      Port for `serve`
  PDF_RULECHECK_PDFIUM_LIB  Path to an existing libpdfium; skips the download
  PDF_RULECHECK_CACHE_DIR   Override the pdfium cache directory

  A `.env` file in the working directory is loaded first.
"#;

/// Check PDF documents against free-text rules with an LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf-rulecheck",
    version,
    about = "Check PDF documents against free-text rules with an LLM",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "PDF_RULECHECK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "PDF_RULECHECK_QUIET")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Extract and print the text of a PDF.
    Extract(ExtractArgs),
    /// Extract a PDF, then judge rules against its text.
    Check(CheckArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// TCP port.
    #[arg(short, long, env = "PORT", default_value_t = 4000)]
    port: u16,

    /// Directory for uploaded PDFs.
    #[arg(long, env = "PDF_RULECHECK_UPLOAD_DIR", default_value = "uploads")]
    upload_dir: PathBuf,

    /// Document served by POST /api/check/pdf/sample.
    #[arg(long, env = "PDF_RULECHECK_SAMPLE_PDF", default_value = "uploads/sample.pdf")]
    sample_pdf: PathBuf,

    /// Directory exposed under /pdfium/standard_fonts.
    #[arg(long, env = "PDF_RULECHECK_FONTS_DIR", default_value = "assets/standard_fonts")]
    fonts_dir: PathBuf,

    /// Upload size limit in MiB.
    #[arg(long, env = "PDF_RULECHECK_MAX_UPLOAD_MB", default_value_t = 25)]
    max_upload_mb: usize,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct ExtractArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Print the ExtractionResult as JSON.
    #[arg(long)]
    json: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF_RULECHECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// A rule to check (repeatable).
    #[arg(short, long = "rule", value_name = "RULE")]
    rules: Vec<String>,

    /// File with one rule per line (blank lines and `#` comments skipped).
    #[arg(long)]
    rules_file: Option<PathBuf>,

    /// Print the CheckReport as JSON.
    #[arg(long)]
    json: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF_RULECHECK_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    #[command(flatten)]
    llm: LlmArgs,
}

/// Flags shared by every command that talks to an LLM.
#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM provider: gemini, openai, anthropic, ollama, ...
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// LLM model ID (e.g. gemini-2.0-flash, gpt-4.1-mini).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "PDF_RULECHECK_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max LLM output tokens per rule.
    #[arg(long, env = "PDF_RULECHECK_MAX_TOKENS", default_value_t = 1024)]
    max_tokens: usize,

    /// Retries per rule on LLM failure.
    #[arg(long, env = "PDF_RULECHECK_MAX_RETRIES", default_value_t = 2)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "PDF_RULECHECK_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Rules evaluated at once.
    #[arg(short, long, env = "PDF_RULECHECK_CONCURRENCY", default_value_t = 1)]
    concurrency: usize,

    /// Document characters sent with each rule.
    #[arg(long, env = "PDF_RULECHECK_CHAR_LIMIT", default_value_t = 3500)]
    char_limit: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The `check` progress bar provides the feedback that matters, so INFO
    // library logs are muted while it is active.
    let bar_active = matches!(&cli.command, Command::Check(args) if !args.json) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || bar_active {
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

    match cli.command {
        Command::Serve(args) => {
            prefetch_pdfium(cli.quiet);
            if let Err(e) = tokio::task::block_in_place(pdfium::warm_up) {
                tracing::warn!("{e}; uploads will be read with pdf-extract");
            }
            run_serve(args).await
        }
        Command::Extract(args) => {
            prefetch_pdfium(cli.quiet || args.json);
            run_extract(args).await
        }
        Command::Check(args) => {
            prefetch_pdfium(cli.quiet || args.json);
            let show_progress = !cli.quiet && !args.json;
            run_check(args, show_progress).await
        }
    }
}

// ── PDFium prefetch ──────────────────────────────────────────────────────────

/// Download PDFium up front so the first request doesn't pay for it.
///
/// Failure only warns: extraction falls back to pdf-extract.
fn prefetch_pdfium(quiet: bool) {
    if pdfium_fetch::cached_library().is_some() {
        return;
    }

    let result = if quiet {
        tokio::task::block_in_place(|| pdfium_fetch::ensure_library(None))
    } else {
        let dl_bar = ProgressBar::new(0);
        dl_bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  \
                 [{bar:42.green/238}] {bytes}/{total_bytes}  ETA {eta_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(SPINNER),
        );
        dl_bar.set_prefix("PDF engine");
        dl_bar.enable_steady_tick(Duration::from_millis(80));

        let bar = dl_bar.clone();
        // block_in_place keeps the borrowed callback valid while the
        // blocking download runs off the async hot path.
        let result = tokio::task::block_in_place(|| {
            pdfium_fetch::ensure_library(Some(&|downloaded, total| {
                if let Some(t) = total {
                    if bar.length().unwrap_or(0) != t {
                        bar.set_length(t);
                    }
                }
                bar.set_position(downloaded);
            }))
        });
        match &result {
            Ok(_) => dl_bar.finish_with_message("ready ✓"),
            Err(_) => dl_bar.abandon(),
        }
        result
    };

    if let Err(e) = result {
        tracing::warn!("PDFium unavailable ({e}); extraction will use pdf-extract");
    }
}

// ── Commands ─────────────────────────────────────────────────────────────────

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ServerConfig {
        host: args.host,
        port: args.port,
        upload_dir: args.upload_dir,
        sample_pdf: args.sample_pdf,
        fonts_dir: args.fonts_dir,
        max_upload_bytes: args.max_upload_mb.saturating_mul(1024 * 1024),
        ..ServerConfig::default()
    };

    let evaluator = RuleEvaluator::connect_or_degrade(build_config(&args.llm, None)?);
    let state = AppState::from_config(&config, evaluator)
        .await
        .context("Failed to prepare upload directory")?;

    server::serve(state, &config)
        .await
        .with_context(|| format!("Server on {} failed", config.bind_addr()))
}

async fn run_extract(args: ExtractArgs) -> Result<()> {
    let pdf = load_pdf(&args.input, args.download_timeout)
        .await
        .context("Failed to load PDF")?;
    let result = TextExtractor::default()
        .extract(pdf.bytes)
        .await
        .context("Extraction failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
        println!("{json}");
    } else {
        println!("File:         {}", pdf.name);
        println!("Pages:        {}", result.page_count);
        println!("Text length:  {}", result.text.chars().count());
        println!();
        let preview: String = result.text.chars().take(800).collect();
        println!("{preview}");
    }
    Ok(())
}

async fn run_check(args: CheckArgs, show_progress: bool) -> Result<()> {
    let mut rules = args.rules.clone();
    if let Some(ref path) = args.rules_file {
        let contents = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read rules from {:?}", path))?;
        rules.extend(parse_rules_file(&contents));
    }
    if rules.is_empty() {
        anyhow::bail!("No rules provided. Use --rule or --rules-file.");
    }

    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn EvaluationProgressCallback>)
    } else {
        None
    };
    let evaluator =
        RuleEvaluator::connect(build_config(&args.llm, progress)?).context("LLM setup failed")?;

    let pdf = load_pdf(&args.input, args.download_timeout)
        .await
        .context("Failed to load PDF")?;
    let report = check_document(pdf.bytes, rules.as_slice(), &TextExtractor::default(), &evaluator)
        .await
        .context("Check failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "{}  {} pages, {} chars",
        bold(&pdf.name),
        report.extraction.page_count,
        report.extraction.text.chars().count()
    );
    for v in &report.verdicts {
        let mark = if v.status.is_pass() {
            green("PASS")
        } else {
            red("FAIL")
        };
        println!("\n{mark} {} {}", bold(&v.rule), dim(&format!("({}%)", v.confidence)));
        if !v.evidence.is_empty() {
            println!("  evidence:  {}", v.evidence);
        }
        if !v.reasoning.is_empty() {
            println!("  reasoning: {}", v.reasoning);
        }
    }
    Ok(())
}

/// Map CLI flags to `EvaluatorConfig`.
fn build_config(llm: &LlmArgs, progress: Option<ProgressCallback>) -> Result<EvaluatorConfig> {
    let mut builder = EvaluatorConfig::builder()
        .temperature(llm.temperature)
        .max_tokens(llm.max_tokens)
        .max_retries(llm.max_retries)
        .api_timeout_secs(llm.api_timeout)
        .concurrency(llm.concurrency)
        .document_char_limit(llm.char_limit);

    if let Some(ref provider) = llm.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref model) = llm.model {
        builder = builder.model(model);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// One rule per non-empty line; `#` starts a comment line.
fn parse_rules_file(contents: &str) -> Vec<String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect()
}
