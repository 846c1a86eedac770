//! CLI binary for edgequake-contentgen.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_contentgen::blog::{
    self, Audience, BlogRequest, BlogType, ContentGoal, Industry, Tone,
};
use edgequake_contentgen::config::{model_description, AVAILABLE_MODELS};
use edgequake_contentgen::{
    convert, inspect, ConversionConfig, ConversionProgressCallback, OutputFormat,
    ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner for the current stage plus one log
/// line per crew step.
struct CliProgressCallback {
    bar: ProgressBar,
    step_started: Mutex<Option<Instant>>,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style =
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            step_started: Mutex::new(None),
        })
    }

    fn step_elapsed(&self) -> f64 {
        self.step_started
            .lock()
            .ok()
            .and_then(|mut g| g.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: Stage) {
        self.bar.set_prefix(stage.to_string());
        self.bar.set_message("");
    }

    fn on_step_start(&self, step: usize, total: usize, role: &str) {
        if let Ok(mut g) = self.step_started.lock() {
            *g = Some(Instant::now());
        }
        self.bar.set_prefix(format!("Step {step}/{total}"));
        self.bar.set_message(role.to_string());
    }

    fn on_step_complete(&self, step: usize, total: usize, role: &str, output_len: usize) {
        let secs = self.step_elapsed();
        self.bar.println(format!(
            "  {} Step {}/{}  {:<20}  {}  {}",
            green("✓"),
            step,
            total,
            role,
            dim(&format!("{output_len:>6} chars")),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_step_error(&self, step: usize, total: usize, role: &str, error: &str) {
        let secs = self.step_elapsed();
        let msg: String = if error.chars().count() > 80 {
            let mut m: String = error.chars().take(79).collect();
            m.push('\u{2026}');
            m
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Step {}/{}  {:<20}  {}  {}",
            red("✗"),
            step,
            total,
            role,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
    }

    fn on_conversion_complete(&self, files_written: usize) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} file(s) written",
            green("✔"),
            bold(&files_written.to_string())
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Research paper → blog-style PDF and HTML
  contentgen convert paper.pdf

  # HTML only, with brand guidelines, keeping the original language
  contentgen convert --format html --no-translate --brand brand.pdf paper.pdf

  # From a URL
  contentgen convert https://arxiv.org/pdf/1706.03762

  # Blog post with quality and originality reports
  contentgen blog --topic "Vector databases" --audience Engineer --tone Technical \
      --words 1200 --analyze --check-originality

  # Inspect extracted text (no API key needed)
  contentgen inspect paper.pdf

  # Upload UI on http://127.0.0.1:8501
  contentgen serve

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  GOOGLE_API_KEY          Copied into GEMINI_API_KEY when that is unset
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
  CONTENTGEN_OUTPUT_DIR   Root directory for exports (default: exports)
  RUST_LOG                Log filter, e.g. edgequake_contentgen=debug
"#;

/// Turn research papers and blog topics into polished documents with LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "contentgen",
    version,
    about = "Turn research PDFs and blog topics into polished PDF/HTML documents",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CONTENTGEN_VERBOSE")]
    verbose: bool,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "CONTENTGEN_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert a research PDF (path or URL) into blog-style documents.
    Convert(ConvertArgs),
    /// Write a blog post about a topic.
    Blog(BlogArgs),
    /// Show extracted text and encoding diagnostics for a PDF.
    Inspect {
        /// Local PDF file path or HTTP/HTTPS URL.
        input: String,

        /// Output the report as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Serve the upload UI.
    #[cfg(feature = "server")]
    Serve(ServeArgs),
}

/// Options shared by every command that calls a model.
#[derive(Args, Debug, Clone)]
struct LlmArgs {
    /// LLM model ID.
    #[arg(long, env = "EDGEQUAKE_MODEL", long_help = model_help())]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama, …
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// API key; copied into GEMINI_API_KEY before anything runs.
    #[arg(long, hide_env_values = true)]
    api_key: Option<String>,

    /// Root directory for exported documents.
    #[arg(long, env = "CONTENTGEN_OUTPUT_DIR", default_value = "exports")]
    output_dir: PathBuf,

    /// Which documents to write: pdf, html or both.
    #[arg(long, env = "CONTENTGEN_FORMAT", default_value = "both")]
    format: OutputFormat,

    /// Retries per LLM step.
    #[arg(long, env = "CONTENTGEN_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "CONTENTGEN_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Brand guidelines PDF used for visual formatting.
    #[arg(long)]
    brand: Option<PathBuf>,

    /// Skip the translation to English that runs before the crew.
    #[arg(long)]
    no_translate: bool,

    /// Output structured JSON (ConversionOutput) instead of a summary.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[derive(Args, Debug)]
struct BlogArgs {
    /// What the post is about.
    #[arg(long)]
    topic: String,

    #[arg(long, default_value = "Student")]
    audience: Audience,

    #[arg(long, default_value = "Conversational")]
    tone: Tone,

    #[arg(long, default_value = "EdTech")]
    industry: Industry,

    #[arg(long = "type", default_value = "How-to Guide")]
    blog_type: BlogType,

    #[arg(long, default_value = "Educate")]
    goal: ContentGoal,

    /// Word limit, 700–2000 in steps of 50.
    #[arg(long = "words", default_value_t = blog::DEFAULT_WORDS)]
    word_limit: u32,

    /// Also produce a content-quality analysis.
    #[arg(long)]
    analyze: bool,

    /// Also run the originality check.
    #[arg(long)]
    check_originality: bool,

    /// Print the post without writing blog_post.pdf / blog_post.html.
    #[arg(long)]
    no_export: bool,

    /// Output structured JSON instead of Markdown.
    #[arg(long)]
    json: bool,

    #[command(flatten)]
    llm: LlmArgs,
}

#[cfg(feature = "server")]
#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, env = "CONTENTGEN_BIND", default_value = "127.0.0.1")]
    bind: String,

    #[arg(long, env = "CONTENTGEN_PORT", default_value_t = 8501)]
    port: u16,

    #[command(flatten)]
    llm: LlmArgs,
}

fn model_help() -> String {
    let mut s = String::from("Model to use. Available:\n");
    for (id, blurb) in AVAILABLE_MODELS {
        s.push_str(&format!("  {id:<18} {blurb}\n"));
    }
    s
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── API key bridging ─────────────────────────────────────────────────
    // Must happen before the runtime starts any threads.
    let api_key = match &cli.command {
        Command::Convert(a) => a.llm.api_key.clone(),
        Command::Blog(a) => a.llm.api_key.clone(),
        Command::Inspect { .. } => None,
        #[cfg(feature = "server")]
        Command::Serve(a) => a.llm.api_key.clone(),
    };
    bridge_api_key(api_key);

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active.
    let json = match &cli.command {
        Command::Convert(a) => a.json,
        Command::Blog(a) => a.json,
        Command::Inspect { json, .. } => *json,
        #[cfg(feature = "server")]
        Command::Serve(_) => false,
    };
    #[cfg(feature = "server")]
    let serving = matches!(cli.command, Command::Serve(_));
    #[cfg(not(feature = "server"))]
    let serving = false;
    let show_progress = !cli.no_progress && !json && !serving;

    let filter = if cli.verbose {
        "debug"
    } else if show_progress {
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

    let runtime = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    runtime.block_on(run(cli, show_progress))
}

/// `--api-key` wins; otherwise `GOOGLE_API_KEY` fills an unset `GEMINI_API_KEY`.
fn bridge_api_key(flag: Option<String>) {
    if let Some(key) = flag.filter(|k| !k.trim().is_empty()) {
        std::env::set_var("GEMINI_API_KEY", key);
        return;
    }
    let gemini_set = std::env::var("GEMINI_API_KEY").is_ok_and(|v| !v.trim().is_empty());
    if !gemini_set {
        if let Ok(google) = std::env::var("GOOGLE_API_KEY") {
            if !google.trim().is_empty() {
                std::env::set_var("GEMINI_API_KEY", google);
            }
        }
    }
}

async fn run(cli: Cli, show_progress: bool) -> Result<()> {
    let progress: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    match cli.command {
        Command::Convert(args) => run_convert(args, progress).await,
        Command::Blog(args) => run_blog(args, progress).await,
        Command::Inspect { input, json } => run_inspect(&input, json).await,
        #[cfg(feature = "server")]
        Command::Serve(args) => run_serve(args).await,
    }
}

/// Map CLI args to `ConversionConfig`.
fn build_config(llm: &LlmArgs, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .output_dir(&llm.output_dir)
        .output_format(llm.format)
        .max_retries(llm.max_retries)
        .api_timeout_secs(llm.api_timeout);

    if let Some(ref m) = llm.model {
        if model_description(m).is_none() {
            tracing::warn!("Model '{}' is not in the tested list", m);
        }
        builder = builder.model(m.clone());
    }
    if let Some(ref p) = llm.provider {
        builder = builder.provider_name(p.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn run_convert(args: ConvertArgs, progress: Option<ProgressCallback>) -> Result<()> {
    let mut config = build_config(&args.llm, progress)?;
    config.translate = !args.no_translate;
    config.brand_guidelines = args.brand.clone();

    let output = convert(&args.input, &config)
        .await
        .context("Conversion failed")?;

    if args.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    for file in &output.exports.files {
        println!("{}", file.path.display());
    }
    for e in &output.exports.errors {
        eprintln!("  {} {}", red("✗"), e);
    }
    eprintln!(
        "   {} pages  /  {} steps  /  {} tokens in  /  {} tokens out  —  {}ms total",
        output.stats.text_pages,
        output.steps.len(),
        dim(&output.stats.total_input_tokens.to_string()),
        dim(&output.stats.total_output_tokens.to_string()),
        output.stats.total_duration_ms,
    );
    Ok(())
}

async fn run_blog(args: BlogArgs, progress: Option<ProgressCallback>) -> Result<()> {
    let config = build_config(&args.llm, progress)?;
    let request = BlogRequest::new(&args.topic)
        .audience(args.audience)
        .tone(args.tone)
        .industry(args.industry)
        .blog_type(args.blog_type)
        .goal(args.goal)
        .word_limit(args.word_limit)
        .context("Invalid blog request")?;

    let post = blog::write_blog(&request, &config)
        .await
        .context("Blog generation failed")?;

    let exports = if args.no_export {
        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_complete(0);
        }
        None
    } else {
        Some(blog::export_blog(&post, &config).context("Export failed")?)
    };

    let analysis = if args.analyze {
        Some(
            blog::analyze_content(&post.markdown, &config)
                .await
                .context("Content analysis failed")?,
        )
    } else {
        None
    };

    let originality = if args.check_originality {
        Some(
            blog::check_originality(&post.markdown, &config)
                .await
                .context("Originality check failed")?,
        )
    } else {
        None
    };

    if args.json {
        let value = serde_json::json!({
            "post": post,
            "exports": exports,
            "analysis": analysis,
            "originality": originality,
        });
        let json = serde_json::to_string_pretty(&value).context("Failed to serialise output")?;
        println!("{json}");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(post.markdown.as_bytes())
        .context("Failed to write to stdout")?;

    if let Some(ref a) = analysis {
        writeln!(handle, "\n---\n\n## Content Analysis\n\n{}", a.trim_end())
            .context("Failed to write to stdout")?;
    }
    if let Some(ref o) = originality {
        let verdict = match (o.score, o.band) {
            (Some(score), Some(band)) => format!("{score}/100 ({band})"),
            _ => "no score reported".to_string(),
        };
        writeln!(
            handle,
            "\n---\n\n## Originality: {}\n\n{}",
            verdict,
            o.report.trim_end()
        )
        .context("Failed to write to stdout")?;
    }

    if let Some(ref report) = exports {
        for file in &report.files {
            eprintln!("  {} {}", green("✓"), file.path.display());
        }
        for e in &report.errors {
            eprintln!("  {} {}", red("✗"), e);
        }
    }
    Ok(())
}

async fn run_inspect(input: &str, json: bool) -> Result<()> {
    let report = inspect(input).await.context("Failed to inspect PDF")?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
        return Ok(());
    }

    println!("{}", bold(&format!("File:           {}", report.source)));
    println!("Size:           {} bytes", report.file_bytes);
    println!("Pages:          {}", report.page_count);
    println!("Pages w/ text:  {}", report.text_pages);
    println!("Raw chars:      {}", report.raw_chars);
    println!("Processed:      {}", report.processed_chars);
    println!();
    println!("{}", cyan("Encoding"));
    println!("{}", report.encoding);
    println!();
    println!("{}", cyan("Raw text preview"));
    println!("{}", report.raw_preview);
    println!();
    println!("{}", cyan("Processed text preview"));
    println!("{}", report.processed_preview);
    Ok(())
}

#[cfg(feature = "server")]
async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = build_config(&args.llm, None)?;
    // Fail at startup rather than on the first upload.
    edgequake_contentgen::pipeline::llm::resolve_backend(&config)
        .context("LLM provider is not configured")?;
    eprintln!(
        "{} Serving on {}",
        cyan("◆"),
        bold(&format!("http://{}:{}", args.bind, args.port))
    );
    edgequake_contentgen::server::run_serve(config, &args.bind, args.port)
        .await
        .context("Server failed")
}
