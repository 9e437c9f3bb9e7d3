mod echo;

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use lectern_core::article::unique_slug;
use lectern_core::fetch::parse_http_url;
use lectern_core::{ExtractedArticle, Pipeline, PipelineConfig, render_document, speech_segments};
use owo_colors::OwoColorize;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;
use url::Url;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Line printed between speech segments.
const SEGMENT_SEPARATOR: &str = "\n---\n";

/// Output format for extracted articles
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
    Speech,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Json => "json",
            Self::Speech => "txt",
        }
    }
}

/// Turn web pages and email into clean Markdown and speech-ready text
#[derive(Parser, Debug)]
#[command(name = "lectern")]
#[command(version)]
#[command(about = "Turn web pages and email into clean Markdown and speech-ready text", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Pipeline config file (JSON)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch and extract one or more web pages
    Url(UrlArgs),
    /// Extract a .eml file, or every .eml file in a directory
    Email(EmailArgs),
    /// Print speech segments for a Markdown file
    Speech(SpeechArgs),
    /// Generate a shell completion script
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Output file, or a directory when several articles are written (default: stdout)
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown, value_name = "FORMAT")]
    format: OutputFormat,

    /// Include TOML frontmatter (Markdown only)
    #[arg(long)]
    frontmatter: bool,
}

#[derive(Args, Debug)]
struct UrlArgs {
    /// Pages to fetch; several are fetched concurrently
    #[arg(value_name = "URL", required = true, value_parser = parse_url)]
    urls: Vec<Url>,

    #[command(flatten)]
    output: OutputArgs,

    /// HTTP timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,
}

#[derive(Args, Debug)]
struct EmailArgs {
    /// A .eml file, or a directory of them
    #[arg(value_name = "FILE|DIR")]
    input: PathBuf,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args, Debug)]
struct SpeechArgs {
    /// Markdown file, or "-" for stdin
    #[arg(value_name = "FILE")]
    input: String,

    /// Maximum characters per segment
    #[arg(long, value_name = "N")]
    max_chars: Option<usize>,
}

fn parse_url(value: &str) -> Result<Url, String> {
    parse_http_url(value).map_err(|e| e.to_string())
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    if verbose {
        filter = filter.add_directive("lectern_core=debug".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            PipelineConfig::load(path).with_context(|| format!("Failed to load config: {}", path.display()))
        }
        None => PipelineConfig::load_default().context("Failed to load default config"),
    }
}

fn render(article: &ExtractedArticle, output: &OutputArgs, pipeline: &Pipeline) -> anyhow::Result<String> {
    Ok(match output.format {
        OutputFormat::Markdown if output.frontmatter => render_document(article),
        OutputFormat::Markdown => format!("{}\n", article.content_markdown),
        OutputFormat::Json => {
            format!("{}\n", serde_json::to_string_pretty(article).context("Failed to serialize article")?)
        }
        OutputFormat::Speech => format!("{}\n", pipeline.speech_segments(article).join(SEGMENT_SEPARATOR)),
    })
}

/// Writes to stdout, to one file, or to one file per article in a directory.
fn write_articles(articles: &[ExtractedArticle], output: &OutputArgs, pipeline: &Pipeline) -> anyhow::Result<()> {
    let Some(first) = articles.first() else {
        return Ok(());
    };

    match &output.output {
        None => {
            let rendered = articles
                .iter()
                .map(|article| render(article, output, pipeline))
                .collect::<anyhow::Result<Vec<_>>>()?;
            print!("{}", rendered.join("\n"));
        }
        Some(dir) if articles.len() > 1 || dir.is_dir() => {
            fs::create_dir_all(dir).with_context(|| format!("Failed to create directory: {}", dir.display()))?;
            let extension = output.format.extension();
            for article in articles {
                let stem = unique_slug(&article.slug(), dir, extension);
                let path = dir.join(format!("{stem}.{extension}"));
                fs::write(&path, render(article, output, pipeline)?)
                    .with_context(|| format!("Failed to write to file: {}", path.display()))?;
                echo::print_success(&format!("Wrote {}", path.display().bright_white()));
            }
        }
        Some(path) => {
            fs::write(path, render(first, output, pipeline)?)
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
    }
    Ok(())
}

async fn run_url(args: UrlArgs, mut config: PipelineConfig, verbose: bool) -> anyhow::Result<()> {
    if let Some(timeout) = args.timeout {
        config.fetch.timeout = timeout;
    }
    if let Some(user_agent) = args.user_agent {
        config.fetch.user_agent = user_agent;
    }
    config.validate().context("Invalid configuration")?;

    let pipeline = Arc::new(Pipeline::with_config(config));
    let total = args.urls.len();
    tracing::debug!(urls = total, "fetching pages");

    let mut tasks = JoinSet::new();
    for (index, url) in args.urls.into_iter().enumerate() {
        let pipeline = Arc::clone(&pipeline);
        tasks.spawn(async move {
            let started = Instant::now();
            let result = pipeline.fetch_and_extract(url.as_str()).await;
            (index, url, result, started.elapsed())
        });
    }

    let mut finished = Vec::with_capacity(total);
    while let Some(joined) = tasks.join_next().await {
        finished.push(joined.context("Extraction task panicked")?);
    }
    finished.sort_by_key(|(index, ..)| *index);

    let mut articles = Vec::with_capacity(total);
    for (index, url, result, elapsed) in finished {
        match result {
            Ok(article) => {
                if verbose {
                    echo::print_step(index + 1, total, &format!("Extracted {}", url.as_str().underline()));
                    echo::print_article_summary(&article);
                    echo::print_timing("Elapsed", elapsed);
                }
                articles.push(article);
            }
            Err(err) => echo::print_error(&format!("{}: {}", url, err)),
        }
    }

    write_articles(&articles, &args.output, &pipeline)?;

    if articles.is_empty() {
        bail!("No page could be extracted ({} failed)", total);
    }
    Ok(())
}

fn run_email(args: EmailArgs, config: PipelineConfig, verbose: bool) -> anyhow::Result<()> {
    let pipeline = Pipeline::with_config(config);

    if !args.input.is_dir() {
        let article = pipeline
            .parse_email_file(&args.input)
            .with_context(|| format!("Failed to parse email: {}", args.input.display()))?;
        if verbose {
            echo::print_article_summary(&article);
        }
        return write_articles(&[article], &args.output, &pipeline);
    }

    if verbose {
        echo::print_info(&format!("Importing every .eml file in {}", args.input.display()));
    }
    tracing::debug!(dir = %args.input.display(), "importing email directory");
    let report = pipeline
        .import_email_dir(&args.input)
        .with_context(|| format!("Failed to read directory: {}", args.input.display()))?;

    for (path, err) in &report.failed {
        echo::print_error(&format!("{}: {}", path.display(), err));
    }
    echo::print_batch_summary(&report);

    if report.total() == 0 {
        echo::print_warning("No .eml files found");
        return Ok(());
    }

    let all_failed = report.all_failed();
    let articles: Vec<ExtractedArticle> = report.processed.into_iter().map(|(_, article)| article).collect();
    write_articles(&articles, &args.output, &pipeline)?;

    if all_failed {
        bail!("Every message in {} failed to import", args.input.display());
    }
    Ok(())
}

/// Drops a leading `+++` front matter block.
fn strip_front_matter(markdown: &str) -> &str {
    markdown
        .strip_prefix("+++\n")
        .and_then(|rest| rest.split_once("\n+++\n"))
        .map_or(markdown, |(_, body)| body)
}

fn run_speech(args: SpeechArgs, config: PipelineConfig) -> anyhow::Result<()> {
    let markdown = if args.input == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer).context("Failed to read from stdin")?;
        buffer
    } else {
        fs::read_to_string(&args.input).with_context(|| format!("Failed to read file: {}", args.input))?
    };

    let max_chars = args.max_chars.unwrap_or(config.speech.max_chunk_chars);
    if max_chars == 0 {
        bail!("--max-chars must be greater than 0");
    }

    let segments = speech_segments(strip_front_matter(&markdown), max_chars);
    if !segments.is_empty() {
        println!("{}", segments.join(SEGMENT_SEPARATOR));
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    if cli.verbose {
        echo::print_banner();
    }

    match cli.command {
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "lectern", &mut io::stdout());
            Ok(())
        }
        Command::Url(args) => run_url(args, load_config(cli.config.as_deref())?, cli.verbose).await,
        Command::Email(args) => run_email(args, load_config(cli.config.as_deref())?, cli.verbose),
        Command::Speech(args) => run_speech(args, load_config(cli.config.as_deref())?),
    }
}
