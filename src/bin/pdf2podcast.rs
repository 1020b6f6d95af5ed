//! CLI binary for pdf2podcast.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PodcastConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2podcast::{
    run_job, AudioStore, InstructionTemplate, JobProgressCallback, JobStage, PodcastConfig,
    ProgressCallback, TtsProvider,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner while extracting and generating, then a per-line bar while the
/// voices are synthesised. Lines finish out of order.
struct CliProgressCallback {
    bar: ProgressBar,
    start_times: Mutex<HashMap<usize, Instant>>,
    voiced: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            voiced: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} lines  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Voicing");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self, line_index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut t| t.remove(&line_index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl JobProgressCallback for CliProgressCallback {
    fn on_stage(&self, stage: JobStage) {
        match stage {
            JobStage::Extracting => {
                self.bar.set_prefix("Extracting");
                self.bar.set_message("reading PDF text…");
            }
            JobStage::Generating => {
                self.bar.set_prefix("Writing");
                self.bar.set_message("asking the model for a dialogue…");
            }
            JobStage::Synthesizing => {}
            JobStage::Assembling => {
                self.bar.set_prefix("Assembling");
                self.bar.set_message("joining audio…");
            }
            JobStage::Done => {
                self.bar.finish_and_clear();
                eprintln!(
                    "{} {} lines voiced",
                    green("✔"),
                    bold(&self.voiced.load(Ordering::SeqCst).to_string())
                );
            }
            JobStage::Failed => {
                self.bar.finish_and_clear();
                eprintln!("{} podcast not produced", red("✘"));
            }
        }
    }

    fn on_generation_retry(&self, attempt: u32, max_attempts: u32, error: &str) {
        self.bar.println(format!(
            "  {} attempt {}/{} rejected: {}",
            cyan("⚠"),
            attempt,
            max_attempts,
            dim(error)
        ));
    }

    fn on_script_ready(&self, total_lines: usize, total_chars: usize) {
        self.activate_bar(total_lines);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Dialogue ready: {total_lines} lines, {total_chars} chars"))
        ));
    }

    fn on_line_start(&self, line_index: usize, _total_lines: usize) {
        if let Ok(mut t) = self.start_times.lock() {
            t.insert(line_index, Instant::now());
        }
        self.bar.set_message(format!("line {}", line_index + 1));
    }

    fn on_line_complete(&self, line_index: usize, total_lines: usize, audio_len: usize) {
        let secs = self.elapsed_secs(line_index);
        self.voiced.fetch_add(1, Ordering::SeqCst);
        self.bar.println(format!(
            "  {} Line {:>3}/{:<3}  {:<10}  {}",
            green("✓"),
            line_index + 1,
            total_lines,
            dim(&format!("{:>6} KiB", audio_len / 1024)),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_line_error(&self, line_index: usize, total_lines: usize, error: &str) {
        let secs = self.elapsed_secs(line_index);
        self.bar.println(format!(
            "  {} Line {:>3}/{:<3}  {}  {}",
            red("✗"),
            line_index + 1,
            total_lines,
            red(error),
            dim(&format!("{secs:.1}s")),
        ));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # One paper, default voices (alloy / echo)
  pdf2podcast paper.pdf

  # Several documents become one conversation
  pdf2podcast intro.pdf chapter1.pdf chapter2.pdf

  # From a URL, English template, different voices
  pdf2podcast https://arxiv.org/pdf/1706.03762 --template podcast \
      --speaker-1-voice nova --speaker-2-voice onyx

  # Fish Audio custom voices
  pdf2podcast --fish-audio --fish-speaker-1 zhou --fish-speaker-2 yang paper.pdf

  # Keep the transcript, print the job result as JSON
  pdf2podcast paper.pdf --transcript paper.txt --json > job.json

  # Delete podcasts older than a day
  pdf2podcast --purge-older-than 86400

TEXT MODELS:
  gpt-4o-mini (default), gpt-4o, o1-preview, o1-mini, or any id the provider accepts

VOICES:
  OpenAI       alloy, echo, fable, onyx, nova, shimmer    (models: tts-1, tts-1-hd)
  Fish Audio   zhou, dong, xing, yang, or a 32-hex reference id

TEMPLATES:
  podcast-zh   Chinese long-form podcast (default)
  podcast      English long-form podcast

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY           OpenAI key (dialogue model and OpenAI voices)
  FISH_AUDIO_API_KEY       Fish Audio key (with --fish-audio)
  OPENAI_BASE_URL          OpenAI-compatible endpoint for speech
  PDF2PODCAST_OUTPUT_DIR   Where finished MP3 files are written
  PDFIUM_LIB_PATH          libpdfium file or directory (else the system library)

  A .env file in the working directory is loaded first.
"#;

/// Turn PDF documents into a two-speaker podcast.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2podcast",
    version,
    about = "Turn PDF documents into a two-speaker podcast",
    long_about = "Extract the text of one or more PDFs, have an LLM write a two-speaker \
dialogue about it, voice every line with a text-to-speech service and write a single MP3 \
plus a transcript.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF paths or HTTP/HTTPS URLs, in conversation order.
    #[arg(required_unless_present = "purge_older_than")]
    inputs: Vec<String>,

    /// LLM model used to write the dialogue.
    #[arg(long, env = "PDF2PODCAST_TEXT_MODEL", default_value = "gpt-4o-mini")]
    text_model: String,

    /// edgequake-llm provider for the dialogue model.
    #[arg(long, env = "PDF2PODCAST_LLM_PROVIDER", default_value = "openai")]
    provider: String,

    /// Sampling temperature for the dialogue model. Unset sends none,
    /// which reasoning models (o1-*) require.
    #[arg(long, env = "PDF2PODCAST_TEMPERATURE")]
    temperature: Option<f32>,

    /// OpenAI speech model: tts-1 or tts-1-hd.
    #[arg(long, env = "PDF2PODCAST_AUDIO_MODEL", default_value = "tts-1")]
    audio_model: String,

    /// OpenAI voice for speaker-1.
    #[arg(long, default_value = "alloy")]
    speaker_1_voice: String,

    /// OpenAI voice for speaker-2.
    #[arg(long, default_value = "echo")]
    speaker_2_voice: String,

    /// Voice the dialogue with Fish Audio instead of OpenAI.
    #[arg(long, env = "PDF2PODCAST_FISH_AUDIO")]
    fish_audio: bool,

    /// Fish Audio voice for speaker-1.
    #[arg(long, default_value = "xing")]
    fish_speaker_1: String,

    /// Fish Audio voice for speaker-2.
    #[arg(long, default_value = "dong")]
    fish_speaker_2: String,

    /// Instruction template: podcast-zh or podcast.
    #[arg(long, env = "PDF2PODCAST_TEMPLATE", default_value = "podcast-zh")]
    template: String,

    /// Maximum TTS requests in flight.
    #[arg(short, long, env = "PDF2PODCAST_CONCURRENCY")]
    concurrency: Option<usize>,

    /// LLM attempts before an invalid dialogue is fatal.
    #[arg(long, env = "PDF2PODCAST_MAX_ATTEMPTS", default_value_t = 4)]
    max_attempts: u32,

    /// Directory receiving the MP3 file.
    #[arg(short, long, env = "PDF2PODCAST_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Also write the transcript to this file.
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Print the whole job result as JSON instead of the transcript.
    #[arg(long)]
    json: bool,

    /// Delete stored podcasts older than SECS, then continue (or exit if no inputs).
    #[arg(long, value_name = "SECS")]
    purge_older_than: Option<u64>,

    /// LLM call timeout in seconds.
    #[arg(long, env = "PDF2PODCAST_API_TIMEOUT", default_value_t = 600)]
    api_timeout: u64,

    /// Per-line TTS timeout in seconds.
    #[arg(long, env = "PDF2PODCAST_TTS_TIMEOUT", default_value_t = 120)]
    tts_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "PDF2PODCAST_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Disable progress bar.
    #[arg(long)]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Library INFO logs are hidden behind the progress bar unless -v.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Retention ────────────────────────────────────────────────────────
    if let Some(secs) = cli.purge_older_than {
        let store = AudioStore::new(output_dir(&cli));
        let removed = store
            .purge_older_than(Duration::from_secs(secs))
            .context("Purge failed")?;
        if !cli.quiet {
            eprintln!(
                "Purged {} podcast(s) from {}",
                removed,
                store.dir().display()
            );
        }
        if cli.inputs.is_empty() {
            return Ok(());
        }
    }

    // ── Job ──────────────────────────────────────────────────────────────
    let progress: Option<ProgressCallback> = if show_progress {
        let cb: ProgressCallback = CliProgressCallback::new();
        Some(cb)
    } else {
        None
    };
    let config = build_config(&cli, progress)?;

    let output = run_job(&cli.inputs, &config)
        .await
        .context("Podcast generation failed")?;

    if let Some(ref path) = cli.transcript {
        tokio::fs::write(path, &output.transcript)
            .await
            .with_context(|| format!("Failed to write transcript to {}", path.display()))?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.transcript.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.transcript.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet {
        eprintln!("{} {}", cyan("♪"), bold(&output.audio_path.display().to_string()));
        eprintln!(
            "   {} lines  /  {} TTS chars  /  {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.dialogue_lines.to_string()),
            dim(&output.stats.tts_chars.to_string()),
            dim(&output.stats.input_tokens.to_string()),
            dim(&output.stats.output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

fn output_dir(cli: &Cli) -> PathBuf {
    cli.output_dir
        .clone()
        .unwrap_or_else(|| PodcastConfig::default().output_dir)
}

/// Map CLI args to `PodcastConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PodcastConfig> {
    let template = InstructionTemplate::by_name(&cli.template).with_context(|| {
        format!(
            "Unknown template '{}'. Known: {}",
            cli.template,
            InstructionTemplate::NAMES.join(", ")
        )
    })?;

    let tts_provider = if cli.fish_audio {
        TtsProvider::FishAudio
    } else {
        TtsProvider::OpenAi
    };

    let mut builder = PodcastConfig::from_env()
        .text_model(&cli.text_model)
        .llm_provider_name(&cli.provider)
        .tts_provider(tts_provider)
        .audio_model(&cli.audio_model)
        .speaker_voices(&cli.speaker_1_voice, &cli.speaker_2_voice)
        .fish_voices(&cli.fish_speaker_1, &cli.fish_speaker_2)
        .template(template)
        .max_attempts(cli.max_attempts)
        .api_timeout_secs(cli.api_timeout)
        .tts_timeout_secs(cli.tts_timeout)
        .download_timeout_secs(cli.download_timeout)
        .output_dir(output_dir(cli));

    if let Some(n) = cli.concurrency {
        builder = builder.concurrency(n);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
