mod age;
mod app;
mod config;
mod insight;
mod render;
mod session;
mod validate;

use std::io::Write;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use app::App;
use chrono::{Local, NaiveDateTime};
use clap::Parser;
use config::{DEFAULT_ENDPOINT, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS, InsightConfig};
use insight::{ActiveGenerator, TextGenerator};
use render::{INSIGHT_LOADING, render_insight, render_json, render_result};
use session::{InsightSlot, Phase};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "chronos", version)]
#[command(about = "Calculate your exact age and get a historical fact about your birth date")]
struct Cli {
    /// Date of birth: YYYY-MM-DD, optionally followed by THH:MM[:SS].
    /// Without it, dates are read from stdin one per line.
    birth_date: Option<String>,

    /// Treat this moment as "now" instead of the local clock
    #[arg(long, value_name = "DATETIME", value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    /// Print JSON documents instead of text panels. With a single date the
    /// document is printed once the insight has resolved; interactively a
    /// document is printed per date and again when its insight arrives.
    #[arg(long)]
    json: bool,

    /// Skip the historical insight request
    #[arg(long)]
    no_insight: bool,

    /// Keep reading dates from stdin; each new date supersedes the previous one
    #[arg(short, long)]
    interactive: bool,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini model used for insights
    #[arg(long, env = "CHRONOS_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Base URL of the generative language API
    #[arg(long, env = "CHRONOS_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    endpoint: String,

    /// Insight request timeout in seconds
    #[arg(long, env = "CHRONOS_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,
}

impl Cli {
    fn insight_config(&self) -> InsightConfig {
        InsightConfig {
            enabled: !self.no_insight,
            api_key: self.api_key.clone(),
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn parse_now(s: &str) -> Result<NaiveDateTime, String> {
    validate::parse_date_time(s.trim())
        .ok_or_else(|| format!("expected YYYY-MM-DD[THH:MM[:SS]], got {s:?}"))
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(error) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("global logger initialization failed: {}", error);
    }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging();

    let config = cli.insight_config();
    config.validate().context("invalid insight configuration")?;
    let mut app = App::new(ActiveGenerator::from_config(&config));
    let mut console = Console::new(std::io::stdout(), std::io::stderr(), cli.json);

    let succeeded = match cli.birth_date.as_deref() {
        Some(input) if !cli.interactive => {
            let now = cli.now.unwrap_or_else(local_now);
            run_once(&mut app, input, now, &mut console).await?
        }
        first => {
            let stdin = BufReader::new(tokio::io::stdin());
            run_interactive(&mut app, stdin, first, cli.now, &mut console).await?;
            true
        }
    };

    Ok(if succeeded {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Where results, insights and input errors are written.
struct Console<O, E> {
    out: O,
    err: E,
    json: bool,
}

impl<O: Write, E: Write> Console<O, E> {
    fn new(out: O, err: E, json: bool) -> Self {
        Self { out, err, json }
    }

    fn result<G>(&mut self, app: &App<G>) -> Result<()> {
        if app.session().phase() != Phase::Shown {
            return Ok(());
        }
        if self.json {
            return self.json_report(app);
        }
        if let Some(result) = app.session().result() {
            writeln!(self.out, "{}\n", render_result(result))?;
        }
        Ok(())
    }

    fn insight<G>(&mut self, app: &App<G>) -> Result<()> {
        if self.json {
            return self.json_report(app);
        }
        writeln!(self.out, "{}\n", render_insight(app.session().insight()))?;
        Ok(())
    }

    fn json_report<G>(&mut self, app: &App<G>) -> Result<()> {
        if let Some(result) = app.session().result() {
            let doc = render_json(result, app.session().insight())
                .context("Failed to serialize result as JSON")?;
            writeln!(self.out, "{doc}")?;
        }
        Ok(())
    }

    fn input_error<G>(&mut self, app: &App<G>) -> Result<()> {
        if let Some(error) = app.session().error() {
            writeln!(self.err, "{error}")?;
        }
        Ok(())
    }
}

/// Calculates a single date and waits for its insight. Returns `false` when
/// the date was rejected.
async fn run_once<G, O, E>(
    app: &mut App<G>,
    input: &str,
    now: NaiveDateTime,
    console: &mut Console<O, E>,
) -> Result<bool>
where
    G: TextGenerator + Send + Sync + 'static,
    O: Write,
    E: Write,
{
    if app.submit(input, now).is_err() {
        console.input_error(app)?;
        return Ok(false);
    }

    if console.json {
        app.wait_insight().await;
        console.json_report(app)?;
        return Ok(true);
    }

    console.result(app)?;
    if app.has_pending_insight() {
        writeln!(console.err, "{INSIGHT_LOADING}")?;
        app.wait_insight().await;
    }
    console.insight(app)?;
    Ok(true)
}

/// Reads dates line by line; each line supersedes the previous calculation.
async fn run_interactive<G, R, O, E>(
    app: &mut App<G>,
    input: R,
    first: Option<&str>,
    fixed_now: Option<NaiveDateTime>,
    console: &mut Console<O, E>,
) -> Result<()>
where
    G: TextGenerator + Send + Sync + 'static,
    R: AsyncBufRead + Unpin,
    O: Write,
    E: Write,
{
    writeln!(
        console.err,
        "Enter a date of birth (YYYY-MM-DD), one per line. Ctrl-D to quit."
    )?;

    if let Some(line) = first {
        submit_line(app, line, fixed_now.unwrap_or_else(local_now), console)?;
    }

    let mut lines = input.lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read date from stdin")? else {
                    break;
                };
                if line.trim().eq_ignore_ascii_case("quit") {
                    break;
                }
                submit_line(app, &line, fixed_now.unwrap_or_else(local_now), console)?;
            }
            resolved = app.wait_insight(), if app.has_pending_insight() => {
                if resolved {
                    console.insight(app)?;
                }
            }
        }
    }

    // Let the last calculation finish before exiting.
    if app.wait_insight().await {
        console.insight(app)?;
    }
    Ok(())
}

fn submit_line<G, O, E>(
    app: &mut App<G>,
    line: &str,
    now: NaiveDateTime,
    console: &mut Console<O, E>,
) -> Result<()>
where
    G: TextGenerator + Send + Sync + 'static,
    O: Write,
    E: Write,
{
    if app.submit(line, now).is_err() {
        if console.json {
            return console.input_error(app);
        }
        if let Some(error) = app.session().error() {
            writeln!(console.out, "{error}")?;
        }
        return Ok(());
    }

    console.result(app)?;
    if console.json {
        return Ok(());
    }
    match app.session().insight() {
        InsightSlot::Loading => writeln!(console.out, "{INSIGHT_LOADING}")?,
        _ => console.insight(app)?,
    }
    Ok(())
}
