use clap::{Parser, Subcommand};
use eyre::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use multi_stream_aligner::{
    BatchSummary, Config, Error, ProgressReceiver, ProgressReporter, RenameOutcome, RenamePlan,
    Session, Timestamp,
};
use std::{
    io::{self, BufRead as _, Write as _},
    path::{Path, PathBuf},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(author, version, about = "Browse independently clocked frame streams in lock-step")]
struct Args {
    /// JSON config path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Rename timestamp-named frames onto a zero-based epoch.
    Renormalize {
        dir: PathBuf,
        /// Timestamp given to the earliest frame.
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: Timestamp,
        /// Do not ask before renaming.
        #[arg(long)]
        yes: bool,
    },
    /// Swap the first and third color channels of every frame.
    SwapChannels {
        dir: PathBuf,
        /// Frames processed at once.
        #[arg(long)]
        jobs: Option<usize>,
    },
    /// Print the frame of every configured stream at master clock times.
    Resolve {
        #[arg(required = true, allow_negative_numbers = true)]
        times: Vec<Timestamp>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let Args { config, command } = Args::parse();

    let config = match &config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match command {
        Command::Renormalize { dir, offset, yes } => renormalize(&config, dir, offset, yes).await,
        Command::SwapChannels { dir, jobs } => swap_channels(&config, &dir, jobs).await,
        Command::Resolve { times } => resolve(&config, &times),
    }
}

async fn renormalize(config: &Config, dir: PathBuf, offset: Timestamp, yes: bool) -> Result<()> {
    let renormalizer = config.renormalizer();
    let plan = match renormalizer.plan(&dir) {
        Ok(plan) => plan,
        Err(err @ Error::AlreadySynced { .. }) => {
            info!("{}", err);
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };
    println!("Minimal timestamp: {}", plan.min_timestamp());

    let (reporter, progress_rx) = ProgressReporter::channel();
    let bar = spawn_progress_bar(progress_rx);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut confirm = |plan: &RenamePlan, offset: Timestamp| yes || ask_proceed(plan, offset);
        renormalizer.apply(&plan, offset, &mut confirm, reporter)
    })
    .await??;
    bar.await?;

    match outcome {
        RenameOutcome::Cancelled => {
            println!("Renaming cancelled");
            Ok(())
        }
        RenameOutcome::Applied(summary) => report(&summary),
    }
}

async fn swap_channels(config: &Config, dir: &Path, jobs: Option<usize>) -> Result<()> {
    let mut swapper = config.channel_swapper();
    if let Some(jobs) = jobs {
        swapper = swapper.with_jobs(jobs);
    }

    let (reporter, progress_rx) = ProgressReporter::channel();
    let bar = spawn_progress_bar(progress_rx);
    let summary = swapper.apply(dir, reporter).await?;
    bar.await?;

    report(&summary)
}

fn resolve(config: &Config, times: &[Timestamp]) -> Result<()> {
    if config.streams.is_empty() {
        bail!("no stream is configured, pass a config with a `streams` section");
    }

    let session = Session::load(config)?;

    for &time in times {
        println!("t = {time}");
        for (name, (index, path)) in session.frames_at(time) {
            println!("  {name}: #{index} {}", path.display());
        }
    }

    Ok(())
}

fn ask_proceed(plan: &RenamePlan, offset: Timestamp) -> bool {
    let first = plan
        .entries()
        .first()
        .and_then(|entry| plan.target_name(entry.timestamp, offset))
        .unwrap_or_default();
    print!(
        "Rename {} frames in {} starting at {}? [y/n] ",
        plan.len(),
        plan.dir().display(),
        first
    );
    if io::stdout().flush().is_err() {
        return false;
    }

    let mut answer = String::new();
    match io::stdin().lock().read_line(&mut answer) {
        Ok(_) => matches!(answer.trim(), "y" | "Y"),
        Err(_) => false,
    }
}

fn spawn_progress_bar(mut progress_rx: ProgressReceiver) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let bar = ProgressBar::new(0);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        {
            bar.set_style(style.progress_chars("#>-"));
        }

        while progress_rx.changed().await.is_ok() {
            let progress = *progress_rx.borrow_and_update();
            bar.set_length(progress.total as u64);
            bar.set_position(progress.visited() as u64);
            if progress.failed > 0 {
                bar.set_message(format!("{} failed", progress.failed));
            }
            if progress.is_finished() {
                break;
            }
        }

        bar.finish();
    })
}

fn report(summary: &BatchSummary) -> Result<()> {
    for (path, err) in &summary.failures {
        eprintln!("{}: {}", path.display(), err);
    }
    println!(
        "{} of {} frames done, {} failed",
        summary.completed,
        summary.total,
        summary.failed()
    );

    if summary.is_clean() {
        Ok(())
    } else {
        bail!("{} frames failed", summary.failed())
    }
}
