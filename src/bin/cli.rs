use std::path::{Path, PathBuf};
use std::sync::Arc;

use airtime::cache::ScheduleCache;
use airtime::clock::{Clock, SystemClock};
use airtime::config::get_config;
use airtime::duration::format_elapsed;
use airtime::live::{elapsed_seconds, resolve_live};
use airtime::planner::{Plan, PlanSettings, plan};
use airtime::player::Player;
use airtime::present::{listing, video_url};
use airtime::schedule::{Schedule, Video};
use airtime::sim::SimulatedPlayer;
use airtime::source::{FileSource, HttpSource, ScheduleSource};
use airtime::sync::Synchronizer;
use anyhow::{Context, Result};
use clap::Parser;
use jiff::Timestamp;
use jiff::tz::TimeZone;
use tracing::{debug, info};

#[derive(Parser)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,
}

#[derive(Parser)]
enum Command {
    /// Show what is on air right now.
    Now {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    /// List every entry with its start time.
    List {
        #[clap(long)]
        file: Option<PathBuf>,
    },
    /// Parse and validate a schedule document.
    Check { path: PathBuf },
    /// Extend a schedule with shuffled airings of a video list.
    Plan {
        #[clap(long)]
        videos: PathBuf,
        #[clap(long)]
        previous: Option<PathBuf>,
        #[clap(long, default_value = "schedule.new.json")]
        out: PathBuf,
    },
    /// Drive a simulated player in sync with the schedule until Ctrl-C.
    Watch {
        #[clap(long)]
        file: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    airtime::init_tracing();
    let args = Args::parse();
    match args.cmd {
        Command::Now { file } => now(file).await,
        Command::List { file } => list(file).await,
        Command::Check { path } => check(&path).await,
        Command::Plan {
            videos,
            previous,
            out,
        } => plan_schedule(&videos, previous.as_deref(), &out).await,
        Command::Watch { file } => watch(file).await,
    }
}

fn source(file: Option<PathBuf>) -> Result<Arc<dyn ScheduleSource>> {
    let config = get_config();
    Ok(match file {
        Some(path) => Arc::new(FileSource::new(path)),
        None => Arc::new(HttpSource::new(
            &config.schedule_url,
            config.request_timeout(),
        )?),
    })
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parsing {}", path.display()))
}

async fn now(file: Option<PathBuf>) -> Result<()> {
    let schedule = source(file)?.fetch().await?;
    let now = Timestamp::now();
    match resolve_live(&schedule, now) {
        Ok(Some(entry)) => {
            let elapsed = elapsed_seconds(entry, now)?;
            let total = entry.video.duration_seconds()? as f64;
            println!("{}", entry.video.title);
            println!("{}", video_url(&entry.video.id));
            println!("{} / {}", format_elapsed(elapsed), format_elapsed(total));
        }
        Ok(None) => println!("No live stream currently."),
        Err(err) => {
            debug!(error = %err, "schedule is malformed");
            println!("No live stream currently.");
        }
    }
    Ok(())
}

async fn list(file: Option<PathBuf>) -> Result<()> {
    let schedule = source(file)?.fetch().await?;
    for row in listing(&schedule, Timestamp::now(), &TimeZone::system())? {
        let marker = if row.live { ">" } else { " " };
        println!("{marker} {}  {}", row.start, row.entry.video.title);
    }
    Ok(())
}

async fn check(path: &Path) -> Result<()> {
    let schedule: Schedule = read_json(path).await?;
    schedule.validate()?;
    println!(
        "{} entries, {} .. {}",
        schedule.entries.len(),
        schedule.start()?,
        schedule.end()?
    );
    Ok(())
}

async fn plan_schedule(videos: &Path, previous: Option<&Path>, out: &Path) -> Result<()> {
    let videos: Vec<Video> = read_json(videos).await?;
    let previous: Option<Schedule> = match previous {
        Some(path) if path.exists() => Some(read_json(path).await?),
        _ => None,
    };

    let plan = plan(
        previous.as_ref(),
        &videos,
        Timestamp::now(),
        &PlanSettings::default(),
        &mut rand::rng(),
    )?;
    match plan {
        Plan::Unchanged => info!("previous schedule is still valid, nothing written"),
        Plan::Extended(schedule) => {
            tokio::fs::write(out, serde_json::to_string(&schedule)?)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            info!(path = %out.display(), entries = schedule.entries.len(), "schedule written");
        }
    }
    Ok(())
}

async fn watch(file: Option<PathBuf>) -> Result<()> {
    let settings = get_config().sync_settings();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let cache = Arc::new(ScheduleCache::new(source(file)?, clock.clone()));
    let player = SimulatedPlayer::new(clock.clone());
    let mut sync = Synchronizer::new(player, cache.clone(), clock, settings);

    let mut known: Option<Arc<Schedule>> = None;
    let mut on_air: Option<String> = None;
    sync.start().await;

    let mut interval = tokio::time::interval(settings.tick_interval);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        learn_latest(&mut sync, &cache, &mut known);
        while let Some(event) = sync.player_mut().poll_event() {
            sync.handle(event).await;
            learn_latest(&mut sync, &cache, &mut known);
        }

        let status = sync.tick().await;
        learn_latest(&mut sync, &cache, &mut known);
        let key = status.live.as_ref().map(|e| e.key().to_string());
        if key != on_air {
            match &status.live {
                Some(entry) => info!(title = %entry.video.title, "now on air"),
                None => info!("No live stream currently."),
            }
            on_air = key;
        }
        debug!(
            position = %format_elapsed(status.position),
            total = %format_elapsed(sync.player().total_duration()),
            "tick"
        );
    }
    Ok(())
}

/// Hands the player the lengths from any schedule it has not seen yet.
fn learn_latest(
    sync: &mut Synchronizer<SimulatedPlayer>,
    cache: &ScheduleCache,
    known: &mut Option<Arc<Schedule>>,
) {
    let Some(schedule) = cache.cached() else {
        return;
    };
    if !known.as_ref().is_some_and(|k| Arc::ptr_eq(k, &schedule)) {
        sync.player_mut().learn(&schedule);
        *known = Some(schedule);
    }
}
