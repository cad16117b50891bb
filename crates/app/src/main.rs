use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use rhythm_dino_core::{
    EngineConfig, HitSource, LevelCatalog, PlaybackClock, RhythmError, RhythmLevel, RhythmRun,
    RhythmTimeline, RunState, ScriptedHits,
};
use tracing_subscriber::EnvFilter;

/// Extra seconds simulated once the last obstacle should have left the screen.
const SIMULATION_SLACK_SECONDS: f64 = 1.0;

fn main() -> rhythm_dino_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::List { levels } => run_list(levels.as_deref()),
        Commands::Show { selection } => run_show(&selection),
        Commands::Simulate {
            selection,
            hits,
            autoplay,
            offset_ms,
            fps,
            json,
        } => run_simulate(&selection, &hits, autoplay, offset_ms, fps, json),
    }
}

fn run_list(levels: Option<&Path>) -> rhythm_dino_core::Result<()> {
    let catalog = load_catalog(levels)?;
    print_listing(&catalog);
    Ok(())
}

fn run_show(selection: &Selection) -> rhythm_dino_core::Result<()> {
    let catalog = load_catalog(selection.levels.as_deref())?;
    let config = load_config(selection.config.as_deref())?;
    let level = select_level(&catalog, selection.level.as_deref())?;

    let mut timeline = RhythmTimeline::new(level)?;
    timeline.assign_spawn_times(config.world.travel_distance(), level.base_speed);

    println!(
        "{} [{}] - {} bpm - window {} ms - {:.2} s",
        level.name,
        level.slug,
        level.tempo_bpm,
        level.window_ms,
        timeline.total_duration()
    );
    if !level.description.is_empty() {
        println!("{}", level.description);
    }
    for (index, event) in timeline.events().iter().enumerate() {
        println!(
            "{:>3}  beat {:>5.2}  expected {:>7.3} s  spawn {:>7.3} s  {}",
            index + 1,
            event.beat,
            event.expected_time,
            event.spawn_time,
            event.label
        );
    }
    Ok(())
}

fn run_simulate(
    selection: &Selection,
    hits: &[f64],
    autoplay: bool,
    offset_ms: f64,
    fps: u32,
    json: bool,
) -> rhythm_dino_core::Result<()> {
    let clock = PlaybackClock::fixed_rate(fps)?;
    let catalog = load_catalog(selection.levels.as_deref())?;
    let config = load_config(selection.config.as_deref())?;
    let level = select_level(&catalog, selection.level.as_deref())?.clone();
    tracing::info!(level = %level.slug, autoplay, fps, "simulating run");

    let mut run = RhythmRun::new(level, config)?;
    let trace = if autoplay {
        run.timeline()
            .events()
            .iter()
            .map(|event| event.expected_time + offset_ms / 1000.0)
            .collect()
    } else {
        hits.to_vec()
    };
    let mut source = ScriptedHits::new(trace);
    let clock = replay(&mut run, &mut source, clock);

    if json {
        println!("{}", serde_json::to_string_pretty(&run.snapshot())?);
        return Ok(());
    }

    let summary = run.summary();
    println!("state: {:?}", summary.state);
    if let Some(reason) = run.fail_reason() {
        println!("reason: {reason}");
    }
    println!("time: {:.3} s", clock.time_seconds());
    println!("score: {}", summary.score);
    println!("max combo: {}", summary.max_combo);
    println!(
        "hits: {} / {} (stray {}, missed {})",
        summary.hits,
        run.timeline().len(),
        summary.stray_hits,
        summary.misses
    );
    if let Some(accuracy) = summary.mean_accuracy_ms {
        println!("mean accuracy: {accuracy:.1} ms");
    }
    if let Some(feedback) = run.last_feedback() {
        println!("last feedback: {} @ {:.3} s", feedback.text, feedback.at);
    }
    Ok(())
}

/// Ticks `run` until it ends or the simulation limit passes. Returns the clock
/// as of the last tick.
fn replay(
    run: &mut RhythmRun,
    source: &mut dyn HitSource,
    mut clock: PlaybackClock,
) -> PlaybackClock {
    let limit = simulation_limit(run);
    while run.tick(clock.time_seconds(), clock.dt(), source) == RunState::Running {
        clock.advance();
        if clock.time_seconds() > limit {
            tracing::warn!(limit, "run still active at the end of the simulation");
            break;
        }
    }
    clock
}

/// Level duration plus the time the last obstacle needs to cross the whole
/// screen and get culled.
fn simulation_limit(run: &RhythmRun) -> f64 {
    let world = &run.config().world;
    let crossing =
        (world.spawn_x() + world.obstacle_width + world.cull_margin) / run.level().base_speed;
    run.timeline().total_duration() + crossing + SIMULATION_SLACK_SECONDS
}

fn load_catalog(path: Option<&Path>) -> rhythm_dino_core::Result<LevelCatalog> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading level catalog");
            LevelCatalog::load(path)
        }
        None => Ok(LevelCatalog::builtin()),
    }
}

fn load_config(path: Option<&Path>) -> rhythm_dino_core::Result<EngineConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading engine configuration");
            EngineConfig::load(path)
        }
        None => Ok(EngineConfig::default()),
    }
}

/// Resolves the selector, re-listing the catalog when nothing matches.
fn select_level<'a>(
    catalog: &'a LevelCatalog,
    selector: Option<&str>,
) -> rhythm_dino_core::Result<&'a RhythmLevel> {
    catalog.select(selector).inspect_err(|err| {
        if matches!(err, RhythmError::LevelNotFound { .. }) {
            eprintln!("{err}");
            eprintln!("available levels:");
            print_listing(catalog);
        }
    })
}

fn print_listing(catalog: &LevelCatalog) {
    for summary in catalog.listing() {
        println!("{summary}");
    }
}

fn parse_hit_time(value: &str) -> Result<f64, String> {
    let time: f64 = value
        .trim()
        .parse()
        .map_err(|err| format!("invalid hit time `{value}`: {err}"))?;
    if time.is_finite() && time >= 0.0 {
        Ok(time)
    } else {
        Err(format!("hit time must be a non-negative number, got `{value}`"))
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Rhythm trainer driven by drum hits", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct Selection {
    /// Level slug, 1-based index or exact name. Defaults to the first level.
    #[arg(short, long)]
    level: Option<String>,
    /// JSON file with a custom level catalog.
    #[arg(long)]
    levels: Option<PathBuf>,
    /// JSON file with engine configuration overrides.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the available levels.
    List {
        /// JSON file with a custom level catalog.
        #[arg(long)]
        levels: Option<PathBuf>,
    },
    /// Print the event schedule of a level.
    Show {
        #[command(flatten)]
        selection: Selection,
    },
    /// Replay a hit trace through a run and report the outcome.
    Simulate {
        #[command(flatten)]
        selection: Selection,
        /// Comma-separated hit times in seconds since run start.
        #[arg(long, value_delimiter = ',', value_parser = parse_hit_time, conflicts_with = "autoplay")]
        hits: Vec<f64>,
        /// Hit every event at its expected time.
        #[arg(long)]
        autoplay: bool,
        /// Shift autoplay hits by this many milliseconds (negative is early).
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        offset_ms: f64,
        /// Simulation ticks per second.
        #[arg(long, default_value_t = 60)]
        fps: u32,
        /// Print the final snapshot as JSON instead of a summary.
        #[arg(long)]
        json: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_simulate_with_hit_list() {
        let cli = Cli::try_parse_from([
            "rhythm-dino",
            "simulate",
            "--level",
            "zamba_6_8",
            "--hits",
            "1.3,2.61",
        ])
        .unwrap();
        match cli.command {
            Commands::Simulate {
                selection, hits, ..
            } => {
                assert_eq!(selection.level.as_deref(), Some("zamba_6_8"));
                assert_eq!(hits, vec![1.3, 2.61]);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_negative_hit_times() {
        assert!(parse_hit_time("-1").is_err());
        assert!(parse_hit_time("abc").is_err());
        assert_eq!(parse_hit_time(" 0.5 ").unwrap(), 0.5);
    }

    /// One beat whose obstacle crawls across the screen for almost 24 seconds.
    fn slow_level() -> RhythmLevel {
        RhythmLevel::new("crawl", "Crawl", 120.0, 100, 50.0, 1.0, [(0.0, "only".to_string())])
    }

    #[test]
    fn replay_waits_for_slow_obstacles_to_clear() {
        let mut run = RhythmRun::new(slow_level(), EngineConfig::default()).unwrap();
        let mut hits = ScriptedHits::new(vec![1.0]);

        let clock = replay(&mut run, &mut hits, PlaybackClock::fixed_rate(60).unwrap());

        assert_eq!(run.state(), RunState::Completed);
        assert!(run.timeline().total_duration() + 10.0 < clock.time_seconds());
        assert!(clock.time_seconds() < simulation_limit(&run));
    }

    #[test]
    fn unknown_level_is_reported() {
        let catalog = LevelCatalog::builtin();
        let err = select_level(&catalog, Some("tango")).unwrap_err();
        assert!(matches!(err, RhythmError::LevelNotFound { .. }));
    }
}
