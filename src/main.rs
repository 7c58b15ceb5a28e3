use keystep::config;
use keystep::core::audio::SilentTrack;
use keystep::core::input::NoInput;
use keystep::game::chart::ChartData;
use keystep::game::gameplay::{Engine, PlayMode, StatsState};
use keystep::game::timing::steps_to_milliseconds;
use log::{error, info, warn};

const FRAME_SECONDS: f32 = 1.0 / 60.0;
/// Music kept running past the last note.
const TAIL_MS: f64 = 3000.0;

fn load_chart(path: &str) -> Result<ChartData, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    Ok(ChartData::from_json_str(&text)?)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Install logger immediately, then set runtime max level from config after loading it.
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .try_init();
    // Startup default when config is missing or malformed.
    log::set_max_level(log::LevelFilter::Warn);

    config::load();
    let cfg = config::get();
    log::set_max_level(cfg.log_level.as_level_filter());

    let chart = match std::env::args().nth(1) {
        Some(path) => load_chart(&path).inspect_err(|e| error!("Failed to load chart '{path}': {e}"))?,
        None => {
            info!("No chart snapshot given; running the built-in demo.");
            ChartData::demo()
        }
    };

    let end_ms = f64::from(steps_to_milliseconds(chart.last_step() as f32, &chart.timeline)) + TAIL_MS;
    let track_ms = (end_ms + f64::from(chart.meta.music_offset_ms)).max(0.0);
    let mut engine = Engine::new(SilentTrack::new(track_ms).with_rate(cfg.music_rate), &cfg);
    engine.start(chart);
    info!("Difficulty: {:.2}", engine.difficulty());

    if cfg.default_mode == PlayMode::Edit {
        warn!("Edit mode never judges; the headless run only scrolls through the chart.");
    }
    engine.set_playing(true);

    // The headless device advances in lockstep with the frame clock.
    while engine.stats_state() == StatsState::Ongoing
        && f64::from(engine.simulation().level_time_ms()) < end_ms
    {
        engine.audio_mut().advance(FRAME_SECONDS);
        let _ = engine.update(FRAME_SECONDS, &NoInput);
    }
    engine.set_playing(false);

    let summary = engine.summary();
    if summary.passed() {
        info!("Run finished: chart cleared.");
    } else {
        info!("Run finished: {:?}", summary.stats_state);
    }
    println!("Chart:      {}", summary.title);
    println!("Result:     {:?}", summary.stats_state);
    println!("Score:      {}", summary.score);
    println!("Max combo:  {}", summary.max_combo);
    println!(
        "Judgements: {} perfect / {} ok / {} miss",
        summary.perfects, summary.oks, summary.misses
    );
    println!("Accuracy:   {:.2}%", summary.accuracy);
    println!("Health:     {}", summary.health);
    println!("Difficulty: {:.2}", summary.difficulty);
    println!(
        "Hit error:  mean {:+.2} steps, stddev {:.2}, {:.1}ms mean abs",
        summary.timing.mean_steps, summary.timing.stddev_steps, summary.timing.mean_abs_ms
    );
    for (error, count) in &summary.error_histogram {
        println!("  {error:+3} steps: {count}");
    }
    Ok(())
}
