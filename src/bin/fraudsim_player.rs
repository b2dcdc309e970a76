//! fraudsim terminal player
//!
//! Plays a built-in (or JSON) scenario in the terminal, in real time or
//! fast-forwarded.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fraudsim::{
    AgentRegistry, EngineConfig, EngineEvent, Locale, ManualClock, PlaybackRuntime, RuntimeConfig, RuntimeError,
    ScenarioCatalog, SimError, SimulationEngine, SimulationStatus, SimulationSummary, TimelineEntry,
};

/// Player configuration
struct Config {
    scenario: String,
    file: Option<PathBuf>,
    speed: Option<f64>,
    locale: Option<Locale>,
    name: Option<String>,
    money: Option<u64>,
    instant: bool,
    list: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scenario: "call-center-001".to_string(),
            file: None,
            speed: None,
            locale: None,
            name: None,
            money: None,
            instant: false,
            list: false,
        }
    }
}

fn value_of(args: &[String], i: usize, flag: &str) -> String {
    args.get(i + 1).cloned().unwrap_or_else(|| {
        eprintln!("error: {flag} requires a value");
        std::process::exit(1);
    })
}

fn parse_args() -> Config {
    let args: Vec<String> = std::env::args().collect();
    let mut config = Config::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--scenario" | "-s" => {
                config.scenario = value_of(&args, i, "--scenario");
                i += 2;
            }
            "--file" | "-f" => {
                config.file = Some(PathBuf::from(value_of(&args, i, "--file")));
                i += 2;
            }
            "--speed" => {
                let raw = value_of(&args, i, "--speed");
                config.speed = Some(raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid speed: {raw}");
                    std::process::exit(1);
                }));
                i += 2;
            }
            "--locale" | "-l" => {
                let raw = value_of(&args, i, "--locale");
                config.locale = Some(raw.parse().unwrap_or_else(|e| {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }));
                i += 2;
            }
            "--name" => {
                config.name = Some(value_of(&args, i, "--name"));
                i += 2;
            }
            "--money" => {
                let raw = value_of(&args, i, "--money");
                config.money = Some(raw.parse().unwrap_or_else(|_| {
                    eprintln!("error: invalid amount: {raw}");
                    std::process::exit(1);
                }));
                i += 2;
            }
            "--instant" => {
                config.instant = true;
                i += 1;
            }
            "--list" => {
                config.list = true;
                i += 1;
            }
            "--help" | "-h" => {
                println!("fraudsim-player - fraud-awareness scenario player");
                println!();
                println!("USAGE:");
                println!("    fraudsim-player [OPTIONS]");
                println!();
                println!("OPTIONS:");
                println!("    -s, --scenario <ID>       Scenario to play [default: call-center-001]");
                println!("    -f, --file <PATH>         Load an extra scenario from a JSON file");
                println!("        --speed <X>           Playback speed multiplier [default: 1.0]");
                println!("    -l, --locale <th|en>      Content language [default: th]");
                println!("        --name <NAME>         Victim name [default: scenario default]");
                println!("        --money <AMOUNT>      Starting money [default: scenario default]");
                println!("        --instant             Fast-forward without waiting");
                println!("        --list                List available scenarios and exit");
                println!("    -h, --help                Print help information");
                println!();
                println!("ENVIRONMENT:");
                println!("    FRAUDSIM_SPEED, FRAUDSIM_LOCALE, FRAUDSIM_UNMASK_ON_REVEAL, RUST_LOG");
                std::process::exit(0);
            }
            other => {
                eprintln!("error: unknown argument: {other}");
                std::process::exit(1);
            }
        }
    }

    config
}

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "fraudsim=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(parse_args()) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(config: Config) -> Result<(), SimError> {
    let mut catalog = ScenarioCatalog::builtin()?;
    if let Some(path) = &config.file {
        catalog.load_file(path)?;
    }

    if config.list {
        for scenario in catalog.iter() {
            println!("{:<20} {}", scenario.id, scenario.title.en);
        }
        return Ok(());
    }

    let mut engine_config = EngineConfig::from_env()?;
    if let Some(locale) = config.locale {
        engine_config.locale = locale;
    }
    let scenario = catalog.require(&config.scenario)?;
    let registry = AgentRegistry::builtin();

    println!("== {} ==", scenario.title.get(engine_config.locale));
    println!("{}", scenario.description.get(engine_config.locale));
    println!();

    if config.instant {
        let clock = Arc::new(ManualClock::new());
        let mut engine = SimulationEngine::with_clock(engine_config, registry.clone(), clock.clone())?;
        engine.start_setup();
        if let Some(money) = config.money {
            engine.set_user_profile(config.name.clone().unwrap_or_default(), money);
        }
        if let Some(speed) = config.speed {
            engine.set_speed(speed);
        }
        engine.load_and_play(scenario);
        engine.run_to_completion(&clock, 10_000);

        for entry in &engine.state().timeline {
            print_entry(&registry, entry);
        }
        if let Some(summary) = engine.summary() {
            print_summary(&summary);
        }
        return Ok(());
    }

    let runtime = PlaybackRuntime::spawn(engine_config, RuntimeConfig::default(), registry.clone())?;
    let events = runtime.subscribe()?;

    runtime.start_setup()?;
    if let Some(money) = config.money {
        runtime.set_user_profile(config.name.clone().unwrap_or_default(), money)?;
    }
    if let Some(speed) = config.speed {
        runtime.set_speed(speed)?;
    }
    runtime.load_and_play(scenario)?;

    let stdin = io::stdin();
    loop {
        let event = match events.recv_timeout(Duration::from_secs(60)) {
            Ok(event) => event,
            Err(RuntimeError::Timeout { .. }) => continue,
            Err(e) => return Err(e.into()),
        };
        match event {
            EngineEvent::StepProcessed { entry } => print_entry(&registry, &entry),
            EngineEvent::MoneyChanged { previous, current } => {
                println!("        balance: {previous} -> {current}");
            }
            EngineEvent::StatusChanged {
                to: SimulationStatus::Paused,
                ..
            } => {
                print!("    [paused - press Enter to continue] ");
                let _ = io::stdout().flush();
                let mut line = String::new();
                let _ = stdin.lock().read_line(&mut line);
                runtime.resume()?;
            }
            EngineEvent::StatusChanged {
                to: SimulationStatus::Completed,
                ..
            } => break,
            _ => {}
        }
    }

    if let Some(summary) = runtime.summary()? {
        print_summary(&summary);
    }
    Ok(())
}

fn print_entry(registry: &AgentRegistry, entry: &TimelineEntry) {
    let speaker = registry
        .get(&entry.agent_id)
        .map_or_else(|| entry.agent_id.to_string(), |a| a.name.clone());
    println!("[{:>2}] {:<14} {:<16} {}", entry.step_index + 1, entry.step_type, speaker, entry.content);
}

fn print_summary(summary: &SimulationSummary) {
    println!();
    println!("== {} ({}) ==", summary.title, summary.status);
    println!(
        "{}: lost {} of {} ({}%)",
        summary.victim_name, summary.loss.lost, summary.loss.starting, summary.loss.loss_percent
    );
    println!("events: {}/{}", summary.event_count, summary.steps_total);
    for point in &summary.educational_points {
        println!("  - {point}");
    }
    for case in &summary.real_world_cases {
        println!("  * {case}");
    }
}
