//! `cdr` - run conflict detection scenarios from JSON files.

mod config;
mod detect;
mod report;
mod scenario;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cdr_core::{load_detectors, load_detectors_json, DetectorSet, SeparationRules, TrafficState};

use crate::config::Config;
use crate::detect::{Engine, Window};
use crate::report::{DetectionReport, RankEntry, RankingReport};
use crate::scenario::{Scenario, Traffic};

/// Conflict detection against trajectories and moving polygons
#[derive(Parser, Debug)]
#[command(name = "cdr", author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Detect conflicts between the ownship and every traffic entry
    Detect {
        scenario: PathBuf,
        /// Start of the lookahead window, seconds after the ownship start
        #[arg(long)]
        begin: Option<f64>,
        /// End of the lookahead window, seconds after the ownship start
        #[arg(long)]
        end: Option<f64>,
        /// Report true entry/exit of conflicts overlapping the window
        #[arg(long)]
        extended: bool,
        /// Print a JSON report instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Order traffic by urgency, most urgent first
    Rank {
        scenario: PathBuf,
        /// Time of the ranking; defaults to the ownship start
        #[arg(long)]
        time: Option<f64>,
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("cdr=info".parse()?))
        .init();

    let args = Args::parse();
    let config = Config::from_env();

    match args.command {
        Command::Detect {
            scenario,
            begin,
            end,
            extended,
            json,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let mut rules = resolve_rules(&scenario, &config);
            if let Some(b) = begin {
                rules.lookahead_begin_s = b;
            }
            if let Some(t) = end {
                rules.lookahead_end_s = t;
            }
            let engine = build_engine(&scenario, &config, rules)?;
            let report = run_detect(&scenario, &engine, extended)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print_table();
            }
        }
        Command::Rank {
            scenario,
            time,
            json,
        } => {
            let scenario = Scenario::load(&scenario)?;
            let rules = resolve_rules(&scenario, &config);
            let engine = build_engine(&scenario, &config, rules)?;
            let report = run_rank(&scenario, &engine, time)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                report.print_table();
            }
        }
    }

    Ok(())
}

/// Defaults, then the scenario's rules, then the environment.
fn resolve_rules(scenario: &Scenario, config: &Config) -> SeparationRules {
    let mut rules = scenario.rules.clone().unwrap_or_default();
    config.apply(&mut rules);
    for problem in rules.validate() {
        tracing::warn!("{problem}");
    }
    rules
}

fn load_detector_file(path: &Path) -> Result<DetectorSet> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading detectors {}", path.display()))?;
    load_detectors_json(&text).with_context(|| format!("parsing detectors {}", path.display()))
}

fn build_engine(scenario: &Scenario, config: &Config, rules: SeparationRules) -> Result<Engine> {
    let detectors = match &config.detectors_path {
        Some(path) => load_detector_file(path)?,
        None => load_detectors(&scenario.detectors),
    };
    Ok(Engine::new(rules, detectors))
}

fn run_detect(scenario: &Scenario, engine: &Engine, extended: bool) -> Result<DetectionReport> {
    let own = scenario.ownship()?;
    let traffic = scenario.traffic()?;
    let rules = engine.rules();
    let window = Window {
        begin: rules.lookahead_begin_s,
        end: rules.lookahead_end_s,
        extended,
    };
    tracing::info!(
        scenario = %scenario.name,
        traffic = traffic.len(),
        begin = window.begin,
        end = window.end,
        "running detection"
    );

    let results: Vec<_> = traffic.iter().map(|t| engine.detect(&own, t, window)).collect();
    let start = own.start_time();
    Ok(DetectionReport {
        scenario: scenario.name.clone(),
        ownship: own.id().to_string(),
        generated_at: Utc::now(),
        window: [start + window.begin, start + window.end],
        results,
    })
}

fn traffic_state(t: &Traffic, start: f64, tm: f64) -> Option<TrafficState> {
    match t {
        Traffic::State(s) => Some(TrafficState::new(
            s.id.clone(),
            s.position.linear(s.velocity, tm - start),
            s.velocity,
        )),
        Traffic::Plan(p) if !p.is_empty() && tm >= p.first_time() && tm <= p.last_time() => {
            Some(TrafficState::new(p.name(), p.position(tm), p.velocity(tm)))
        }
        _ => None,
    }
}

fn run_rank(scenario: &Scenario, engine: &Engine, time: Option<f64>) -> Result<RankingReport> {
    let own = scenario.ownship()?;
    let traffic = scenario.traffic()?;
    let tm = time.unwrap_or_else(|| own.start_time());
    let own_state = own.state_at(tm);

    let mut states = Vec::new();
    let mut unranked = Vec::new();
    for t in &traffic {
        match traffic_state(t, own.start_time(), tm) {
            Some(s) => states.push(s),
            None => unranked.push(t.id().to_string()),
        }
    }

    let ranked = engine.urgency().ranking(&own_state, &states);
    let ranking: Vec<RankEntry> = ranked
        .iter()
        .map(|(i, u)| RankEntry {
            id: states[*i].id.clone(),
            urgency: *u,
        })
        .collect();
    // Mixed frames score as unusable and drop out of the ranking
    unranked.extend(
        states
            .iter()
            .enumerate()
            .filter(|(i, _)| !ranked.iter().any(|(r, _)| r == i))
            .map(|(_, s)| s.id.clone()),
    );

    Ok(RankingReport {
        scenario: scenario.name.clone(),
        ownship: own.id().to_string(),
        generated_at: Utc::now(),
        time: tm,
        ranking,
        unranked,
    })
}
