//! JSON scenario files: one ownship, any number of traffic entries.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use cdr_core::{
    NavPoint, ParameterData, Plan, PolyPath, Position, SeparationRules, SimplePoly, TrafficState,
    Velocity,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,
    /// Separation rules; defaults for anything left out
    #[serde(default)]
    pub rules: Option<SeparationRules>,
    /// Detector parameters; the first of each kind replaces the default
    #[serde(default)]
    pub detectors: Vec<ParameterData>,
    pub ownship: OwnshipSpec,
    #[serde(default)]
    pub traffic: Vec<TrafficSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OwnshipSpec {
    State {
        #[serde(default = "ownship_id")]
        id: String,
        position: Position,
        velocity: Velocity,
        #[serde(default)]
        time: f64,
    },
    Plan {
        #[serde(default = "ownship_id")]
        id: String,
        points: Vec<NavPoint>,
    },
}

fn ownship_id() -> String {
    "ownship".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolygonStep {
    pub time: f64,
    pub vertices: Vec<Position>,
    pub bottom: f64,
    pub top: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrafficSpec {
    State {
        id: String,
        position: Position,
        velocity: Velocity,
    },
    Plan {
        id: String,
        points: Vec<NavPoint>,
    },
    /// Morphing steps, or a single step drifting with `velocity`.
    PolygonPath {
        id: String,
        #[serde(default)]
        velocity: Option<Velocity>,
        steps: Vec<PolygonStep>,
    },
}

/// Ownship ready for detection.
#[derive(Debug, Clone)]
pub enum Ownship {
    State(TrafficState, f64),
    Plan(Plan),
}

impl Ownship {
    pub fn id(&self) -> &str {
        match self {
            Ownship::State(s, _) => &s.id,
            Ownship::Plan(p) => p.name(),
        }
    }

    /// Time the lookahead window is measured from.
    pub fn start_time(&self) -> f64 {
        match self {
            Ownship::State(_, t) => *t,
            Ownship::Plan(p) => p.first_time(),
        }
    }

    /// State at `tm`; a plan is sampled, a state is flown forward.
    pub fn state_at(&self, tm: f64) -> TrafficState {
        match self {
            Ownship::State(s, t0) => TrafficState::new(
                s.id.clone(),
                s.position.linear(s.velocity, tm - t0),
                s.velocity,
            ),
            Ownship::Plan(p) => TrafficState::new(p.name(), p.position(tm), p.velocity(tm)),
        }
    }
}

/// Traffic ready for detection.
#[derive(Debug, Clone)]
pub enum Traffic {
    State(TrafficState),
    Plan(Plan),
    PolygonPath(PolyPath),
}

impl Traffic {
    pub fn id(&self) -> &str {
        match self {
            Traffic::State(s) => &s.id,
            Traffic::Plan(p) => p.name(),
            Traffic::PolygonPath(p) => p.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Traffic::State(_) => "state",
            Traffic::Plan(_) => "plan",
            Traffic::PolygonPath(_) => "polygon_path",
        }
    }
}

fn build_plan(id: &str, points: &[NavPoint]) -> Result<Plan> {
    let mut plan = Plan::new(id);
    for p in points {
        plan.add_point(*p)
            .with_context(|| format!("point at {} rejected by plan {id}", p.time))?;
    }
    Ok(plan)
}

fn build_path(id: &str, velocity: Option<Velocity>, steps: &[PolygonStep]) -> Result<PolyPath> {
    let poly = |s: &PolygonStep| SimplePoly::new(s.vertices.clone(), s.bottom, s.top);
    match (velocity, steps) {
        (Some(v), [step]) => Ok(PolyPath::from_state(id, poly(step), v, step.time)),
        (Some(_), _) => anyhow::bail!("polygon path {id} with a velocity needs exactly one step"),
        (None, _) => {
            let mut path = PolyPath::new(id);
            for step in steps {
                path.add_polygon(poly(step), step.time)
                    .with_context(|| format!("polygon path {id}"))?;
            }
            Ok(path)
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("parsing scenario {}", path.display()))?;
        Ok(scenario)
    }

    pub fn ownship(&self) -> Result<Ownship> {
        match &self.ownship {
            OwnshipSpec::State {
                id,
                position,
                velocity,
                time,
            } => Ok(Ownship::State(
                TrafficState::new(id.clone(), *position, *velocity),
                *time,
            )),
            OwnshipSpec::Plan { id, points } => Ok(Ownship::Plan(build_plan(id, points)?)),
        }
    }

    pub fn traffic(&self) -> Result<Vec<Traffic>> {
        self.traffic
            .iter()
            .map(|t| match t {
                TrafficSpec::State {
                    id,
                    position,
                    velocity,
                } => Ok(Traffic::State(TrafficState::new(id.clone(), *position, *velocity))),
                TrafficSpec::Plan { id, points } => Ok(Traffic::Plan(build_plan(id, points)?)),
                TrafficSpec::PolygonPath {
                    id,
                    velocity,
                    steps,
                } => Ok(Traffic::PolygonPath(build_path(id, *velocity, steps)?)),
            })
            .collect()
    }
}
