//! Run Configuration
//!
//! A run is described by one TOML file: input files, the protocol, the
//! clock, the seed and the output directory. Counts are read as signed
//! integers so that negative values surface as configuration errors.
//!
//! Relative paths are resolved against the directory of the file.

use diffusion_events::{Clock, UserIdx};
use serde::{Deserialize, Serialize};
use socnet_graph::{GraphConfig, Orientation};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::data::DiffusionData;
use crate::error::ConfigError;
use crate::loader::read_recommendations_file;
use crate::mechanisms::{
    AllNeighboursPropagation, AllNotPropagatedExpiration, AnyOf, CountSelection,
    ExpirationMechanism, Limit, MaxTimestamp, NeverExpire, NewerUpdate, NoMoreNew,
    NoMorePropagated, NumIterations, OlderUpdate, PropagationMechanism, PullPropagation,
    PushPropagation, PushPullPropagation, RealPropagatedSelection,
    RealPropagatedTimestampExpiration, RecommendedSelection, RecommenderPropagation, ResetUpdate,
    SelectionMechanism, StopCondition, ThresholdSelection, TimedExpiration, TotalPropagated,
    UpdateMechanism, WallClock,
};
use crate::protocol::Protocol;

/// Complete description of a simulation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default)]
    pub clock: Clock,
    pub data: DataConfig,
    pub protocol: ProtocolConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

fn default_seed() -> u64 {
    42
}

impl RunConfig {
    /// Loads a configuration file, resolving relative paths against it.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config = Self::from_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parses configuration from a TOML string. Paths are kept as written.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Makes every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.data.edges);
        resolve(&mut self.data.pieces);
        if let Some(p) = self.data.users.as_mut() {
            resolve(p);
        }
        if let Some(p) = self.data.real_propagation.as_mut() {
            resolve(p);
        }
        for feature in self
            .data
            .user_features
            .iter_mut()
            .chain(self.data.piece_features.iter_mut())
        {
            resolve(&mut feature.path);
        }
        match &mut self.protocol.selection {
            SelectionConfig::Recommended { recommendations, .. } => resolve(recommendations),
            SelectionConfig::Count { .. }
            | SelectionConfig::Threshold { .. }
            | SelectionConfig::RealPropagated { .. } => {}
        }
        if let PropagationConfig::Recommender { recommendations, .. } = &mut self.protocol.propagation {
            resolve(recommendations);
        }
        resolve(&mut self.output.dir);
    }
}

/// Input files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Edge list: `origin \t destination [\t weight [\t type]]`.
    pub edges: PathBuf,
    #[serde(default)]
    pub graph: GraphConfig,
    /// Optional user index fixing node order and isolated users.
    #[serde(default)]
    pub users: Option<PathBuf>,
    /// Header line, then `piece \t creator \t timestamp`.
    pub pieces: PathBuf,
    /// Ground truth: `user \t piece \t timestamp`.
    #[serde(default)]
    pub real_propagation: Option<PathBuf>,
    #[serde(default)]
    pub user_features: Vec<FeatureFile>,
    #[serde(default)]
    pub piece_features: Vec<FeatureFile>,
}

/// A feature table file: `entity \t value [\t weight]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFile {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
        }
    }
}

/// A count that is either a non-negative number or `"all"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CountValue {
    Number(i64),
    Keyword(String),
}

impl CountValue {
    pub fn all() -> Self {
        CountValue::Keyword("all".to_string())
    }

    pub fn to_limit(&self, field: &str) -> Result<Limit, ConfigError> {
        match self {
            CountValue::Number(n) if *n >= 0 => Ok(Limit::AtMost(*n as usize)),
            CountValue::Number(n) => Err(ConfigError::bad(format!("{} must not be negative, got {}", field, n))),
            CountValue::Keyword(k) if k.eq_ignore_ascii_case("all") => Ok(Limit::All),
            CountValue::Keyword(k) => Err(ConfigError::bad(format!(
                "{} must be a number or \"all\", got \"{}\"",
                field, k
            ))),
        }
    }
}

impl Default for CountValue {
    fn default() -> Self {
        Self::all()
    }
}

fn non_negative(value: i64, field: &str) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::bad(format!("{} must not be negative, got {}", field, value)))
}

/// The protocol section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    pub selection: SelectionConfig,
    pub propagation: PropagationConfig,
    #[serde(default)]
    pub update: UpdateConfig,
    #[serde(default)]
    pub expiration: ExpirationConfig,
    /// Any of these ends the run.
    #[serde(default)]
    pub stop: Vec<StopConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SelectionConfig {
    Count {
        #[serde(default)]
        num_own: CountValue,
        #[serde(default)]
        num_rec: CountValue,
    },
    Threshold {
        #[serde(default)]
        num_own: CountValue,
        #[serde(default)]
        num_rec: CountValue,
        threshold: i64,
    },
    Recommended {
        #[serde(default)]
        num_own: CountValue,
        #[serde(default)]
        num_rec: CountValue,
        prob: f64,
        /// `user \t recommended` lines.
        recommendations: PathBuf,
    },
    RealPropagated {
        #[serde(default)]
        num_own: CountValue,
        #[serde(default)]
        num_rec: CountValue,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PropagationConfig {
    Push {
        #[serde(default)]
        wait_time: i64,
        #[serde(default)]
        orientation: Option<Orientation>,
    },
    Pull {
        #[serde(default)]
        wait_time: i64,
        #[serde(default)]
        orientation: Option<Orientation>,
    },
    PushPull {
        #[serde(default)]
        wait_time: i64,
        #[serde(default)]
        orientation: Option<Orientation>,
    },
    Recommender {
        #[serde(default)]
        wait_time: i64,
        #[serde(default)]
        orientation: Option<Orientation>,
        rec_prob: f64,
        recommendations: PathBuf,
    },
    AllNeighbours {
        #[serde(default)]
        orientation: Option<Orientation>,
    },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UpdateConfig {
    #[default]
    Older,
    Newer,
    Reset,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExpirationConfig {
    #[default]
    Never,
    AllNotPropagated,
    RealPropagatedTimestamp,
    Timed { max_age: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StopConfig {
    NumIterations { limit: i64 },
    NoMorePropagated,
    NoMoreNew,
    TotalPropagated { limit: i64 },
    MaxTimestamp { timestamp: i64 },
    WallClock { seconds: f64 },
}

impl SelectionConfig {
    pub fn build(&self, data: &DiffusionData) -> Result<Box<dyn SelectionMechanism>, ConfigError> {
        Ok(match self {
            SelectionConfig::Count { num_own, num_rec } => Box::new(CountSelection::new(
                num_own.to_limit("num_own")?,
                num_rec.to_limit("num_rec")?,
            )),
            SelectionConfig::Threshold {
                num_own,
                num_rec,
                threshold,
            } => {
                let threshold = u32::try_from(*threshold)
                    .map_err(|_| ConfigError::bad(format!("threshold out of range: {}", threshold)))?;
                Box::new(ThresholdSelection::new(
                    num_own.to_limit("num_own")?,
                    num_rec.to_limit("num_rec")?,
                    threshold,
                )?)
            }
            SelectionConfig::Recommended {
                num_own,
                num_rec,
                prob,
                recommendations,
            } => {
                let recommended: HashMap<UserIdx, BTreeSet<UserIdx>> = read_recommendations_file(data, recommendations)?
                    .into_iter()
                    .map(|(user, recs)| (user, recs.into_iter().collect()))
                    .collect();
                Box::new(RecommendedSelection::new(
                    num_own.to_limit("num_own")?,
                    num_rec.to_limit("num_rec")?,
                    *prob,
                    recommended,
                )?)
            }
            SelectionConfig::RealPropagated { num_own, num_rec } => {
                if !data.has_real_propagation() {
                    tracing::warn!("real_propagated selection without ground truth never repropagates");
                }
                Box::new(RealPropagatedSelection::new(
                    num_own.to_limit("num_own")?,
                    num_rec.to_limit("num_rec")?,
                ))
            }
        })
    }
}

impl PropagationConfig {
    pub fn build(&self, data: &DiffusionData) -> Result<Box<dyn PropagationMechanism>, ConfigError> {
        Ok(match self {
            PropagationConfig::Push {
                wait_time,
                orientation,
            } => {
                let push = PushPropagation::new(non_negative(*wait_time, "wait_time")?);
                Box::new(match orientation {
                    Some(o) => push.with_orientation(*o),
                    None => push,
                })
            }
            PropagationConfig::Pull {
                wait_time,
                orientation,
            } => {
                let pull = PullPropagation::new(non_negative(*wait_time, "wait_time")?);
                Box::new(match orientation {
                    Some(o) => pull.with_orientation(*o),
                    None => pull,
                })
            }
            PropagationConfig::PushPull {
                wait_time,
                orientation,
            } => {
                let push_pull = PushPullPropagation::new(non_negative(*wait_time, "wait_time")?);
                Box::new(match orientation {
                    Some(o) => push_pull.with_orientation(*o),
                    None => push_pull,
                })
            }
            PropagationConfig::Recommender {
                wait_time,
                orientation,
                rec_prob,
                recommendations,
            } => {
                let recommender = RecommenderPropagation::new(
                    non_negative(*wait_time, "wait_time")?,
                    *rec_prob,
                    read_recommendations_file(data, recommendations)?,
                )?;
                Box::new(match orientation {
                    Some(o) => recommender.with_orientation(*o),
                    None => recommender,
                })
            }
            PropagationConfig::AllNeighbours { orientation } => Box::new(AllNeighboursPropagation::new(
                orientation.unwrap_or(Orientation::Out),
            )),
        })
    }
}

impl UpdateConfig {
    pub fn build(&self) -> Box<dyn UpdateMechanism> {
        match self {
            UpdateConfig::Older => Box::new(OlderUpdate),
            UpdateConfig::Newer => Box::new(NewerUpdate),
            UpdateConfig::Reset => Box::new(ResetUpdate),
        }
    }
}

impl ExpirationConfig {
    pub fn build(&self, data: &DiffusionData) -> Result<Box<dyn ExpirationMechanism>, ConfigError> {
        Ok(match self {
            ExpirationConfig::Never => Box::new(NeverExpire),
            ExpirationConfig::AllNotPropagated => Box::new(AllNotPropagatedExpiration),
            ExpirationConfig::RealPropagatedTimestamp => {
                if !data.has_real_propagation() {
                    tracing::warn!("real_propagated_timestamp expiration without ground truth never expires");
                }
                Box::new(RealPropagatedTimestampExpiration)
            }
            ExpirationConfig::Timed { max_age } => {
                Box::new(TimedExpiration::new(non_negative(*max_age, "max_age")?)?)
            }
        })
    }
}

impl StopConfig {
    pub fn build(&self) -> Result<Box<dyn StopCondition>, ConfigError> {
        Ok(match self {
            StopConfig::NumIterations { limit } => Box::new(NumIterations(non_negative(*limit, "limit")?)),
            StopConfig::NoMorePropagated => Box::new(NoMorePropagated),
            StopConfig::NoMoreNew => Box::new(NoMoreNew),
            StopConfig::TotalPropagated { limit } => {
                Box::new(TotalPropagated(non_negative(*limit, "limit")? as usize))
            }
            StopConfig::MaxTimestamp { timestamp } => Box::new(MaxTimestamp(*timestamp)),
            StopConfig::WallClock { seconds } => {
                let budget = Duration::try_from_secs_f64(*seconds)
                    .map_err(|_| ConfigError::bad(format!("invalid wall clock budget: {}", seconds)))?;
                Box::new(WallClock(budget))
            }
        })
    }
}

impl ProtocolConfig {
    /// Builds the stop condition; several entries combine with any-of.
    pub fn build_stop(&self) -> Result<Box<dyn StopCondition>, ConfigError> {
        match self.stop.as_slice() {
            [] => Err(ConfigError::MissingMechanism("stop")),
            [single] => single.build(),
            many => {
                let conditions = many.iter().map(StopConfig::build).collect::<Result<Vec<_>, _>>()?;
                Ok(Box::new(AnyOf(conditions)))
            }
        }
    }

    /// Builds and validates a protocol against loaded data.
    pub fn build(&self, data: &DiffusionData) -> Result<Protocol, ConfigError> {
        let protocol = Protocol::builder()
            .boxed_selection(self.selection.build(data)?)
            .boxed_propagation(self.propagation.build(data)?)
            .boxed_update(self.update.build())
            .boxed_expiration(self.expiration.build(data)?)
            .boxed_stop(self.build_stop()?)
            .build()?;
        protocol.validate(data.num_users())?;
        Ok(protocol)
    }
}

/// Template written by `diffusion_sim --print-default-config`.
pub fn default_config_toml() -> String {
    r#"# Diffusion run configuration
seed = 42

[clock]
start = 0
step = 1

[data]
edges = "edges.tsv"
pieces = "pieces.tsv"
# users = "users.txt"
# real_propagation = "real_propagation.tsv"

[data.graph]
directed = true
multigraph = false

# [[data.piece_features]]
# name = "topic"
# path = "piece_topics.tsv"

[protocol.selection]
type = "count"
num_own = "all"
num_rec = 1

[protocol.propagation]
type = "push"
wait_time = 0
orientation = "out"

[protocol.update]
type = "older"

[protocol.expiration]
type = "never"

[[protocol.stop]]
type = "num_iterations"
limit = 50

[[protocol.stop]]
type = "no_more_propagated"

[output]
dir = "output"
"#
    .to_string()
}
