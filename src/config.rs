use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A caller supplied `cost(rank)` function.
#[derive(Clone)]
pub struct CostFn(Arc<dyn Fn(u32) -> f64 + Send + Sync>);

impl CostFn {
    pub fn new(f: impl Fn(u32) -> f64 + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CostFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CostFn(..)")
    }
}

/// Maps a rank (1 = most preferred) to a non-negative cost.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankCost {
    /// `cost(rank) = rank`
    #[default]
    Linear,
    /// `cost(rank) = rank²`
    Squared,
    /// Entry `rank - 1` is the cost of `rank`.
    Table(Vec<f64>),
    #[serde(skip)]
    Custom(CostFn),
}

impl RankCost {
    pub fn custom(f: impl Fn(u32) -> f64 + Send + Sync + 'static) -> Self {
        Self::Custom(CostFn::new(f))
    }

    /// Cost of `rank`, or `None` if a table does not cover it.
    pub fn cost(&self, rank: u32) -> Option<f64> {
        match self {
            Self::Linear => Some(f64::from(rank)),
            Self::Squared => Some(f64::from(rank) * f64::from(rank)),
            Self::Table(costs) => costs.get(rank.checked_sub(1)? as usize).copied(),
            Self::Custom(f) => Some((f.0)(rank)),
        }
    }
}

/// What happens to (student, topic) pairs the student did not rank.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnrankedPolicy {
    /// Unranked pairs are never assigned.
    #[default]
    Exclude,
    /// Unranked pairs may be assigned at this cost.
    Penalize(f64),
}

/// Whether every student must receive a topic.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentPolicy {
    #[default]
    Required,
    /// A student may stay unassigned, at `penalty` (scaled by weight).
    Optional { penalty: f64 },
}

impl AssignmentPolicy {
    pub fn requires_assignment(&self) -> bool {
        matches!(self, Self::Required)
    }
}

/// Everything the model builder is parameterised by.
///
/// Defaults: linear rank cost, unranked topics excluded, every student
/// assigned.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub rank_cost: RankCost,
    pub unranked: UnrankedPolicy,
    pub assignment: AssignmentPolicy,
}
