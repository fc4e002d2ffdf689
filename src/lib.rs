pub mod config;
pub mod error;
pub mod interpret;
pub mod model;
pub mod report;
pub mod solver;
pub mod table;

pub use config::{AssignmentPolicy, CostFn, ModelConfig, RankCost, UnrankedPolicy};
pub use error::{
    AssignmentError, InfeasibilityCause, InfeasibleAssignmentError, InterpretationError,
    ModelError, SolverError, ValidationError,
};
pub use interpret::{Solution, Statistics, diagnose_infeasibility, interpret};
pub use model::{AssignmentModel, build_model};
pub use report::write_report;
pub use solver::{CbcSolver, SolveOutcome, SolverBackend};
pub use table::{PreferenceTable, RawChoice, RawStudent, RawTopic};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A problem file: topics with capacities, students with ranked choices,
/// and optional model settings.
#[derive(Debug, Serialize, Deserialize)]
pub struct Problem {
    pub topics: BTreeMap<String, TopicSpec>,
    pub students: BTreeMap<String, StudentSpec>,
    #[serde(default)]
    pub settings: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TopicSpec {
    Capacity(i64),
    Detailed {
        capacity: i64,
        #[serde(default)]
        minimum: i64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StudentSpec {
    Choices(Vec<ChoiceSpec>),
    Detailed {
        choices: Vec<ChoiceSpec>,
        weight: Option<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChoiceSpec {
    Topic(String),
    Ranked { topic: String, rank: i64 },
}

impl Problem {
    /// Validate the file contents into a [`PreferenceTable`].
    pub fn to_table(&self) -> Result<PreferenceTable, ValidationError> {
        let topics = self
            .topics
            .iter()
            .map(|(name, spec)| match *spec {
                TopicSpec::Capacity(capacity) => RawTopic::new(name.clone(), capacity),
                TopicSpec::Detailed { capacity, minimum } => {
                    RawTopic::new(name.clone(), capacity).with_minimum(minimum)
                }
            })
            .collect();

        let students = self
            .students
            .iter()
            .map(|(name, spec)| {
                let (choices, weight) = match spec {
                    StudentSpec::Choices(choices) => (choices, None),
                    StudentSpec::Detailed { choices, weight } => (choices, *weight),
                };
                RawStudent {
                    name: name.clone(),
                    choices: choices.iter().map(to_raw_choice).collect(),
                    weight,
                }
            })
            .collect();

        PreferenceTable::new(topics, students)
    }

    /// Solve with the default CBC backend.
    pub fn solve(&self) -> Result<Solution, AssignmentError> {
        let table = self.to_table()?;
        solve_with(&table, &self.settings, &CbcSolver::new())
    }
}

fn to_raw_choice(choice: &ChoiceSpec) -> RawChoice {
    match choice {
        ChoiceSpec::Topic(topic) => RawChoice::Positional(topic.clone()),
        ChoiceSpec::Ranked { topic, rank } => RawChoice::Ranked {
            topic: topic.clone(),
            rank: *rank,
        },
    }
}

/// Build the model for `table`, solve it with `solver` and interpret the result.
///
/// Aborts at the first error; a partial solution is never returned.
pub fn solve_with<S: SolverBackend + ?Sized>(
    table: &PreferenceTable,
    config: &ModelConfig,
    solver: &S,
) -> Result<Solution, AssignmentError> {
    let model = build_model(table, config)?;

    info!("solving with {}", solver.name());
    match solver.solve(&model) {
        SolveOutcome::Optimal { values, objective } => {
            let solution = interpret(table, &model, &values, objective)?;
            info!(
                "objective {}: {} of {} students got their first choice, {} unassigned",
                solution.objective,
                solution.statistics.by_rank.get(&1).copied().unwrap_or(0),
                solution.statistics.students,
                solution.statistics.unassigned
            );
            Ok(solution)
        }
        SolveOutcome::Infeasible => {
            let cause = diagnose_infeasibility(table, config);
            warn!("{} found no feasible assignment: {cause}", solver.name());
            Err(InfeasibleAssignmentError { cause }.into())
        }
        SolveOutcome::Unbounded => Err(SolverError::Unbounded {
            solver: solver.name().to_owned(),
        }
        .into()),
        SolveOutcome::Error(reason) => Err(SolverError::Failed {
            solver: solver.name().to_owned(),
            reason,
        }
        .into()),
    }
}
