//! Translation of a [`PreferenceTable`] into a solver-agnostic integer program.
//!
//! The model has one binary variable per permitted (student, topic) pair,
//! a minimised linear objective, and plain-data constraints that any
//! [`SolverBackend`](crate::solver::SolverBackend) can translate.

use crate::config::{AssignmentPolicy, ModelConfig, RankCost, UnrankedPolicy};
use crate::error::ModelError;
use crate::table::{PreferenceTable, Student, StudentId, TopicId};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::fmt;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct VarId(pub usize);

/// A binary indicator: "student is assigned to topic".
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentVar {
    pub student: StudentId,
    pub topic: TopicId,
    /// `None` for a pair the student did not rank.
    pub rank: Option<u32>,
    /// Weighted cost of making this assignment.
    pub cost: f64,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sense {
    Eq,
    Le,
    Ge,
}

impl fmt::Display for Sense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Le => "<=",
            Self::Ge => ">=",
        })
    }
}

/// What a constraint restricts, so violations can be reported by name.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Subject {
    Student(StudentId),
    Topic(TopicId),
}

/// `sum(terms) <sense> rhs` over binary indicators.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearConstraint {
    pub subject: Subject,
    pub terms: Vec<VarId>,
    pub sense: Sense,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn lhs(&self, values: &[f64]) -> f64 {
        self.terms.iter().map(|v| values[v.0]).sum()
    }

    pub fn holds(&self, values: &[f64]) -> bool {
        let lhs = self.lhs(values);
        match self.sense {
            Sense::Eq => lhs == self.rhs,
            Sense::Le => lhs <= self.rhs,
            Sense::Ge => lhs >= self.rhs,
        }
    }
}

/// `constant + sum(coefficients[i] * x_i)`, to be minimised.
#[derive(Clone, Debug, PartialEq)]
pub struct Objective {
    pub constant: f64,
    pub coefficients: Vec<f64>,
}

impl Objective {
    pub fn eval(&self, values: &[f64]) -> f64 {
        self.coefficients
            .iter()
            .zip(values)
            .fold(self.constant, |sum, (c, x)| sum + c * x)
    }
}

/// The integer program for one solve.
#[derive(Clone, Debug, PartialEq)]
pub struct AssignmentModel {
    variables: Vec<AssignmentVar>,
    objective: Objective,
    constraints: Vec<LinearConstraint>,
    /// Per-student cost of staying unassigned, when that is allowed.
    unassigned_costs: Option<Vec<f64>>,
}

impl AssignmentModel {
    pub fn variables(&self) -> &[AssignmentVar] {
        &self.variables
    }

    pub fn variable(&self, id: VarId) -> &AssignmentVar {
        &self.variables[id.0]
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn constraints(&self) -> &[LinearConstraint] {
        &self.constraints
    }

    pub fn unassigned_cost(&self, student: StudentId) -> Option<f64> {
        self.unassigned_costs.as_ref().map(|costs| costs[student.0])
    }
}

/// Build the assignment model for `table` under `config`.
pub fn build_model(
    table: &PreferenceTable,
    config: &ModelConfig,
) -> Result<AssignmentModel, ModelError> {
    let max_ranked_cost = validate_rank_cost(&config.rank_cost, &table.ranks_in_use())?;
    let max_pair_cost = validate_unranked_penalty(config.unranked, max_ranked_cost)?;
    validate_unassigned_penalty(config.assignment, max_pair_cost)?;

    let variables = init_variables(table, config)?;
    let unassigned_costs = match config.assignment {
        AssignmentPolicy::Required => None,
        AssignmentPolicy::Optional { penalty } => Some(
            table
                .students()
                .iter()
                .map(|s| s.weight * penalty)
                .collect::<Vec<_>>(),
        ),
    };

    let objective = create_objective(&variables, unassigned_costs.as_deref());

    let mut constraints = Vec::new();
    constrain_one_topic_per_student(&mut constraints, table, &variables, config.assignment);
    constrain_topic_enrollment(&mut constraints, table, &variables);

    info!(
        "built model with {} variables and {} constraints for {} students and {} topics",
        variables.len(),
        constraints.len(),
        table.students().len(),
        table.topics().len()
    );

    Ok(AssignmentModel {
        variables,
        objective,
        constraints,
        unassigned_costs,
    })
}

/// Check the rank cost over every rank in use, returning the highest cost.
fn validate_rank_cost(rank_cost: &RankCost, ranks: &BTreeSet<u32>) -> Result<f64, ModelError> {
    let mut previous = 0.0;
    for &rank in ranks {
        // Gaps in a table are reported against the student who uses them.
        let Some(cost) = rank_cost.cost(rank) else {
            continue;
        };
        if !cost.is_finite() || cost < 0.0 || cost < previous {
            return Err(ModelError::InvalidRankCost { rank, cost });
        }
        previous = cost;
    }
    Ok(previous)
}

fn validate_unranked_penalty(
    unranked: UnrankedPolicy,
    max_ranked_cost: f64,
) -> Result<f64, ModelError> {
    match unranked {
        UnrankedPolicy::Exclude => Ok(max_ranked_cost),
        UnrankedPolicy::Penalize(penalty) => {
            if penalty.is_finite() && penalty > max_ranked_cost {
                Ok(penalty)
            } else {
                Err(ModelError::PenaltyTooLow {
                    penalty_kind: "unranked",
                    penalty,
                    floor: max_ranked_cost,
                })
            }
        }
    }
}

fn validate_unassigned_penalty(
    assignment: AssignmentPolicy,
    max_pair_cost: f64,
) -> Result<(), ModelError> {
    match assignment {
        AssignmentPolicy::Optional { penalty } if !(penalty.is_finite() && penalty > max_pair_cost) => {
            Err(ModelError::PenaltyTooLow {
                penalty_kind: "unassigned",
                penalty,
                floor: max_pair_cost,
            })
        }
        _ => Ok(()),
    }
}

fn init_variables(
    table: &PreferenceTable,
    config: &ModelConfig,
) -> Result<Vec<AssignmentVar>, ModelError> {
    let mut variables = Vec::new();

    for student in table.students() {
        let before = variables.len();
        push_ranked_pairs(&mut variables, student, &config.rank_cost)?;

        if let UnrankedPolicy::Penalize(penalty) = config.unranked {
            for topic in table.topics() {
                if student.rank_of(topic.id).is_none() {
                    variables.push(AssignmentVar {
                        student: student.id,
                        topic: topic.id,
                        rank: None,
                        cost: student.weight * penalty,
                    });
                }
            }
        }

        if variables.len() == before {
            if config.assignment.requires_assignment() {
                return Err(ModelError::NoPermittedTopics {
                    student: student.name.clone(),
                });
            }
            warn!(
                "student `{}` has no permitted topic and will stay unassigned",
                student.name
            );
        }
    }

    Ok(variables)
}

fn push_ranked_pairs(
    variables: &mut Vec<AssignmentVar>,
    student: &Student,
    rank_cost: &RankCost,
) -> Result<(), ModelError> {
    for preference in &student.preferences {
        let cost = rank_cost
            .cost(preference.rank)
            .ok_or_else(|| ModelError::RankOutsideCostTable {
                student: student.name.clone(),
                rank: preference.rank,
                len: match rank_cost {
                    RankCost::Table(costs) => costs.len(),
                    _ => 0,
                },
            })?;
        variables.push(AssignmentVar {
            student: student.id,
            topic: preference.topic,
            rank: Some(preference.rank),
            cost: student.weight * cost,
        });
    }
    Ok(())
}

/// With optional assignment, `penalty * (1 - sum x)` per student is folded
/// into a constant and a negative shift of that student's coefficients.
fn create_objective(variables: &[AssignmentVar], unassigned_costs: Option<&[f64]>) -> Objective {
    match unassigned_costs {
        None => Objective {
            constant: 0.0,
            coefficients: variables.iter().map(|v| v.cost).collect(),
        },
        Some(costs) => Objective {
            constant: costs.iter().sum(),
            coefficients: variables
                .iter()
                .map(|v| v.cost - costs[v.student.0])
                .collect(),
        },
    }
}

fn constrain_one_topic_per_student(
    constraints: &mut Vec<LinearConstraint>,
    table: &PreferenceTable,
    variables: &[AssignmentVar],
    assignment: AssignmentPolicy,
) {
    let sense = match assignment {
        AssignmentPolicy::Required => Sense::Eq,
        AssignmentPolicy::Optional { .. } => Sense::Le,
    };

    for student in table.students() {
        let terms = vars_where(variables, |v| v.student == student.id);
        debug!(
            "student `{}`: {} permitted topics, sum {} 1",
            student.name,
            terms.len(),
            sense
        );
        constraints.push(LinearConstraint {
            subject: Subject::Student(student.id),
            terms,
            sense,
            rhs: 1.0,
        });
    }
}

fn constrain_topic_enrollment(
    constraints: &mut Vec<LinearConstraint>,
    table: &PreferenceTable,
    variables: &[AssignmentVar],
) {
    for topic in table.topics() {
        let terms = vars_where(variables, |v| v.topic == topic.id);
        debug!(
            "topic `{}`: {} candidate students, {}..={} places",
            topic.name,
            terms.len(),
            topic.minimum,
            topic.capacity
        );

        if topic.minimum > 0 {
            constraints.push(LinearConstraint {
                subject: Subject::Topic(topic.id),
                terms: terms.clone(),
                sense: Sense::Ge,
                rhs: f64::from(topic.minimum),
            });
        }
        constraints.push(LinearConstraint {
            subject: Subject::Topic(topic.id),
            terms,
            sense: Sense::Le,
            rhs: f64::from(topic.capacity),
        });
    }
}

fn vars_where(variables: &[AssignmentVar], keep: impl Fn(&AssignmentVar) -> bool) -> Vec<VarId> {
    variables
        .iter()
        .enumerate()
        .filter(|(_, v)| keep(v))
        .map(|(i, _)| VarId(i))
        .collect()
}
