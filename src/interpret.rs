use crate::config::{ModelConfig, UnrankedPolicy};
use crate::error::{InfeasibilityCause, InterpretationError};
use crate::model::{AssignmentModel, Subject};
use crate::table::{PreferenceTable, TopicId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Largest distance from 0 or 1 accepted for an indicator value.
pub const BINARY_TOLERANCE: f64 = 1e-6;

/// Relative tolerance between the reported and recomputed objective.
pub const OBJECTIVE_TOLERANCE: f64 = 1e-6;

/// How well the assignment matched the students' rankings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    pub students: usize,
    /// Students per rank of the topic they received.
    pub by_rank: BTreeMap<u32, usize>,
    /// Students placed in a topic they did not rank.
    pub unranked: usize,
    pub unassigned: usize,
    pub total_cost: f64,
}

impl Statistics {
    /// Share of students, in percent, who received their `rank`-th choice.
    pub fn percent_with_rank(&self, rank: u32) -> f64 {
        if self.students == 0 {
            return 0.0;
        }
        let count = self.by_rank.get(&rank).copied().unwrap_or(0);
        count as f64 / self.students as f64 * 100.0
    }
}

/// The outcome of one solve: who got which topic, and at what cost.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub assignments: BTreeMap<String, Option<String>>,
    pub objective: f64,
    pub statistics: Statistics,
}

/// Validate raw solver values against `model` and turn them into a [`Solution`].
pub fn interpret(
    table: &PreferenceTable,
    model: &AssignmentModel,
    values: &[f64],
    reported_objective: f64,
) -> Result<Solution, InterpretationError> {
    let rounded = round_to_binary(table, model, values)?;

    for constraint in model.constraints() {
        if !constraint.holds(&rounded) {
            let subject = match constraint.subject {
                Subject::Student(id) => format!("student `{}`", table.student(id).name),
                Subject::Topic(id) => format!("topic `{}`", table.topic(id).name),
            };
            return Err(InterpretationError::ConstraintViolated {
                subject,
                lhs: constraint.lhs(&rounded),
                rhs: constraint.rhs,
            });
        }
    }

    let computed = model.objective().eval(&rounded);
    let tolerance = OBJECTIVE_TOLERANCE * computed.abs().max(1.0);
    if (computed - reported_objective).abs() > tolerance {
        return Err(InterpretationError::ObjectiveMismatch {
            reported: reported_objective,
            computed,
        });
    }

    let mut chosen: Vec<Option<usize>> = vec![None; table.students().len()];
    for (i, var) in model.variables().iter().enumerate() {
        if rounded[i] == 1.0 {
            chosen[var.student.0] = Some(i);
        }
    }

    let mut assignments = BTreeMap::new();
    let mut statistics = Statistics {
        students: table.students().len(),
        total_cost: computed,
        ..Statistics::default()
    };
    for (student, &choice) in table.students().iter().zip(&chosen) {
        let topic = choice.map(|i| {
            let var = &model.variables()[i];
            match var.rank {
                Some(rank) => *statistics.by_rank.entry(rank).or_insert(0) += 1,
                None => statistics.unranked += 1,
            }
            table.topic(var.topic).name.clone()
        });
        if topic.is_none() {
            statistics.unassigned += 1;
        }
        assignments.insert(student.name.clone(), topic);
    }

    Ok(Solution {
        assignments,
        objective: computed,
        statistics,
    })
}

fn round_to_binary(
    table: &PreferenceTable,
    model: &AssignmentModel,
    values: &[f64],
) -> Result<Vec<f64>, InterpretationError> {
    if values.len() != model.variables().len() {
        return Err(InterpretationError::ValueCountMismatch {
            expected: model.variables().len(),
            got: values.len(),
        });
    }

    model
        .variables()
        .iter()
        .zip(values)
        .map(|(var, &value)| {
            let rounded = value.round();
            if (rounded == 0.0 || rounded == 1.0) && (value - rounded).abs() <= BINARY_TOLERANCE {
                Ok(rounded)
            } else {
                Err(InterpretationError::NonBinaryValue {
                    student: table.student(var.student).name.clone(),
                    topic: table.topic(var.topic).name.clone(),
                    value,
                })
            }
        })
        .collect()
}

/// Name the cheapest-to-detect structural reason a model may be infeasible.
pub fn diagnose_infeasibility(table: &PreferenceTable, config: &ModelConfig) -> InfeasibilityCause {
    let students = table.students().len();
    let required = config.assignment.requires_assignment();

    let capacity = table.total_capacity();
    if required && capacity < students as u64 {
        return InfeasibilityCause::CapacityShortfall { students, capacity };
    }

    let minimums: u64 = table.topics().iter().map(|t| u64::from(t.minimum)).sum();
    if minimums > students as u64 {
        return InfeasibilityCause::MinimumsExceedStudents {
            required: minimums,
            students,
        };
    }

    let permitted: Vec<BTreeSet<TopicId>> = table
        .students()
        .iter()
        .map(|s| match config.unranked {
            UnrankedPolicy::Exclude => s.preferences.iter().map(|p| p.topic).collect(),
            UnrankedPolicy::Penalize(_) => table.topics().iter().map(|t| t.id).collect(),
        })
        .collect();

    for topic in table.topics() {
        let eligible = permitted.iter().filter(|p| p.contains(&topic.id)).count();
        if eligible < topic.minimum as usize {
            return InfeasibilityCause::TopicUnderSubscribed {
                topic: topic.name.clone(),
                minimum: topic.minimum,
                eligible,
            };
        }
    }

    if required {
        let mut groups: BTreeMap<&BTreeSet<TopicId>, Vec<String>> = BTreeMap::new();
        for (student, topics) in table.students().iter().zip(&permitted) {
            groups.entry(topics).or_default().push(student.name.clone());
        }
        for (topics, names) in groups {
            let capacity: u64 = topics
                .iter()
                .map(|&t| u64::from(table.topic(t).capacity))
                .sum();
            if (names.len() as u64) > capacity {
                return InfeasibilityCause::OversubscribedChoices {
                    topics: topics.iter().map(|&t| table.topic(t).name.clone()).collect(),
                    students: names,
                    capacity,
                };
            }
        }
    }

    InfeasibilityCause::Undetermined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssignmentPolicy;
    use crate::model::build_model;
    use crate::table::{RawStudent, RawTopic};

    fn three_students() -> PreferenceTable {
        PreferenceTable::new(
            vec![RawTopic::new("X", 2), RawTopic::new("Y", 1)],
            vec![
                RawStudent::ranked("A", ["X", "Y"]),
                RawStudent::ranked("B", ["X", "Y"]),
                RawStudent::ranked("C", ["Y", "X"]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn optimal_values_become_a_solution() {
        let table = three_students();
        let model = build_model(&table, &ModelConfig::default()).unwrap();

        let values = [1.0, 0.0, 0.9999999, 1e-9, 1.0, 0.0];
        let solution = interpret(&table, &model, &values, 3.0000001).unwrap();

        assert_eq!(solution.assignments["A"].as_deref(), Some("X"));
        assert_eq!(solution.assignments["B"].as_deref(), Some("X"));
        assert_eq!(solution.assignments["C"].as_deref(), Some("Y"));
        assert_eq!(solution.objective, 3.0);
        assert_eq!(solution.statistics.by_rank, BTreeMap::from([(1, 3)]));
        assert_eq!(solution.statistics.percent_with_rank(1), 100.0);
        assert_eq!(solution.statistics.percent_with_rank(2), 0.0);
        assert_eq!(solution.statistics.unassigned, 0);
    }

    #[test]
    fn fractional_values_are_rejected() {
        let table = three_students();
        let model = build_model(&table, &ModelConfig::default()).unwrap();

        let values = [0.5, 0.5, 1.0, 0.0, 1.0, 0.0];
        let err = interpret(&table, &model, &values, 3.5).unwrap_err();
        assert_eq!(
            err,
            InterpretationError::NonBinaryValue {
                student: "A".into(),
                topic: "X".into(),
                value: 0.5
            }
        );

        let err = interpret(&table, &model, &[1.0, 0.0], 1.0).unwrap_err();
        assert_eq!(
            err,
            InterpretationError::ValueCountMismatch {
                expected: 6,
                got: 2
            }
        );
    }

    #[test]
    fn constraint_violations_are_rejected() {
        let table = three_students();
        let model = build_model(&table, &ModelConfig::default()).unwrap();

        // Everyone in X exceeds its capacity of 2
        let values = [1.0, 0.0, 1.0, 0.0, 0.0, 1.0];
        let err = interpret(&table, &model, &values, 4.0).unwrap_err();
        assert_eq!(
            err,
            InterpretationError::ConstraintViolated {
                subject: "topic `X`".into(),
                lhs: 3.0,
                rhs: 2.0
            }
        );

        // A gets nothing
        let values = [0.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let err = interpret(&table, &model, &values, 2.0).unwrap_err();
        assert!(matches!(
            err,
            InterpretationError::ConstraintViolated { ref subject, .. } if subject == "student `A`"
        ));
    }

    #[test]
    fn objective_drift_is_rejected() {
        let table = three_students();
        let model = build_model(&table, &ModelConfig::default()).unwrap();

        let values = [1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let err = interpret(&table, &model, &values, 4.0).unwrap_err();
        assert_eq!(
            err,
            InterpretationError::ObjectiveMismatch {
                reported: 4.0,
                computed: 3.0
            }
        );
    }

    #[test]
    fn unassigned_and_unranked_are_counted() {
        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 1), RawTopic::new("Y", 1)],
            vec![
                RawStudent::ranked("A", ["X"]),
                RawStudent::ranked("B", ["X"]),
                RawStudent::ranked("C", ["X"]),
            ],
        )
        .unwrap();
        let config = ModelConfig {
            unranked: UnrankedPolicy::Penalize(5.0),
            assignment: AssignmentPolicy::Optional { penalty: 20.0 },
            ..ModelConfig::default()
        };
        let model = build_model(&table, &config).unwrap();

        // Per student: [ranked X, unranked Y]. A→X, B→Y, C unassigned
        let values = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        let solution = interpret(&table, &model, &values, 26.0).unwrap();

        assert_eq!(solution.assignments["B"].as_deref(), Some("Y"));
        assert_eq!(solution.assignments["C"], None);
        assert_eq!(solution.statistics.by_rank, BTreeMap::from([(1, 1)]));
        assert_eq!(solution.statistics.unranked, 1);
        assert_eq!(solution.statistics.unassigned, 1);
        assert_eq!(solution.statistics.total_cost, 26.0);
    }

    #[test]
    fn infeasibility_causes() {
        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 1)],
            vec![
                RawStudent::ranked("A", ["X"]),
                RawStudent::ranked("B", ["X"]),
            ],
        )
        .unwrap();
        assert_eq!(
            diagnose_infeasibility(&table, &ModelConfig::default()),
            InfeasibilityCause::CapacityShortfall {
                students: 2,
                capacity: 1
            }
        );

        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 1), RawTopic::new("Y", 5)],
            vec![
                RawStudent::ranked("A", ["X"]),
                RawStudent::ranked("B", ["X"]),
                RawStudent::ranked("C", ["Y"]),
            ],
        )
        .unwrap();
        assert_eq!(
            diagnose_infeasibility(&table, &ModelConfig::default()),
            InfeasibilityCause::OversubscribedChoices {
                topics: vec!["X".into()],
                students: vec!["A".into(), "B".into()],
                capacity: 1
            }
        );

        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 3), RawTopic::new("Y", 2).with_minimum(1)],
            vec![RawStudent::ranked("A", ["X"]), RawStudent::ranked("B", ["X"])],
        )
        .unwrap();
        assert_eq!(
            diagnose_infeasibility(&table, &ModelConfig::default()),
            InfeasibilityCause::TopicUnderSubscribed {
                topic: "Y".into(),
                minimum: 1,
                eligible: 0
            }
        );

        let table = PreferenceTable::new(
            vec![RawTopic::new("X", 2).with_minimum(2)],
            vec![RawStudent::ranked("A", ["X"])],
        )
        .unwrap();
        assert_eq!(
            diagnose_infeasibility(&table, &ModelConfig::default()),
            InfeasibilityCause::MinimumsExceedStudents {
                required: 2,
                students: 1
            }
        );
    }
}
