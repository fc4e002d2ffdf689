use thiserror::Error;

/// Malformed or inconsistent preference data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no topics were given")]
    NoTopics,

    #[error("topic `{topic}` is listed more than once")]
    DuplicateTopicName { topic: String },

    #[error("student `{student}` is listed more than once")]
    DuplicateStudent { student: String },

    #[error("topic `{topic}` has non-positive capacity {capacity}")]
    NonPositiveCapacity { topic: String, capacity: i64 },

    #[error("topic `{topic}` has minimum {minimum}, expected 0..={capacity}")]
    InvalidMinimum {
        topic: String,
        minimum: i64,
        capacity: u32,
    },

    #[error("student `{student}` ranks unknown topic `{topic}`")]
    UnknownTopic { student: String, topic: String },

    #[error("student `{student}` ranks topic `{topic}` more than once")]
    DuplicateTopic { student: String, topic: String },

    #[error("student `{student}` gives topic `{topic}` non-positive rank {rank}")]
    NonPositiveRank {
        student: String,
        topic: String,
        rank: i64,
    },

    #[error("student `{student}` uses rank {rank} more than once")]
    DuplicateRank { student: String, rank: u32 },

    #[error("student `{student}` has invalid weight {weight}")]
    InvalidWeight { student: String, weight: f64 },
}

/// The model cannot be built, or is unsatisfiable before any solver runs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("student `{student}` has no permitted topic")]
    NoPermittedTopics { student: String },

    #[error("rank cost for rank {rank} is {cost}, expected a finite, non-negative, non-decreasing cost")]
    InvalidRankCost { rank: u32, cost: f64 },

    #[error("rank {rank} is outside the cost table of {len} entries (student `{student}`)")]
    RankOutsideCostTable {
        student: String,
        rank: u32,
        len: usize,
    },

    #[error("{penalty_kind} penalty {penalty} must exceed {floor}")]
    PenaltyTooLow {
        penalty_kind: &'static str,
        penalty: f64,
        floor: f64,
    },
}

/// The structural condition suspected of making a model infeasible.
#[derive(Debug, Clone, PartialEq)]
pub enum InfeasibilityCause {
    CapacityShortfall {
        students: usize,
        capacity: u64,
    },
    MinimumsExceedStudents {
        required: u64,
        students: usize,
    },
    TopicUnderSubscribed {
        topic: String,
        minimum: u32,
        eligible: usize,
    },
    OversubscribedChoices {
        topics: Vec<String>,
        students: Vec<String>,
        capacity: u64,
    },
    Undetermined,
}

impl std::fmt::Display for InfeasibilityCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CapacityShortfall { students, capacity } => write!(
                f,
                "capacity shortfall: {students} students but only {capacity} places"
            ),
            Self::MinimumsExceedStudents { required, students } => write!(
                f,
                "topic minimums need {required} students but only {students} exist"
            ),
            Self::TopicUnderSubscribed {
                topic,
                minimum,
                eligible,
            } => write!(
                f,
                "topic `{topic}` needs {minimum} students but only {eligible} may take it"
            ),
            Self::OversubscribedChoices {
                topics,
                students,
                capacity,
            } => write!(
                f,
                "students [{}] can only take topics [{}] with {capacity} places",
                students.join(", "),
                topics.join(", ")
            ),
            Self::Undetermined => write!(f, "conflicting constraints"),
        }
    }
}

/// The solver proved that no assignment satisfies every constraint.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("no feasible assignment exists ({cause})")]
pub struct InfeasibleAssignmentError {
    pub cause: InfeasibilityCause,
}

/// The solver's answer breaks the model it was given.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretationError {
    #[error("solver returned {got} values for {expected} variables")]
    ValueCountMismatch { expected: usize, got: usize },

    #[error("solver returned non-binary value {value} for student `{student}` in topic `{topic}`")]
    NonBinaryValue {
        student: String,
        topic: String,
        value: f64,
    },

    #[error("assignment violates the constraint on {subject}: {lhs} vs {rhs}")]
    ConstraintViolated { subject: String, lhs: f64, rhs: f64 },

    #[error("solver reported objective {reported} but the assignment costs {computed}")]
    ObjectiveMismatch { reported: f64, computed: f64 },
}

/// A solver failure unrelated to feasibility.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SolverError {
    #[error("{solver} reported an unbounded objective")]
    Unbounded { solver: String },

    #[error("{solver} failed: {reason}")]
    Failed { solver: String, reason: String },
}

/// Any failure of the build, solve and interpret pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssignmentError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Infeasible(#[from] InfeasibleAssignmentError),
    #[error(transparent)]
    Interpretation(#[from] InterpretationError),
    #[error(transparent)]
    Solver(#[from] SolverError),
}
