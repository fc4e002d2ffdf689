use crate::model::{AssignmentModel, LinearConstraint, Sense};
use good_lp::solvers::coin_cbc::coin_cbc;
use good_lp::{
    Constraint, Expression, ProblemVariables, ResolutionError, Solution, SolverModel, Variable,
    variable, variables,
};
use log::debug;

/// What a backend found for an [`AssignmentModel`].
#[derive(Clone, Debug, PartialEq)]
pub enum SolveOutcome {
    /// One value per model variable, in model order.
    Optimal { values: Vec<f64>, objective: f64 },
    Infeasible,
    Unbounded,
    Error(String),
}

/// Common interface for MILP solvers able to minimise an assignment model.
pub trait SolverBackend: Send + Sync {
    fn solve(&self, model: &AssignmentModel) -> SolveOutcome;

    /// Solver name for logging and error messages.
    fn name(&self) -> &str;
}

/// COIN-OR CBC through `good_lp`.
#[derive(Clone, Copy, Debug, Default)]
pub struct CbcSolver;

impl CbcSolver {
    pub fn new() -> Self {
        CbcSolver
    }
}

impl SolverBackend for CbcSolver {
    fn solve(&self, model: &AssignmentModel) -> SolveOutcome {
        if model.variables().is_empty() {
            return solve_trivially(model);
        }

        let (problem_vars, indicators) = init_variables(model);
        let objective = create_objective_function(model, &indicators);
        let problem = create_model(problem_vars, objective.clone());
        let problem = model.constraints().iter().fold(problem, |m, c| {
            m.with(create_constraint(c, &indicators))
        });

        match problem.solve() {
            Ok(solution) => SolveOutcome::Optimal {
                values: indicators.iter().map(|&x| solution.value(x)).collect(),
                objective: solution.eval(objective),
            },
            Err(ResolutionError::Infeasible) => SolveOutcome::Infeasible,
            Err(ResolutionError::Unbounded) => SolveOutcome::Unbounded,
            Err(e) => SolveOutcome::Error(e.to_string()),
        }
    }

    fn name(&self) -> &str {
        "CBC"
    }
}

/// Without variables every constraint is a comparison of 0 with its rhs.
fn solve_trivially(model: &AssignmentModel) -> SolveOutcome {
    debug!("model has no variables, skipping solver");
    if model.constraints().iter().all(|c| c.holds(&[])) {
        SolveOutcome::Optimal {
            values: Vec::new(),
            objective: model.objective().constant,
        }
    } else {
        SolveOutcome::Infeasible
    }
}

fn init_variables(model: &AssignmentModel) -> (ProblemVariables, Vec<Variable>) {
    let mut problem_vars = variables!();
    let indicators = model
        .variables()
        .iter()
        .map(|_| problem_vars.add(variable().binary()))
        .collect();
    (problem_vars, indicators)
}

fn create_objective_function(model: &AssignmentModel, indicators: &[Variable]) -> Expression {
    let objective = model.objective();
    objective
        .coefficients
        .iter()
        .zip(indicators)
        .fold(Expression::from(objective.constant), |sum, (&c, &x)| {
            sum + x * c
        })
}

/// Create a model with the given objective function
fn create_model(
    variables: ProblemVariables,
    objective: Expression,
) -> impl SolverModel<Error = ResolutionError> {
    #[allow(unused_mut)]
    let mut model = variables.minimise(objective).using(coin_cbc);
    #[cfg(not(debug_assertions))]
    model.set_parameter("loglevel", "0");
    model
}

fn create_constraint(constraint: &LinearConstraint, indicators: &[Variable]) -> Constraint {
    let lhs = constraint
        .terms
        .iter()
        .map(|v| indicators[v.0])
        .fold(Expression::from(0.0), |sum, x| sum + x);

    match constraint.sense {
        Sense::Eq => lhs.eq(constraint.rhs),
        Sense::Le => lhs.leq(constraint.rhs),
        Sense::Ge => lhs.geq(constraint.rhs),
    }
}
