use std::fs::{File, read_to_string};

use log::info;
use topic_assign::{CbcSolver, Problem, solve_with, write_report};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .expect("Usage: <program> <problem.yaml> [report.csv]");

    let buf = read_to_string(path)?;
    let problem: Problem = serde_yaml::from_str(&buf)?;
    let table = problem.to_table()?;
    let solution = solve_with(&table, &problem.settings, &CbcSolver::new())?;

    println!("{}", serde_yaml::to_string(&solution)?);
    for (rank, count) in &solution.statistics.by_rank {
        info!(
            "choice {rank}: {count} students ({:.1}%)",
            solution.statistics.percent_with_rank(*rank)
        );
    }

    if let Some(report) = args.next() {
        write_report(&table, &solution, File::create(&report)?)?;
        info!("wrote {report}");
    }
    Ok(())
}
