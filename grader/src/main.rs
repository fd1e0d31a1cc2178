use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use ecc_grader::checks::{self, CandidateKind};
use ecc_grader::{CHECKS, Grader, GraderConfig, Verdict, solutions};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Grader for the ECC 2025 quantum computing exercises.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Seed for every stochastic check.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Shots for ideal sampling.
    #[arg(long, global = true)]
    shots: Option<u32>,

    /// Noisy device runs in the GHZ-on-device check.
    #[arg(long, global = true)]
    trials: Option<usize>,

    /// Directory holding the .npy data files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Print verdicts as JSON lines.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List every check.
    List,
    /// Grade the built-in reference solutions (all checks when none is given).
    Demo { check: Option<String> },
    /// Grade an OpenQASM 2.0 circuit against a circuit check.
    Grade { check: String, file: PathBuf },
}

impl Cli {
    fn grader_config(&self) -> Result<GraderConfig> {
        let mut config = match &self.config {
            Some(path) => GraderConfig::from_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => GraderConfig::default(),
        };
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        if let Some(shots) = self.shots {
            config.shots = shots;
        }
        if let Some(trials) = self.trials {
            config.noisy_trials = trials;
        }
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        Ok(config)
    }
}

fn report(verdict: &Verdict, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(verdict).context("Failed to serialise verdict")?);
    } else {
        println!("[{}] {}", verdict.check, verdict);
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.grader_config()?;

    match &cli.command {
        Command::List => {
            for check in CHECKS {
                let kind = match check.kind {
                    CandidateKind::Circuit => "circuit",
                    CandidateKind::Code => "code",
                };
                println!("{:<3} {:<26} {}", check.id, check.name, kind);
            }
        }
        Command::Demo { check } => {
            let mut grader = Grader::new(config);
            let keys: Vec<&str> = match check {
                Some(key) => vec![key.as_str()],
                None => CHECKS.iter().map(|c| c.id).collect(),
            };
            let mut failed = 0;
            for key in keys {
                match solutions::demo(&mut grader, key).with_context(|| format!("Check {} errored", key))? {
                    Some(verdict) => {
                        if !verdict.passed() {
                            failed += 1;
                        }
                        report(&verdict, cli.json)?;
                    }
                    None => warn!(check = key, "no reference solution, skipping"),
                }
            }
            info!(failed, "demo finished");
            if failed > 0 {
                return Err(anyhow!("{} reference solution(s) failed", failed));
            }
        }
        Command::Grade { check, file } => {
            let info = checks::find(check).ok_or_else(|| anyhow!("Unknown check '{}'", check))?;
            let source = std::fs::read_to_string(file)
                .with_context(|| format!("Failed to read circuit file {}", file.display()))?;
            let circuit = qsim::parse_qasm(&source)
                .with_context(|| format!("Failed to parse {}", file.display()))?;
            info!(check = info.id, qubits = circuit.num_qubits, "grading circuit");
            let mut grader = Grader::new(config);
            let verdict = solutions::grade_circuit(&mut grader, info.id, &circuit)?;
            report(&verdict, cli.json)?;
        }
    }
    Ok(())
}
