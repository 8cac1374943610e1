#![forbid(unsafe_code)]

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;

use rankbox::{
    DataDistribution, EngineKind, Generator, Measure, QueryOptions, Relation, SatAnswer, Shape,
    WhyNotQuery,
};

#[derive(Parser)]
#[command(name = "rankbox", version, about = "Why-not-yet ranking explanations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic relation
    Generate {
        #[arg(long, default_value_t = 100)]
        tuples: usize,
        #[arg(long, default_value_t = 3)]
        attributes: usize,
        /// uniform | correlated | anti-correlated
        #[arg(long, default_value = "uniform")]
        distribution: String,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long)]
        out: PathBuf,
    },
    /// Check whether any weight vector reaches the requested rank
    Sat {
        #[arg(long)]
        data: PathBuf,
        /// Identifier of the expected tuple
        #[arg(long)]
        expect: String,
        #[arg(long)]
        rank: usize,
        #[arg(long)]
        cluster: Option<f64>,
        #[arg(long)]
        budget_ms: Option<u64>,
    },
    /// Search for the largest robust weight box
    Box {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        expect: String,
        #[arg(long)]
        rank: usize,
        /// triangle | pyramid | cube
        #[arg(long, default_value = "cube")]
        shape: String,
        /// Optimize the perimeter directly instead of binary search
        #[arg(long)]
        precise: bool,
        /// perimeter | volume
        #[arg(long, default_value = "perimeter")]
        measure: String,
        #[arg(long)]
        cluster: Option<f64>,
        #[arg(long)]
        budget_ms: Option<u64>,
    },
    /// Compute the best achievable rank (arrangement baseline)
    Best {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        expect: String,
        #[arg(long)]
        budget_ms: Option<u64>,
    },
}

fn parse_distribution(s: &str) -> Result<DataDistribution, String> {
    match s {
        "uniform" => Ok(DataDistribution::Uniform),
        "correlated" => Ok(DataDistribution::Correlated),
        "anti-correlated" => Ok(DataDistribution::AntiCorrelated),
        other => Err(format!("unknown distribution '{other}'")),
    }
}

fn parse_shape(s: &str) -> Result<Shape, String> {
    match s {
        "triangle" => Ok(Shape::Triangle),
        "pyramid" => Ok(Shape::Pyramid),
        "cube" => Ok(Shape::Cube),
        other => Err(format!("unknown shape '{other}'")),
    }
}

fn parse_measure(s: &str) -> Result<Measure, String> {
    match s {
        "perimeter" => Ok(Measure::Perimeter),
        "volume" => Ok(Measure::Volume),
        other => Err(format!("unknown measure '{other}'")),
    }
}

fn load_query(
    data: &PathBuf,
    expect: &str,
    rank: usize,
    options: QueryOptions,
) -> Result<WhyNotQuery, String> {
    let text = fs::read_to_string(data).map_err(|e| format!("reading {}: {e}", data.display()))?;
    let relation = Relation::parse(&text).map_err(|e| e.to_string())?;
    let expected = relation
        .find(expect)
        .cloned()
        .ok_or_else(|| format!("tuple '{expect}' not found in {}", data.display()))?;
    WhyNotQuery::new(&relation, vec![expected], &[rank], options).map_err(|e| e.to_string())
}

fn run(cli: Cli) -> Result<(), String> {
    match cli.command {
        Commands::Generate {
            tuples,
            attributes,
            distribution,
            seed,
            out,
        } => {
            let dist = parse_distribution(&distribution)?;
            let relation = Generator::new(tuples, attributes)
                .generate(dist, seed)
                .map_err(|e| e.to_string())?;
            fs::write(&out, relation.to_text())
                .map_err(|e| format!("writing {}: {e}", out.display()))?;
            eprintln!("wrote {} tuples to {}", tuples, out.display());
        }
        Commands::Sat {
            data,
            expect,
            rank,
            cluster,
            budget_ms,
        } => {
            let options = QueryOptions {
                engine: EngineKind::default(),
                cluster_ratio: cluster,
                budget: budget_ms.map(Duration::from_millis),
                ..QueryOptions::default()
            };
            let query = load_query(&data, &expect, rank, options)?;
            let answer = query.satisfiable().map_err(|e| e.to_string())?;
            let out = match &answer {
                SatAnswer::Satisfiable { witness } => json!({
                    "satisfiable": true,
                    "witness": witness,
                }),
                SatAnswer::Unsatisfiable => json!({ "satisfiable": false }),
            };
            println!("{}", serde_json::to_string_pretty(&out).expect("json"));
        }
        Commands::Box {
            data,
            expect,
            rank,
            shape,
            precise,
            measure,
            cluster,
            budget_ms,
        } => {
            let shape = parse_shape(&shape)?;
            let options = QueryOptions {
                engine: EngineKind::default(),
                cluster_ratio: cluster,
                precise,
                measure: parse_measure(&measure)?,
                budget: budget_ms.map(Duration::from_millis),
            };
            let query = load_query(&data, &expect, rank, options)?;
            let b = query.best_box(shape).map_err(|e| e.to_string())?;
            let out = if b.valid() {
                json!({
                    "found": true,
                    "measure": b.measure(),
                    "intervals": b.intervals(),
                })
            } else {
                json!({ "found": false })
            };
            println!("{}", serde_json::to_string_pretty(&out).expect("json"));
        }
        Commands::Best {
            data,
            expect,
            budget_ms,
        } => {
            let options = QueryOptions {
                budget: budget_ms.map(Duration::from_millis),
                ..QueryOptions::default()
            };
            let query = load_query(&data, &expect, 1, options)?;
            let best = query.best_rank().map_err(|e| e.to_string())?;
            println!("{}", json!({ "best_rank": best }));
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}
