use anyhow::Context;
use clap::{Parser as ClapParser, Subcommand};
use codegraph::error::LangError;
use codegraph::graph::{EvalResult, Graph};
use codegraph::json::output_to_json;
use codegraph::{evaluate_source, parser};

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

#[derive(ClapParser)]
#[command(name = "codegraph")]
#[command(about = "Evaluate code-node graphs and expressions")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a single expression (read from stdin when omitted)
    Eval {
        /// The code to evaluate
        code: Option<String>,
    },
    /// Load a saved graph, evaluate every node and print the results
    Run {
        /// Path to the graph JSON file
        file: PathBuf,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Report nodes of a saved graph whose source does not parse
    Check {
        /// Path to the graph JSON file
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Eval { code } => {
            let code = match code {
                Some(code) => code,
                None => {
                    let mut input = String::new();
                    io::stdin()
                        .read_to_string(&mut input)
                        .context("reading stdin")?;
                    input
                }
            };
            match evaluate_source(&code) {
                Ok(value) => println!("{}", value),
                Err(err) => {
                    report(&code, &err);
                    std::process::exit(1);
                }
            }
        }
        Commands::Run { file, json } => {
            let mut graph = load(&file)?;
            graph.recompute_all()?;
            if json {
                let outputs: Vec<_> = graph
                    .nodes()
                    .map(|node| output_to_json(node.output()))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&outputs)?);
            } else {
                for (index, node) in graph.nodes().enumerate() {
                    let label = node.title.clone().unwrap_or_else(|| format!("node {}", index));
                    match node.output() {
                        Some(EvalResult::Ok { text, .. }) => println!("{}: {}", label, text),
                        Some(EvalResult::Err { message }) => println!("{}: error: {}", label, message),
                        None => println!("{}: (not evaluated)", label),
                    }
                }
            }
        }
        Commands::Check { file } => {
            let graph = load(&file)?;
            let mut failures = 0;
            for (index, node) in graph.nodes().enumerate() {
                if let Err(err) = parser::parse_source(node.src()) {
                    failures += 1;
                    eprintln!("NODE {}:", node.title.clone().unwrap_or_else(|| index.to_string()));
                    report(node.src(), &err);
                }
            }
            if failures > 0 {
                std::process::exit(1);
            }
        }
    }
    Ok(())
}

fn load(file: &PathBuf) -> anyhow::Result<Graph> {
    let data = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    Graph::from_json(&data).with_context(|| format!("loading {}", file.display()))
}

/// Print an error, pointing at the offending character for lex errors.
fn report(src: &str, err: &LangError) {
    if let LangError::Lex(lex) = err {
        let line_text = src.lines().nth(lex.position.line).unwrap_or("");
        eprintln!("ERROR AT LINE {}:", lex.position.line + 1);
        eprintln!("{}", line_text);
        eprintln!("{}^", " ".repeat(lex.position.column));
    }
    eprintln!("{} ({})", err, err.code());
    eprintln!();
}
