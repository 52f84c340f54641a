use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use bf_core::VariableValue;
use bf_engine::{Engine, EngineOptions};

mod cli_args;
mod script_file;
mod substitute;

use cli_args::{CheckArgs, Cli, Mode, RunArgs};

/// Upper bound on simulated ticks for one run, so a flowchart that never
/// finishes cannot wedge the process.
const MAX_TICKS: u64 = 600_000;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match cli.command {
        Mode::Run(args) => run_flowchart(args),
        Mode::Check(args) => check_flowchart(args),
    }
}

fn run_flowchart(args: RunArgs) -> anyhow::Result<ExitCode> {
    let file = script_file::load_flowchart(Path::new(&args.flowchart))?;
    let options = EngineOptions {
        step_delay: args.step_delay_ms.map(Duration::from_millis),
        random_seed: args.seed,
    };
    let mut engine = script_file::build_engine(&file, options)?;

    let block = match &args.block {
        Some(name) => name.clone(),
        None => match file.blocks.first() {
            Some(spec) => spec.name.clone(),
            None => bail!("flowchart \"{}\" has no blocks", file.name),
        },
    };

    info!(flowchart = %file.name, block = %block, "starting");
    engine.execute_block_named(&block)?;

    let tick = Duration::from_millis(args.tick_ms.max(1));
    let mut ticks = 0u64;
    while engine.any_executing() {
        ticks += 1;
        if ticks > MAX_TICKS {
            bail!("block \"{}\" did not finish within {} ticks", block, MAX_TICKS);
        }
        engine.tick(tick);
    }
    info!(ticks, "finished");

    print_variables(&engine);
    if let Some(template) = &args.report {
        println!("{}", substitute::substitute(template, engine.variables()));
    }
    Ok(ExitCode::SUCCESS)
}

fn check_flowchart(args: CheckArgs) -> anyhow::Result<ExitCode> {
    let file = script_file::load_flowchart(Path::new(&args.flowchart))?;
    let engine = script_file::build_engine(&file, EngineOptions::default())?;

    let mut faults = 0usize;
    for block in engine.blocks() {
        println!("block {}", block.name);
        for (index, command) in block.commands().iter().enumerate() {
            let summary = command.summary(engine.variables());
            let marker = if command.has_error(engine.variables()) {
                faults += 1;
                "!"
            } else if command.enabled {
                " "
            } else {
                "-"
            };
            println!(
                "  {} [{}]{} {}",
                marker,
                index,
                "  ".repeat(command.indent_level),
                summary
            );
        }
    }

    if faults > 0 {
        println!("{} command(s) with configuration errors", faults);
        return Ok(ExitCode::FAILURE);
    }
    println!("ok");
    Ok(ExitCode::SUCCESS)
}

fn print_variables(engine: &Engine) {
    for variable in engine.variables().variables() {
        match &variable.value {
            VariableValue::Scalar(scalar) => println!("{} = {}", variable.name, scalar),
            VariableValue::Collection(collection) => {
                let items: Vec<String> = (0..collection.count())
                    .filter_map(|index| collection.get_scalar(index).ok())
                    .map(|scalar| scalar.to_string())
                    .collect();
                println!("{} = [{}]", variable.name, items.join(", "));
            }
        }
    }
}
