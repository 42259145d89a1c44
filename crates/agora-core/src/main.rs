use agora_core::harness::{run_simulator, SimulatorConfig};
use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Command::new("agora-core")
        .version(agora_core::VERSION)
        .about("WellAgora ledger consistency simulator")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("simulate")
                .about("Run randomized ledger consistency checks")
                .arg(
                    Arg::new("operations")
                        .long("operations")
                        .default_value("1000")
                        .value_parser(value_parser!(u64))
                        .help("Number of random ledger operations to run"),
                )
                .arg(
                    Arg::new("sponsors")
                        .long("sponsors")
                        .default_value("4")
                        .value_parser(value_parser!(usize))
                        .help("Number of sponsors sharing the ledger"),
                )
                .arg(
                    Arg::new("seed")
                        .long("seed")
                        .default_value("42")
                        .value_parser(value_parser!(u64))
                        .help("Random seed for reproducibility"),
                )
                .arg(
                    Arg::new("stop-on-violation")
                        .long("stop-on-violation")
                        .action(ArgAction::SetTrue)
                        .help("Stop the simulation at the first violation"),
                ),
        )
        .get_matches();

    match cli.subcommand() {
        Some(("simulate", matches)) => {
            let config = SimulatorConfig {
                seed: *matches.get_one::<u64>("seed").context("seed")?,
                total_operations: *matches.get_one::<u64>("operations").context("operations")?,
                sponsors: *matches.get_one::<usize>("sponsors").context("sponsors")?,
                stop_on_first_violation: matches.get_flag("stop-on-violation"),
                ..SimulatorConfig::default()
            };

            let report = run_simulator(config).await;
            println!("{}", report.generate_text());

            if !report.passed() {
                anyhow::bail!("simulation detected ledger violations");
            }
        }
        _ => unreachable!("subcommand required"),
    }

    Ok(())
}
