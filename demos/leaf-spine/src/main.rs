use std::io::Write;
use std::process::exit;

use clap::Parser;
use env_logger::Builder;

use fabsim_qllb::{FabricConfig, FabricExperiment};

/// Runs one leaf-spine fabric simulation and prints the metrics summary as JSON.
#[derive(Parser, Debug)]
#[clap(about, long_about = None)]
struct Args {
    /// Number of spine links
    #[clap(long, default_value = "2")]
    spines: usize,

    /// Number of leaf switches
    #[clap(long, default_value = "4")]
    leaves: usize,

    /// Hosts attached to each leaf
    #[clap(long, default_value = "1")]
    hosts_per_leaf: usize,

    /// Service rate of each spine link
    #[clap(long, default_value = "20.0")]
    link_rate: f64,

    /// Packets generated by each host
    #[clap(long, default_value = "100")]
    flows_per_host: u64,

    /// Packet generation rate of each host
    #[clap(long, default_value = "5.0")]
    flow_rate: f64,

    /// Queue-length normalization ceiling
    #[clap(long, default_value = "100.0")]
    qmax: f64,

    /// Route-install delay in seconds
    #[clap(long, default_value = "0.0")]
    install_delay: f64,

    /// Simulated duration in seconds
    #[clap(long, default_value = "10.0")]
    sim_time: f64,

    /// Random seed
    #[clap(long, default_value = "42")]
    seed: u64,
}

fn main() {
    Builder::from_default_env()
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .init();

    let args = Args::parse();
    let config = FabricConfig {
        spine_count: args.spines,
        leaf_count: args.leaves,
        hosts_per_leaf: args.hosts_per_leaf,
        link_rate: args.link_rate,
        flows_per_host: args.flows_per_host,
        flow_rate: args.flow_rate,
        qmax: args.qmax,
        install_delay: args.install_delay,
        sim_time: args.sim_time,
        seed: args.seed,
        ..Default::default()
    };

    let experiment = match FabricExperiment::new(config) {
        Ok(experiment) => experiment,
        Err(err) => {
            eprintln!("invalid configuration: {}", err);
            exit(1);
        }
    };
    let summary = experiment.run();
    println!("{}", serde_json::to_string_pretty(&summary).unwrap());
}
