#![forbid(unsafe_code)]
//! Mine the next block over the configured ledger and persist the result.

use clap::Parser;
use minechain::config::load_config;
use minechain::node::Node;
use minechain::record::Record;
use minechain::work::difficulty;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "mine-block", about = "Mine one block onto the local ledger")]
struct Args {
    /// Path to the configuration file
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Opaque records to include in the block payload
    #[arg(long = "data")]
    data: Vec<String>,

    /// Override the configured difficulty target
    #[arg(long)]
    difficulty: Option<usize>,

    /// Override the configured worker thread count
    #[arg(long)]
    threads: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(target) = args.difficulty {
        config.miner.difficulty = target;
    }
    if let Some(threads) = args.threads {
        config.miner.threads = threads;
    }
    let target = config.miner.difficulty;
    let threads = config.miner.threads;

    let node = Node::init(config)?;
    let records: Vec<Record> = args.data.into_iter().map(Record::Opaque).collect();

    println!(
        "⛏️  mining block {} at difficulty {} with {} worker(s)...",
        node.last_block().map(|b| b.number + 1).unwrap_or(0),
        target,
        threads
    );

    let start = Instant::now();
    let mined = node.mine_next(records)?;
    let elapsed = start.elapsed();
    node.save()?;

    println!("\n✅ block mined and persisted");
    println!("   number:     {}", mined.number);
    println!("   digest:     {}", mined.digest());
    println!("   difficulty: {}", difficulty(&mined.digest()));
    println!("   nonce:      {}", mined.nonce.as_deref().unwrap_or("-"));
    println!("   records:    {}", mined.data.len());
    println!("   time:       {:.3}s", elapsed.as_secs_f64());
    println!("   height:     {}", node.chain_snapshot().len());

    Ok(())
}
