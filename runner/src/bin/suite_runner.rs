use std::process;

use clap::Parser as _;
use suite_runner::{Args, init_tracing, run};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let report = run(args).await?;
    println!("{report}");

    if !report.is_success() {
        process::exit(1);
    }
    Ok(())
}
