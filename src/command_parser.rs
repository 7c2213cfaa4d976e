use std::{num::ParseIntError, path::PathBuf, time::Duration};

use clap::*;
use lfpipe::{PipelineConfig, WaiterType};
use strum::Display;

#[derive(Debug, Parser)]
#[clap(name = "lfpipe", version)]
/// Routes integers through a lock-free producer/consumer pipeline: even
/// numbers are squared, odd numbers are tested for primality, and the results
/// are printed in creation order.
pub struct App {
    /// File of whitespace-separated 32-bit integers
    pub input: PathBuf,
    #[command(flatten)]
    pub global_opts: GlobalOpts,
}

#[derive(Debug, Clone, Copy, ValueEnum, Display)]
pub enum OutputFormat {
    /// One human readable line per result
    Text,
    /// One JSON object per line
    Json,
}

#[derive(Debug, Args)]
pub struct GlobalOpts {
    #[arg(long, short, default_value = "text")]
    pub format: OutputFormat,
    /// How consumers wait for work
    #[arg(long, short, default_value = "spin")]
    pub waiter: WaiterType,
    /// Merge back-off in microseconds when no result was available
    #[arg(long, value_parser = parse_micros, default_value = "1000")]
    pub poll_interval: Duration,
    /// Producer pause in microseconds after each item
    #[arg(long, value_parser = parse_micros, default_value = "10")]
    pub produce_delay: Duration,
    /// Pin producer and consumers to distinct cores
    #[arg(long)]
    pub pin_cpus: bool,
    #[arg(long, short)]
    pub verbose: bool,
}

impl GlobalOpts {
    pub fn to_config(&self) -> PipelineConfig {
        PipelineConfig {
            waiter: self.waiter,
            poll_interval: self.poll_interval,
            produce_delay: self.produce_delay,
            pin_cpus: self.pin_cpus,
        }
    }
}

fn parse_micros(arg: &str) -> Result<Duration, ParseIntError> {
    let micros = arg.parse::<u64>()?;
    Ok(Duration::from_micros(micros))
}
