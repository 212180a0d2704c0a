use std::time::Duration;

use line_core::pipeline::{spawn_refurbishment, spawn_serialization, SerializationConfig};
use tokio::signal;
use tracing::error;

/// Parsed `s` (serialization) subcommand arguments: `-f`, `-a`, `-g`,
/// `-e`, `-d`, `-r`, `-q`, `-qe`.
pub struct SerializationArgs {
    pub dm_file_source: bool,
    pub aggregation_count: u8,
    pub gen_errors: bool,
    pub error_percent: u8,
    pub drop_dm_percent: u8,
    pub read_interval_secs: f64,
    pub add_code_quality: bool,
    pub bad_code_quality_percent: f64,
}

/// The `r` (refurbishment) subcommand takes no options.
pub struct RefurbishmentArgs;

async fn signal_handler() {
    signal::ctrl_c().await.unwrap();
}

pub async fn run_serialization(args: SerializationArgs) {
    let config = SerializationConfig {
        printer_port: 9101,
        dm_file_source: args.dm_file_source,
        aggregation_count: args.aggregation_count,
        gen_errors: args.gen_errors,
        error_percent: args.error_percent,
        drop_dm_percent: args.drop_dm_percent,
        read_interval: Duration::from_secs_f64(args.read_interval_secs),
        add_code_quality: args.add_code_quality,
        bad_codes_percent: percent_to_u8(args.bad_code_quality_percent),
    };

    if let Err(e) = spawn_serialization(config).await {
        error!(error = %e, "failed to start serialization topology");
        return;
    }

    signal_handler().await;
}

pub async fn run_refurbishment(_args: RefurbishmentArgs) {
    if let Err(e) = spawn_refurbishment().await {
        error!(error = %e, "failed to start refurbishment topology");
        return;
    }

    signal_handler().await;
}

fn percent_to_u8(percent: f64) -> u8 {
    percent.round().clamp(0.0, 100.0) as u8
}
