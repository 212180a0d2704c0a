use clap::{Arg, Command};
use line_emulator::{RefurbishmentArgs, SerializationArgs};
use tracing::info;

fn validate_bool_flag(value: &str) -> Result<bool, String> {
    match value {
        "0" => Ok(false),
        "1" => Ok(true),
        _ => Err("Expected 0 or 1".to_owned()),
    }
}

fn validate_aggregation_count(value: &str) -> Result<u8, String> {
    let n: u8 = value.parse().map_err(|_| "Invalid aggregation count".to_owned())?;
    if n > 9 {
        return Err("Aggregation count must be in [0,9]".to_owned());
    }
    Ok(n)
}

fn validate_error_percent(value: &str) -> Result<u8, String> {
    let n: u8 = value.parse().map_err(|_| "Invalid error percent".to_owned())?;
    if !(1..=99).contains(&n) {
        return Err("Error percent must be in [1,99]".to_owned());
    }
    Ok(n)
}

fn validate_drop_percent(value: &str) -> Result<u8, String> {
    let n: u8 = value.parse().map_err(|_| "Invalid drop percent".to_owned())?;
    if n > 5 {
        return Err("Drop percent must be in [0,5]".to_owned());
    }
    Ok(n)
}

fn validate_read_interval(value: &str) -> Result<f64, String> {
    let seconds: f64 = value.parse().map_err(|_| "Invalid read interval".to_owned())?;
    if seconds <= 0.0 {
        return Err("Read interval must be positive".to_owned());
    }
    Ok(seconds)
}

fn validate_bad_quality_percent(value: &str) -> Result<f64, String> {
    let percent: f64 = value.parse().map_err(|_| "Invalid bad code quality percent".to_owned())?;
    if !(0.0..=100.0).contains(&percent) {
        return Err("Bad code quality percent must be in [0,100]".to_owned());
    }
    Ok(percent)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = env!("CARGO_PKG_VERSION"), "line emulator starting");

    let matches = Command::new("Production Line Emulator")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Isaac Wismer")
        .about("A DM printer/camera/aggregation line emulator")
        .subcommand_required(true)
        .subcommand(
            Command::new("s")
                .about("Run the serialization topology")
                .arg(
                    Arg::new("dm_file_source")
                        .help("Replay DM codes from dm.csv instead of running a printer listener")
                        .short('f')
                        .long("file-source")
                        .value_parser(validate_bool_flag)
                        .default_value("0"),
                )
                .arg(
                    Arg::new("agr_count")
                        .help("Number of aggregation streams (0-9)")
                        .short('a')
                        .long("aggregations")
                        .value_parser(validate_aggregation_count)
                        .default_value("3"),
                )
                .arg(
                    Arg::new("gen_err")
                        .help("Enable error injection on the DM camera")
                        .short('g')
                        .long("gen-errors")
                        .value_parser(validate_bool_flag)
                        .default_value("0"),
                )
                .arg(
                    Arg::new("perc_err")
                        .help("Error injection percent (1-99)")
                        .short('e')
                        .long("error-percent")
                        .value_parser(validate_error_percent)
                        .default_value("2"),
                )
                .arg(
                    Arg::new("drop_dm")
                        .help("Drop percent per transmitted frame (0-5)")
                        .short('d')
                        .long("drop-percent")
                        .value_parser(validate_drop_percent)
                        .default_value("0"),
                )
                .arg(
                    Arg::new("read_interval")
                        .help("Emitter cadence in seconds")
                        .short('r')
                        .long("read-interval")
                        .value_parser(validate_read_interval)
                        .default_value("0.15"),
                )
                .arg(
                    Arg::new("add_code_quality")
                        .help("Enable quality tagging on emitted codes")
                        .short('q')
                        .long("add-quality")
                        .value_parser(validate_bool_flag)
                        .default_value("0"),
                )
                .arg(
                    Arg::new("bad_code_quality_percent")
                        .help("Percent of tagged codes graded bad")
                        .long("bad-quality-percent")
                        .visible_alias("qe")
                        .value_parser(validate_bad_quality_percent)
                        .default_value("0.15"),
                ),
        )
        .subcommand(
            Command::new("r")
                .about("Run the refurbishment topology, replaying dm.csv next to the executable"),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("s", sub)) => {
            let args = SerializationArgs {
                dm_file_source: *sub.get_one::<bool>("dm_file_source").expect("has default"),
                aggregation_count: *sub.get_one::<u8>("agr_count").expect("has default"),
                gen_errors: *sub.get_one::<bool>("gen_err").expect("has default"),
                error_percent: *sub.get_one::<u8>("perc_err").expect("has default"),
                drop_dm_percent: *sub.get_one::<u8>("drop_dm").expect("has default"),
                read_interval_secs: *sub.get_one::<f64>("read_interval").expect("has default"),
                add_code_quality: *sub.get_one::<bool>("add_code_quality").expect("has default"),
                bad_code_quality_percent: *sub
                    .get_one::<f64>("bad_code_quality_percent")
                    .expect("has default"),
            };
            line_emulator::run_serialization(args).await;
        }
        Some(("r", _)) => {
            line_emulator::run_refurbishment(RefurbishmentArgs).await;
        }
        _ => unreachable!("subcommand_required(true) guarantees one of the above"),
    }
}
