use std::path;
use std::process;

use env_logger;
use log;

use clap::ArgEnum;

use binsort::{ExternalSorter, ExternalSorterBuilder};

fn main() {
    let arg_parser = build_arg_parser();

    let log_level: LogLevel = arg_parser.value_of_t_or_exit("log_level");
    init_logger(log_level);

    let chunk_size: usize = arg_parser.value_of_t_or_exit("chunk_size");
    let fan_in: usize = arg_parser.value_of_t_or_exit("fan_in");
    let tmp_dir: Option<&str> = arg_parser.value_of("tmp_dir");

    let input = arg_parser.value_of("input").expect("value is required");
    let output = arg_parser.value_of("output").expect("value is required");

    let mut sorter_builder = ExternalSorterBuilder::new()
        .with_chunk_size(chunk_size)
        .with_fan_in(fan_in);

    if let Some(tmp_dir) = tmp_dir {
        sorter_builder = sorter_builder.with_tmp_dir(path::Path::new(tmp_dir));
    }

    let sorter: ExternalSorter = match sorter_builder.build() {
        Ok(sorter) => sorter,
        Err(err) => {
            log::error!("sorter initialization error: {}", err);
            process::exit(1);
        }
    };

    let summary = match sorter.sort(path::Path::new(input), path::Path::new(output)) {
        Ok(summary) => summary,
        Err(err) => {
            log::error!("data sorting error: {}", err);
            process::exit(1);
        }
    };

    log::info!(
        "sorted {} records into {} ({} runs, {} merge passes, {:.3} secs)",
        summary.records,
        output,
        summary.runs,
        summary.passes,
        summary.elapsed.as_secs_f64(),
    );
}

#[derive(Copy, Clone, clap::ArgEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn possible_values() -> impl Iterator<Item = clap::PossibleValue<'static>> {
        Self::value_variants().iter().filter_map(|v| v.to_possible_value())
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <LogLevel as clap::ArgEnum>::from_str(s, false)
    }
}

fn build_arg_parser() -> clap::ArgMatches {
    clap::App::new("binsort")
        .about("heap-based external sorter for binary integer files")
        .arg(
            clap::Arg::new("input")
                .short('i')
                .long("input")
                .help("binary integer file to be sorted")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("output")
                .short('o')
                .long("output")
                .help("result file")
                .required(true)
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("chunk_size")
                .short('c')
                .long("chunk-size")
                .help("number of records sorted in memory per run")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(size) if size >= 1 => Ok(()),
                    Ok(_) => Err("chunk size must be at least 1".to_string()),
                    Err(err) => Err(format!("chunk size format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("fan_in")
                .short('k')
                .long("fan-in")
                .help("number of runs merged together in one pass")
                .required(true)
                .takes_value(true)
                .validator(|v| match v.parse::<usize>() {
                    Ok(k) if k >= 2 => Ok(()),
                    Ok(_) => Err("fan-in must be at least 2".to_string()),
                    Err(err) => Err(format!("fan-in format incorrect: {}", err)),
                }),
        )
        .arg(
            clap::Arg::new("tmp_dir")
                .short('d')
                .long("tmp-dir")
                .help("directory to be used to store temporary data")
                .takes_value(true),
        )
        .arg(
            clap::Arg::new("log_level")
                .short('l')
                .long("loglevel")
                .help("logging level")
                .takes_value(true)
                .default_value("info")
                .possible_values(LogLevel::possible_values()),
        )
        .get_matches()
}

fn init_logger(log_level: LogLevel) {
    env_logger::Builder::new()
        .filter_level(match log_level {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        })
        .format_timestamp_millis()
        .init();
}
