//! `simtemp`: drive a simulated temperature sensor from the command line.
//!
//! Every invocation creates an in-process sensor, applies the global
//! `--sampling-ms`, `--threshold-mc` and `--mode` options through the
//! attribute transport, then runs one command:
//!
//! ```text
//! simtemp sampling get | set MS
//! simtemp threshold get | set MC
//! simtemp mode get | set normal|noisy|ramp
//! simtemp stats
//! simtemp dev [--count N]
//! ```

mod exit_codes;

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use chrono::DateTime;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror_no_std::Error;

use simtemp_core::constants::POLL_TIMEOUT_MS;
use simtemp_core::{
    Attribute, AttributeError, AttributeStore, ReadError, ReadMode, Readiness, Sample, Sensor,
    SensorError, SAMPLE_RECORD_SIZE,
};

use exit_codes::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "simtemp", version, about = "Simulated temperature sensor")]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct GlobalOpts {
    /// Sampling period in ms, applied before the command runs
    #[arg(long, global = true, env = "SIMTEMP_SAMPLING_MS")]
    sampling_ms: Option<String>,

    /// Alert threshold in milli-degrees Celsius
    #[arg(long, global = true, env = "SIMTEMP_THRESHOLD_MC", allow_hyphen_values = true)]
    threshold_mc: Option<String>,

    /// Generator mode: normal, noisy or ramp
    #[arg(long, global = true, env = "SIMTEMP_MODE")]
    mode: Option<String>,

    /// Seed the generator for reproducible readings
    #[arg(long, global = true, env = "SIMTEMP_SEED")]
    seed: Option<u64>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sampling period in milliseconds
    Sampling {
        #[command(subcommand)]
        access: Access,
    },
    /// Alert threshold in milli-degrees Celsius
    Threshold {
        #[command(subcommand)]
        access: Access,
    },
    /// Generator mode
    Mode {
        #[command(subcommand)]
        access: Access,
    },
    /// Print sample and alert counters
    Stats,
    /// Stream samples as they are produced
    Dev {
        /// Stop after this many samples
        #[arg(long, short = 'n')]
        count: Option<u64>,
    },
}

#[derive(Subcommand, Debug)]
enum Access {
    /// Print the current value
    Get,
    /// Store a new value
    Set {
        #[arg(allow_hyphen_values = true)]
        value: String,
    },
}

#[derive(Error, Debug)]
enum CliError {
    #[error("{0}")]
    Attribute(#[from] AttributeError),

    #[error("{0}")]
    Sensor(#[from] SensorError),

    #[error("read failed: {0}")]
    Read(#[from] ReadError),

    #[error("output failed: {0}")]
    Io(#[from] io::Error),

    #[error("json encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl CliError {
    fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Attribute(_) | CliError::Sensor(SensorError::Config(_)) => {
                ExitCode::InvalidInput
            }
            CliError::Sensor(_) | CliError::Read(_) | CliError::Io(_) | CliError::Json(_) => {
                ExitCode::RuntimeError
            }
        }
    }
}

#[derive(Serialize)]
struct AttributeLine<'a> {
    attribute: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
struct SampleLine {
    timestamp_ns: u64,
    temp_c: f64,
    alert: bool,
}

impl From<&Sample> for SampleLine {
    fn from(sample: &Sample) -> Self {
        Self {
            timestamp_ns: sample.timestamp_ns,
            temp_c: sample.celsius(),
            alert: sample.flags.is_crossed(),
        }
    }
}

fn main() -> process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    match run(&cli) {
        Ok(()) => ExitCode::Success.into(),
        Err(err) => {
            eprintln!("simtemp: {}", err);
            err.exit_code().into()
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_millis()
        .init();
}

fn run(cli: &Cli) -> Result<(), CliError> {
    let mut builder = Sensor::builder().start_paused();
    if let Some(seed) = cli.global.seed {
        builder = builder.seed(seed);
    }
    let sensor = builder.build()?;
    let attrs = sensor.attributes();
    apply_global_options(&attrs, &cli.global)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let json = cli.global.json;

    match &cli.command {
        Command::Sampling { access } => {
            attribute(&attrs, Attribute::SamplingMs, access, json, &mut out)
        }
        Command::Threshold { access } => {
            attribute(&attrs, Attribute::ThresholdMc, access, json, &mut out)
        }
        Command::Mode { access } => attribute(&attrs, Attribute::Mode, access, json, &mut out),
        Command::Stats => {
            if json {
                serde_json::to_writer(&mut out, &sensor.stats())?;
                writeln!(out)?;
            } else {
                write!(out, "{}", attrs.show(Attribute::Stats))?;
            }
            Ok(())
        }
        Command::Dev { count } => {
            sensor.start()?;
            stream(&sensor, *count, json, &mut out)
        }
    }
}

fn apply_global_options(attrs: &AttributeStore<'_>, global: &GlobalOpts) -> Result<(), CliError> {
    let options = [
        (Attribute::SamplingMs, &global.sampling_ms),
        (Attribute::ThresholdMc, &global.threshold_mc),
        (Attribute::Mode, &global.mode),
    ];
    for (attr, value) in options {
        if let Some(value) = value {
            attrs.store(attr, value)?;
            log::debug!("applied {} = {}", attr, value.trim());
        }
    }
    Ok(())
}

fn attribute(
    attrs: &AttributeStore<'_>,
    attr: Attribute,
    access: &Access,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    if let Access::Set { value } = access {
        attrs.store(attr, value)?;
    }

    let shown = attrs.show(attr);
    if json {
        let line = AttributeLine {
            attribute: attr.name(),
            value: shown.trim_end(),
        };
        serde_json::to_writer(&mut *out, &line)?;
        writeln!(out)?;
    } else {
        write!(out, "{}", shown)?;
    }
    Ok(())
}

/// Print samples until `count` is reached or the sensor closes. Waits for
/// readiness in `POLL_TIMEOUT_MS` slices so a quiet sensor stays visible in
/// the debug log.
fn stream(
    sensor: &Sensor,
    count: Option<u64>,
    json: bool,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let reader = sensor.open(ReadMode::NonBlocking);
    let timeout = Duration::from_millis(POLL_TIMEOUT_MS);
    let mut record = [0u8; SAMPLE_RECORD_SIZE];
    let mut printed = 0u64;

    while count.map_or(true, |limit| printed < limit) {
        match reader.poll(Some(timeout)) {
            Readiness::Readable => {}
            Readiness::TimedOut => {
                log::debug!("no sample within {} ms", POLL_TIMEOUT_MS);
                continue;
            }
            Readiness::Closed => break,
        }

        match reader.read_into(&mut record) {
            Ok(_) => {}
            Err(ReadError::WouldBlock) => continue,
            Err(ReadError::Closed) => break,
            Err(err) => return Err(err.into()),
        }
        let Some(sample) = Sample::from_bytes(&record) else {
            continue;
        };

        if json {
            serde_json::to_writer(&mut *out, &SampleLine::from(&sample))?;
            writeln!(out)?;
        } else {
            writeln!(
                out,
                "{}  temp = {:.2} C  alert = {}",
                format_timestamp(sample.timestamp_ns),
                sample.celsius(),
                u8::from(sample.flags.is_crossed())
            )?;
        }
        out.flush()?;
        printed += 1;
    }
    Ok(())
}

/// UTC wall-clock rendering of a sample timestamp, millisecond precision.
/// Falls back to raw nanoseconds when the value is out of range.
fn format_timestamp(timestamp_ns: u64) -> String {
    let secs = (timestamp_ns / 1_000_000_000) as i64;
    let nanos = (timestamp_ns % 1_000_000_000) as u32;
    match DateTime::from_timestamp(secs, nanos) {
        Some(at) => at.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
        None => format!("{} ns", timestamp_ns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use simtemp_core::time::ManualClock;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn parses_attribute_commands() {
        let cli = parse(&["simtemp", "threshold", "set", "-5000"]);
        match cli.command {
            Command::Threshold {
                access: Access::Set { value },
            } => assert_eq!(value, "-5000"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn global_options_after_subcommand() {
        let cli = parse(&["simtemp", "dev", "-n", "3", "--mode", "ramp", "--json", "-vv"]);
        assert_eq!(cli.global.mode.as_deref(), Some("ramp"));
        assert!(cli.global.json);
        assert_eq!(cli.global.verbose, 2);
        assert!(matches!(cli.command, Command::Dev { count: Some(3) }));
    }

    #[test]
    fn global_options_go_through_attributes() {
        let sensor = Sensor::builder().start_paused().build().unwrap();
        let global = GlobalOpts {
            sampling_ms: Some("250".into()),
            threshold_mc: Some("30000".into()),
            mode: Some("noisy\n".into()),
            seed: None,
            json: false,
            verbose: 0,
        };
        apply_global_options(&sensor.attributes(), &global).unwrap();
        assert_eq!(sensor.sampling_ms(), 250);
        assert_eq!(sensor.threshold_mc(), 30_000);
        assert_eq!(sensor.mode(), simtemp_core::Mode::Noisy);
    }

    #[test]
    fn invalid_input_maps_to_exit_code_one() {
        let sensor = Sensor::builder().start_paused().build().unwrap();
        let attrs = sensor.attributes();
        let err = attribute(
            &attrs,
            Attribute::SamplingMs,
            &Access::Set { value: "5".into() },
            false,
            &mut Vec::<u8>::new(),
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), ExitCode::InvalidInput);
    }

    #[test]
    fn get_prints_value_with_newline() {
        let sensor = Sensor::builder().start_paused().build().unwrap();
        let mut out = Vec::<u8>::new();
        attribute(&sensor.attributes(), Attribute::Mode, &Access::Get, false, &mut out).unwrap();
        assert_eq!(out, b"normal\n");

        let mut out = Vec::<u8>::new();
        attribute(&sensor.attributes(), Attribute::ThresholdMc, &Access::Get, true, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "{\"attribute\":\"threshold_mC\",\"value\":\"45000\"}\n"
        );
    }

    #[test]
    fn dev_prints_requested_number_of_samples() {
        // 2023-11-14 22:13:20 UTC
        let clock = Arc::new(ManualClock::new(1_700_000_000_000_000_000));
        let sensor = Sensor::builder()
            .start_paused()
            .clock(Arc::clone(&clock))
            .mode(simtemp_core::Mode::Ramp)
            .threshold_mc(28_000)
            .build()
            .unwrap();
        sensor.tick();
        clock.advance(250_000_000);
        sensor.tick();

        let mut out = Vec::<u8>::new();
        stream(&sensor, Some(2), false, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "2023-11-14 22:13:20.000  temp = 27.50 C  alert = 0\n\
             2023-11-14 22:13:20.250  temp = 28.00 C  alert = 1\n"
        );
    }

    #[test]
    fn timestamps_render_as_utc() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00.000");
        assert_eq!(format_timestamp(1_500_000_000), "1970-01-01 00:00:01.500");
    }
}
