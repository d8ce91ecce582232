use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use devkit::{
    print_ports, AcquisitionConfig, AcquisitionLoop, AcquisitionStats, ConsoleSink, CsvSink,
    FrameDecoder, ImuError, LogSink, Sensor, SerialSource, StopListener, StopSignal,
    DEFAULT_MAX_FRAME_LEN,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

//* run by `cargo run --bin read_devkit -- data-collection -s /dev/ttyACM0 -b 115200` */

#[derive(Parser, Debug)]
#[command(name = "read_devkit", version)]
#[command(about = "Collect accelerometer and gyroscope samples from a dev kit over a serial port")]
struct Cli {
    /// Print all available serial ports and exit
    #[arg(long)]
    list_ports: bool,

    #[arg(long, value_enum, default_value_t = LogLevel::Warning, global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start sensor data collection
    DataCollection(CollectionArgs),
}

#[derive(Args, Debug)]
struct CollectionArgs {
    /// Serial port to connect to: /dev/ttyACMn on Linux, COMn on Windows
    #[arg(short, long, value_name = "SERIAL_PORT")]
    serial: String,

    /// Serial communication baud rate
    #[arg(short, long)]
    baudrate: u32,

    /// Sensor readings to output
    #[arg(short = 'f', long, value_enum, default_value_t = Sensor::All)]
    sensor: Sensor,

    /// CSV file to append samples to; created if it does not exist
    #[arg(short, long, value_name = "PATH")]
    output_file: Option<PathBuf>,

    /// Trace every decoded frame at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Also emit every sample as a log event
    #[arg(long)]
    log_samples: bool,

    /// Do not echo samples to the console
    #[arg(short, long)]
    quiet: bool,

    /// Reject fractional parts of 10^6 or more instead of adding them as-is
    #[arg(long)]
    strict: bool,

    /// Serial read timeout in milliseconds
    #[arg(long, default_value_t = 1000)]
    timeout_ms: u64,

    /// Longest frame read before giving up on finding the line end
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_LEN)]
    max_frame_len: usize,
}

impl CollectionArgs {
    fn acquisition_config(&self) -> AcquisitionConfig {
        let decoder = FrameDecoder::new()
            .with_strict_fraction(self.strict)
            .with_trace(self.verbose);
        AcquisitionConfig::default()
            .with_max_frame_len(self.max_frame_len)
            .with_decoder(decoder)
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }
}

fn init_tracing(level: LogLevel) {
    // RUST_LOG wins over --log-level when set.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn collect_data(args: &CollectionArgs) -> Result<AcquisitionStats, ImuError> {
    let config = args.acquisition_config();
    let source = SerialSource::open(
        &args.serial,
        args.baudrate,
        Duration::from_millis(args.timeout_ms),
    )?;

    let csv = args
        .output_file
        .as_ref()
        .map(|path| CsvSink::append(path, args.sensor))
        .transpose()?;
    let console = (!args.quiet).then(|| ConsoleSink::stdout(args.sensor));
    let log = args.log_samples.then(|| LogSink::new(args.sensor));

    let stop = StopSignal::new();
    let listener = StopListener::spawn_stdin(stop.clone())?;

    info!("Starting data collection from: {:?}", args);
    println!(
        "Data acquisition for sensor {} started over serial port: {} [{} BAUD]",
        args.sensor, args.serial, args.baudrate
    );
    println!("Type q and press Enter to stop");

    AcquisitionLoop::new(source, (console, (csv, log)), config)
        .with_listener(listener)
        .run_until(&stop)
        .into_result()
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    if cli.list_ports {
        return match print_ports() {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Failed to list serial ports: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    let Some(Command::DataCollection(args)) = cli.command else {
        let _ = Cli::command().print_help();
        return ExitCode::from(2);
    };

    match collect_data(&args) {
        Ok(stats) => {
            println!(
                "End of data acquisition: {} samples from {} frames",
                stats.samples, stats.frames
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Data acquisition failed: {}", e);
            eprintln!("Data acquisition failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
