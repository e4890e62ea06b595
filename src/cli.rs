use crate::config::StageConfig;
use crate::control::{ControlChannelReader, ControlSource};
use crate::core::StageError;
use crate::engine::{run_relay_stage, ChunkPolicy, StageEngine, TeeTarget};
use crate::kernels::Passthrough;
use crate::registry::{self, KernelParams};
use crate::sys::fd::{request_pipe_capacity, stdio_files, STARTUP_PIPE_CAPACITY};
use crate::sys::connect_input;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::os::fd::OwnedFd;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "sdrpipe")]
#[command(about = "Pipe-composable sample stream stages", version)]
pub struct Cli {
    /// Load stage configuration from a JSON file instead of the environment
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Read input from this TCP host instead of stdin
    #[arg(long, requires = "input_port")]
    pub input_host: Option<String>,

    #[arg(long, requires = "input_host")]
    pub input_port: Option<u16>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Announce a chunk size downstream, then copy input to output
    Setbuf {
        #[arg(allow_negative_numbers = true)]
        size: i64,
    },
    /// Copy input to output
    Clone,
    /// Copy input to output and report throughput
    Through,
    /// Elastic lossy relay with `slot_count` slots of `slot_size` bytes
    Fifo {
        #[arg(allow_negative_numbers = true)]
        slot_size: i64,
        #[arg(allow_negative_numbers = true)]
        slot_count: i64,
    },
    /// Copy input to output and duplicate it into `path` without blocking
    Tee {
        path: PathBuf,
        #[arg(allow_negative_numbers = true)]
        slots: Option<i64>,
    },
    /// List registered Kernel commands
    List {
        #[arg(long)]
        json: bool,
    },
    Version,
    #[command(external_subcommand)]
    Kernel(Vec<String>),
}

impl Command {
    pub fn name(&self) -> &str {
        match self {
            Command::Setbuf { .. } => "setbuf",
            Command::Clone => "clone",
            Command::Through => "through",
            Command::Fifo { .. } => "fifo",
            Command::Tee { .. } => "tee",
            Command::List { .. } => "list",
            Command::Version => "version",
            Command::Kernel(args) => args.first().map(String::as_str).unwrap_or("kernel"),
        }
    }
}

/// Options shared by every Kernel command; the first element is the
/// command name.
#[derive(Debug, Parser)]
pub struct KernelArgs {
    /// Control FIFO delivering live parameter lines
    #[arg(long, conflicts_with = "fd")]
    pub fifo: Option<PathBuf>,

    /// Inherited descriptor delivering live parameter lines
    #[arg(long)]
    pub fd: Option<i32>,

    /// Duplicate output into this path
    #[arg(long)]
    pub tee: Option<PathBuf>,

    #[arg(long, requires = "tee", allow_negative_numbers = true)]
    pub tee_slots: Option<i64>,

    /// Kernel parameters
    #[arg(allow_negative_numbers = true)]
    pub params: Vec<String>,
}

impl KernelArgs {
    pub fn control_source(&self) -> ControlSource {
        match (&self.fifo, self.fd) {
            (Some(path), _) => ControlSource::Fifo(path.clone()),
            (None, Some(fd)) => ControlSource::Fd(fd),
            (None, None) => ControlSource::Absent,
        }
    }
}

/// Process exit code for a failed run
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<StageError>()
        .map(StageError::exit_code)
        .unwrap_or(-1)
}

pub fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => StageConfig::from_json_file(path)?,
        None => StageConfig::from_env(),
    };
    debug!(?config, "stage configuration");

    match &cli.command {
        Command::List { json } => return list(*json),
        Command::Version => {
            println!("sdrpipe {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        _ => {}
    }

    let (stdin, stdout) = stdio_files();
    let input = match (&cli.input_host, cli.input_port) {
        (Some(host), Some(port)) => {
            let stream = connect_input(host, port)
                .with_context(|| format!("Failed to connect input to {}:{}", host, port))?;
            File::from(OwnedFd::from(stream))
        }
        _ => stdin,
    };
    let output = stdout;
    let (input_fd, output_fd) = (Some(input.as_raw_fd()), Some(output.as_raw_fd()));
    request_pipe_capacity(&[input.as_raw_fd(), output.as_raw_fd()], STARTUP_PIPE_CAPACITY);

    match cli.command {
        Command::Setbuf { size } => {
            if size <= 0 {
                return Err(StageError::InvalidBufferSize(size).into());
            }
            StageEngine::new(&config, Box::new(Passthrough::new("setbuf")))
                .with_chunk_policy(ChunkPolicy::Fixed(size))
                .with_descriptors(input_fd, output_fd)
                .run(input, output)?;
        }
        Command::Clone => {
            StageEngine::new(&config, Box::new(Passthrough::new("clone")))
                .with_descriptors(input_fd, output_fd)
                .run(input, output)?;
        }
        Command::Through => {
            StageEngine::new(&config, Box::new(Passthrough::new("through")))
                .with_descriptors(input_fd, output_fd)
                .with_throughput_reports(true)
                .run(input, output)?;
        }
        Command::Fifo { slot_size, slot_count } => {
            if slot_size <= 0 || slot_count <= 1 {
                return Err(StageError::InvalidParameter(format!(
                    "fifo needs slot_size > 0 and slot_count > 1, got {} {}",
                    slot_size, slot_count
                ))
                .into());
            }
            run_relay_stage(&config, input, output, slot_size as usize, slot_count as usize)?;
        }
        Command::Tee { path, slots } => {
            let target = tee_target(&config, path, slots)?;
            StageEngine::new(&config, Box::new(Passthrough::new("tee")))
                .with_descriptors(input_fd, output_fd)
                .with_tee(Some(target))
                .run(input, output)?;
        }
        Command::Kernel(args) => {
            let name = args.first().cloned().unwrap_or_default();
            let descriptor = registry::lookup(&name)
                .ok_or_else(|| StageError::Usage(format!("no such command: {}", name)))?;
            let kernel_args =
                KernelArgs::try_parse_from(&args).map_err(|e| StageError::Usage(e.to_string()))?;

            let source = kernel_args.control_source();
            if source != ControlSource::Absent && !descriptor.accepts_control() {
                return Err(StageError::Usage(format!("{} takes no control channel", name)).into());
            }

            let kernel = descriptor.create(&KernelParams::new(descriptor.name, &kernel_args.params))?;
            let control = ControlChannelReader::open(&source)
                .with_context(|| format!("Failed to open control channel {:?}", source))?;
            let tee = match kernel_args.tee {
                Some(path) => Some(tee_target(&config, path, kernel_args.tee_slots)?),
                None => None,
            };

            StageEngine::new(&config, kernel)
                .with_control(control)
                .with_tee(tee)
                .with_descriptors(input_fd, output_fd)
                .run(input, output)?;
        }
        Command::List { .. } | Command::Version => {}
    }
    Ok(())
}

fn tee_target(config: &StageConfig, path: PathBuf, slots: Option<i64>) -> Result<TeeTarget, StageError> {
    let slots = slots.unwrap_or(config.tee_slots as i64);
    if slots <= 0 {
        return Err(StageError::InvalidParameter("num_buffers should be > 0".into()));
    }
    Ok(TeeTarget {
        path,
        slots: slots as usize,
    })
}

fn list(json: bool) -> Result<()> {
    let descriptors = registry::all();
    if json {
        println!("{}", serde_json::to_string_pretty(&descriptors)?);
        return Ok(());
    }

    for usage in [
        "setbuf <size>",
        "clone",
        "through",
        "fifo <slot_size> <slot_count>",
        "tee <path> [slots]",
    ] {
        println!("    {}", usage);
    }
    for descriptor in &descriptors {
        let control = if descriptor.accepts_control() {
            " [--fifo <path> | --fd <n>]"
        } else {
            ""
        };
        println!("    {}{}", descriptor.usage, control);
    }
    Ok(())
}
