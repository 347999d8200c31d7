use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{Level, info, warn};

mod error;
mod host;
mod picture;
mod programmer;
mod prom;

use crate::host::logging::setup_logging_stdio;
use crate::host::port::{PortConfig, open_port};
use crate::picture::PictureLayout;
use crate::programmer::tommyprom::{BAUD_RATE, Programmer, UploadPlan, rom_size_bytes};
use crate::prom::counter::{self, DEFAULT_LINE_LIMIT};
use crate::prom::inspect;
use crate::prom::revision::Revision;
use crate::prom::signals::Signal;

/// Sync PROM compiler and ROM tools for a table-driven VGA card
#[derive(Parser)]
#[command(name = "vga-prom")]
#[command(about = "Builds the sync PROM and pixel ROM images for a table-driven VGA card")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Args)]
struct RevisionArgs {
    /// Built-in hardware revision
    #[arg(long, default_value = "sync-prom")]
    revision: String,

    /// Revision description in TOML, overrides --revision
    #[arg(long, value_name = "TOML")]
    revision_file: Option<PathBuf>,
}

impl RevisionArgs {
    fn load(&self) -> Result<Revision, error::ConfigError> {
        match &self.revision_file {
            Some(path) => Revision::load(path),
            None => Revision::builtin(&self.revision),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Compile the sync PROM table
    Sync {
        /// Output path
        #[arg(short, long, default_value = "sync-prom.bin")]
        output: PathBuf,

        #[command(flatten)]
        revision: RevisionArgs,
    },

    /// List the built-in hardware revisions and their bit layouts
    Revisions,

    /// List the addresses of a table at which a signal is active
    Inspect {
        /// Path to the table
        table: PathBuf,

        /// Signal to look for
        #[arg(long, value_enum, default_value = "vreset")]
        signal: Signal,

        #[command(flatten)]
        revision: RevisionArgs,
    },

    /// List the raw pixel and line counts that reach each timing boundary
    Counters {
        /// Highest raw line count to consider
        #[arg(long, value_parser = parse_int, default_value_t = DEFAULT_LINE_LIMIT as usize)]
        lines: usize,

        #[command(flatten)]
        revision: RevisionArgs,
    },

    /// Convert a picture to the 64-colour pixel ROM format
    Image {
        /// Picture to convert
        imagefile: PathBuf,

        /// Output path
        outfile: PathBuf,

        /// Height of the final image
        #[arg(short = 'g', long, default_value_t = 75)]
        height: u32,

        /// Width of the final image
        #[arg(short, long, default_value_t = 100)]
        width: u32,

        /// Size of the binary to create, in KiB
        #[arg(short, long, default_value_t = 32)]
        size: u32,

        /// Save the dithered picture here
        #[arg(long)]
        preview: Option<PathBuf>,

        /// Save the palette strip here
        #[arg(long)]
        palette: Option<PathBuf>,

        #[command(flatten)]
        revision: RevisionArgs,
    },

    /// Write a binary to the EEPROM programmer
    Write {
        /// Path to the binary file
        filename: PathBuf,

        /// Number of bytes to write
        #[arg(short, long, value_parser = parse_int)]
        bytes: Option<usize>,

        /// Path to the serial device
        #[arg(short, long, default_value = "/dev/ttyUSB0")]
        device: String,

        /// Treat the device as an already-configured tty or pipe
        #[arg(long)]
        pipe: bool,

        /// Offset from the start of the file
        #[arg(short, long, value_parser = parse_int, default_value = "0")]
        offset: usize,

        /// Starting address on the EEPROM
        #[arg(short, long, value_parser = parse_int, default_value = "0")]
        start: usize,

        /// ROM size in KiB
        #[arg(short, long, value_parser = parse_int, default_value = "32")]
        rom_size: usize,
    },
}

/// Decimal, or hex with a `0x` prefix.
fn parse_int(s: &str) -> Result<usize, Box<dyn std::error::Error + Send + Sync>> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => Ok(usize::from_str_radix(hex, 16)?),
        None => Ok(s.parse()?),
    }
}

fn write_rom(
    filename: &Path,
    config: &PortConfig,
    plan: &UploadPlan,
) -> Result<(), Box<dyn std::error::Error>> {
    let file = fs::read(filename)?;
    let image = plan.select(&file)?;
    info!(
        "Writing {} bytes from {:?} to {:#06x}",
        image.len(),
        filename,
        plan.start
    );
    if let PortConfig::Serial { baud, .. } = config {
        info!("Sending at {baud} BAUD");
    }

    let port = open_port(config)?;
    let mut programmer = Programmer::new(port);
    match programmer.upload(image, plan.start) {
        Ok(session) => {
            info!("Result of Transmission: OK ({:?})", session.elapsed());
            Ok(())
        }
        Err(e) => {
            warn!("Result of Transmission: ERROR");
            Err(e.into())
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::TRACE
    } else {
        Level::INFO
    };
    setup_logging_stdio(level);

    match args.command {
        Command::Sync { output, revision } => {
            let revision = revision.load()?;
            let table = prom::compile(&revision)?;
            table.save(&output)?;
        }
        Command::Revisions => {
            for revision in Revision::builtins() {
                println!("{}: {}", revision.name, revision.description);
                for line in revision.describe_layout() {
                    println!("{line}");
                }
            }
        }
        Command::Inspect {
            table,
            signal,
            revision,
        } => {
            let revision = revision.load()?;
            let loaded = inspect::load_table(&table)?;
            let found = inspect::find_signal(&loaded, &revision.layout, signal);
            for line in &found {
                println!("{line}");
            }
            info!("{signal} active at {} addresses", found.len());
        }
        Command::Counters { lines, revision } => {
            let revision = revision.load()?;
            let limit = lines.min(counter::LINE_COUNTER_RANGE as usize) as u16;
            for line in counter::describe_boundaries(&revision.timing, limit) {
                println!("{line}");
            }
        }
        Command::Image {
            imagefile,
            outfile,
            height,
            width,
            size,
            preview,
            palette,
            revision,
        } => {
            let revision = revision.load()?;
            let layout = PictureLayout {
                width,
                height,
                size_kib: size,
            };
            layout.validate(&revision.timing)?;
            picture::convert_file(
                &imagefile,
                &outfile,
                &layout,
                preview.as_deref(),
                palette.as_deref(),
            )?;
        }
        Command::Write {
            filename,
            bytes,
            device,
            pipe,
            offset,
            start,
            rom_size,
        } => {
            let plan = UploadPlan::new(offset, start, bytes, rom_size_bytes(rom_size)?)?;
            let config = PortConfig::from_args(device, BAUD_RATE, pipe);
            write_rom(&filename, &config, &plan)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_int() {
        assert_eq!(parse_int("0").unwrap(), 0);
        assert_eq!(parse_int("32").unwrap(), 32);
        assert_eq!(parse_int("0x7f00").unwrap(), 0x7f00);
        assert!(parse_int("0xzz").is_err());
        assert!(parse_int("").is_err());
    }

    #[test]
    fn test_args() {
        use clap::CommandFactory;
        Args::command().debug_assert();

        let args = Args::parse_from(["vga-prom", "write", "rom.bin", "-s", "0x1000", "-b", "512"]);
        let Command::Write {
            start, bytes, rom_size, ..
        } = args.command
        else {
            panic!("expected write");
        };
        assert_eq!(start, 0x1000);
        assert_eq!(bytes, Some(512));
        assert_eq!(rom_size, 32);

        let args = Args::parse_from(["vga-prom", "counters", "--lines", "0x400"]);
        let Command::Counters { lines, revision } = args.command else {
            panic!("expected counters");
        };
        assert_eq!(lines, 1024);
        assert_eq!(revision.revision, "sync-prom");
    }
}
