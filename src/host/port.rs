use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info};

/// Programmer read timeout. The programmer can take a while to erase.
pub const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// How to reach the programmer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortConfig {
    /// Serial device opened at the given baud rate
    Serial { path: String, baud: u32 },
    /// Already-configured tty or bidirectional pipe
    Pipe(PathBuf),
}

impl PortConfig {
    /// Parse command-line arguments into PortConfig
    pub fn from_args(device: String, baud: u32, pipe: bool) -> Self {
        if pipe {
            PortConfig::Pipe(PathBuf::from(device))
        } else {
            PortConfig::Serial { path: device, baud }
        }
    }
}

pub trait Port: Read + Write {}

impl<T: Read + Write> Port for T {}

pub fn open_port(config: &PortConfig) -> Result<Box<dyn Port>, std::io::Error> {
    match config {
        PortConfig::Serial { path, baud } => {
            info!("Opening {path} at {baud} baud");
            let port = serialport::new(path, *baud).timeout(READ_TIMEOUT).open()?;
            Ok(Box::new(port))
        }
        PortConfig::Pipe(path) => {
            info!("Opening {:?} as read/write", path);
            let pipe = OpenOptions::new().read(true).write(true).open(path)?;
            debug!("Opened!");
            Ok(Box::new(pipe))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_args() {
        assert_eq!(
            PortConfig::from_args("/dev/ttyUSB0".to_owned(), 115200, false),
            PortConfig::Serial {
                path: "/dev/ttyUSB0".to_owned(),
                baud: 115200
            }
        );
        assert_eq!(
            PortConfig::from_args("/tmp/prom".to_owned(), 115200, true),
            PortConfig::Pipe(PathBuf::from("/tmp/prom"))
        );
    }

    #[test]
    fn test_open_pipe() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = PortConfig::Pipe(file.path().to_owned());
        let mut port = open_port(&config).unwrap();
        port.write_all(b"w0\r").unwrap();
        assert_eq!(std::fs::read(file.path()).unwrap(), b"w0\r");

        let missing = PortConfig::Pipe(PathBuf::from("/nonexistent/prom"));
        assert!(open_port(&missing).is_err());
    }
}
