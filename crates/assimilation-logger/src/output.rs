// SPDX-License-Identifier: GPL-3.0-or-later

//! Log output destinations: file (with rotation), stdout, syslog.

use crate::SyslogFacility;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Output configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum OutputConfig {
    /// Write to stdout.
    #[default]
    Stdout,
    /// Write to stderr.
    Stderr,
    /// Write to file with optional rotation.
    File {
        path: PathBuf,
        rotation: Option<FileRotation>,
    },
    /// Write to syslog daemon.
    Syslog { facility: SyslogFacility },
}

/// File rotation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRotation {
    /// Maximum file size in bytes before rotation.
    pub max_size: u64,
    /// Maximum number of rotated files to keep.
    pub max_files: u32,
    /// Compress rotated files (gzip).
    pub compress: bool,
}

impl Default for FileRotation {
    fn default() -> Self {
        Self {
            max_size: 10 * 1024 * 1024,
            max_files: 5,
            compress: false,
        }
    }
}

impl FileRotation {
    /// Create rotation config with size in megabytes.
    pub fn with_max_size_mb(mb: u64) -> Self {
        Self {
            max_size: mb * 1024 * 1024,
            ..Default::default()
        }
    }

    /// Set maximum number of backup files.
    pub fn max_files(mut self, count: u32) -> Self {
        self.max_files = count;
        self
    }

    /// Enable compression of rotated files.
    pub fn compressed(mut self) -> Self {
        self.compress = true;
        self
    }
}

/// Log output trait.
pub trait LogOutput: Send {
    /// Write a formatted log line.
    fn write(&mut self, line: &str) -> io::Result<()>;

    /// Flush output.
    fn flush(&mut self) -> io::Result<()>;
}

/// Stdout output.
pub struct StdoutOutput {
    handle: io::Stdout,
}

impl StdoutOutput {
    pub fn new() -> Self {
        Self { handle: io::stdout() }
    }
}

impl Default for StdoutOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl LogOutput for StdoutOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.handle, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

/// Stderr output.
pub struct StderrOutput {
    handle: io::Stderr,
}

impl StderrOutput {
    pub fn new() -> Self {
        Self { handle: io::stderr() }
    }
}

impl Default for StderrOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl LogOutput for StderrOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.handle, "{}", line)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.handle.flush()
    }
}

/// File output with optional rotation.
pub struct FileOutput {
    path: PathBuf,
    writer: BufWriter<File>,
    rotation: Option<FileRotation>,
    current_size: u64,
}

impl FileOutput {
    /// Open file for logging.
    pub fn open(path: impl AsRef<Path>, rotation: Option<FileRotation>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let current_size = file.metadata()?.len();
        let writer = BufWriter::new(file);

        Ok(Self {
            path,
            writer,
            rotation,
            current_size,
        })
    }

    fn maybe_rotate(&mut self) -> io::Result<()> {
        let rotation = match &self.rotation {
            Some(r) if self.current_size >= r.max_size => r.clone(),
            _ => return Ok(()),
        };

        self.writer.flush()?;

        for i in (1..rotation.max_files).rev() {
            let old_path = rotated_path(&self.path, i, rotation.compress);
            let new_path = rotated_path(&self.path, i + 1, rotation.compress);
            if old_path.exists() {
                if i + 1 >= rotation.max_files {
                    std::fs::remove_file(&old_path)?;
                } else {
                    std::fs::rename(&old_path, &new_path)?;
                }
            }
        }

        let rotated = rotated_path(&self.path, 1, false);
        std::fs::rename(&self.path, &rotated)?;
        if rotation.compress {
            gzip_in_place(&rotated)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        self.writer = BufWriter::new(file);
        self.current_size = 0;

        Ok(())
    }
}

/// Gzip `path` in place, leaving `path.gz` and removing the plain file.
fn gzip_in_place(path: &Path) -> io::Result<()> {
    let data = std::fs::read(path)?;
    let mut gz_path = path.as_os_str().to_os_string();
    gz_path.push(".gz");
    let gz_file = File::create(&gz_path)?;
    let mut encoder = GzEncoder::new(gz_file, Compression::default());
    encoder.write_all(&data)?;
    encoder.finish()?;
    std::fs::remove_file(path)?;
    Ok(())
}

impl LogOutput for FileOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        self.maybe_rotate()?;

        let bytes = line.as_bytes();
        self.writer.write_all(bytes)?;
        self.writer.write_all(b"\n")?;
        self.current_size += bytes.len() as u64 + 1;

        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Generate rotated file path. When `compressed`, appends `.gz` to match
/// what [`gzip_in_place`] produces, so rotation shifting finds the right
/// files regardless of whether `FileRotation::compress` is set.
fn rotated_path(base: &Path, index: u32, compressed: bool) -> PathBuf {
    let stem = base.file_stem().unwrap_or_default().to_string_lossy();
    let ext = base.extension().map(|e| e.to_string_lossy()).unwrap_or_default();

    let new_name = if ext.is_empty() {
        format!("{}.{}", stem, index)
    } else {
        format!("{}.{}.{}", stem, index, ext)
    };

    let path = base.with_file_name(new_name);
    if compressed {
        let mut gz = path.into_os_string();
        gz.push(".gz");
        PathBuf::from(gz)
    } else {
        path
    }
}

/// Syslog output (Unix domain socket).
#[cfg(unix)]
pub struct SyslogOutput {
    socket: std::os::unix::net::UnixDatagram,
}

#[cfg(unix)]
impl SyslogOutput {
    /// Connect to local syslog daemon.
    pub fn connect() -> io::Result<Self> {
        let socket = std::os::unix::net::UnixDatagram::unbound()?;

        let paths = ["/dev/log", "/var/run/syslog", "/var/run/log"];
        for path in &paths {
            if std::path::Path::new(path).exists() {
                socket.connect(path)?;
                return Ok(Self { socket });
            }
        }

        Err(io::Error::new(io::ErrorKind::NotFound, "No syslog socket found"))
    }
}

#[cfg(unix)]
impl LogOutput for SyslogOutput {
    fn write(&mut self, line: &str) -> io::Result<()> {
        self.socket.send(line.as_bytes())?;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(not(unix))]
pub struct SyslogOutput;

#[cfg(not(unix))]
impl SyslogOutput {
    pub fn connect() -> io::Result<Self> {
        Err(io::Error::new(io::ErrorKind::Unsupported, "Syslog not supported on this platform"))
    }
}

#[cfg(not(unix))]
impl LogOutput for SyslogOutput {
    fn write(&mut self, _line: &str) -> io::Result<()> {
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Create output from configuration.
pub fn create_output(config: &OutputConfig) -> io::Result<Box<dyn LogOutput>> {
    match config {
        OutputConfig::Stdout => Ok(Box::new(StdoutOutput::new())),
        OutputConfig::Stderr => Ok(Box::new(StderrOutput::new())),
        OutputConfig::File { path, rotation } => Ok(Box::new(FileOutput::open(path, rotation.clone())?)),
        OutputConfig::Syslog { .. } => Ok(Box::new(SyslogOutput::connect()?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn stdout_output_does_not_panic() {
        let mut output = StdoutOutput::new();
        output.write("test log line").unwrap();
        output.flush().unwrap();
    }

    #[test]
    fn file_output_writes_lines() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let mut output = FileOutput::open(&log_path, None).unwrap();
        output.write("line 1").unwrap();
        output.write("line 2").unwrap();
        output.flush().unwrap();

        let content = std::fs::read_to_string(&log_path).unwrap();
        assert!(content.contains("line 1"));
        assert!(content.contains("line 2"));
    }

    #[test]
    fn file_output_rotates_at_size_limit() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let rotation = FileRotation {
            max_size: 50,
            max_files: 3,
            compress: false,
        };

        let mut output = FileOutput::open(&log_path, Some(rotation)).unwrap();
        for i in 0..10 {
            output.write(&format!("This is line number {}", i)).unwrap();
        }
        output.flush().unwrap();

        assert!(log_path.exists());
        let rotated_1 = temp_dir.path().join("test.1.log");
        assert!(rotated_1.exists());
    }

    #[test]
    fn rotated_path_inserts_index_before_extension() {
        let base = Path::new("/var/log/assimilation.log");
        assert_eq!(rotated_path(base, 1, false), PathBuf::from("/var/log/assimilation.1.log"));
        assert_eq!(rotated_path(base, 5, false), PathBuf::from("/var/log/assimilation.5.log"));

        let no_ext = Path::new("/var/log/assimilation");
        assert_eq!(rotated_path(no_ext, 1, false), PathBuf::from("/var/log/assimilation.1"));
    }

    #[test]
    fn rotated_path_appends_gz_when_compressed() {
        let base = Path::new("/var/log/assimilation.log");
        assert_eq!(
            rotated_path(base, 1, true),
            PathBuf::from("/var/log/assimilation.1.log.gz")
        );
    }

    #[test]
    fn file_output_gzips_rotated_file_when_compress_is_set() {
        let temp_dir = TempDir::new().unwrap();
        let log_path = temp_dir.path().join("test.log");

        let rotation = FileRotation {
            max_size: 50,
            max_files: 3,
            compress: true,
        };

        let mut output = FileOutput::open(&log_path, Some(rotation)).unwrap();
        for i in 0..10 {
            output.write(&format!("This is line number {}", i)).unwrap();
        }
        output.flush().unwrap();

        assert!(log_path.exists());
        let rotated_gz = temp_dir.path().join("test.1.log.gz");
        assert!(rotated_gz.exists());
        let plain = temp_dir.path().join("test.1.log");
        assert!(!plain.exists());
    }
}
