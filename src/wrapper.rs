use std::fs::File;
use std::io::prelude::*;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;

/// Name of the admix executable when none is configured.
pub const DEFAULT_ADMIX_BIN: &str = "admix";

/// Fixed flags handed to admix before the three file paths: quiet mode, a starting
/// grid interval of 0.1 and `0` as the missing allele value.
pub const ADMIX_FLAGS: [&str; 5] = ["-q", "-g", ".1", "-M", "0"];

const POLL_INTERVAL: Duration = Duration::from_millis(20);

#[derive(Debug, Error)]
pub enum AdmixError {
    /// admix ran but reported failure. Carries its combined stdout/stderr, trimmed.
    #[error("{0}")]
    Computation(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A synchronous "run the admixture computation" capability.
///
/// Everything above the process layer (jobs, batches, the CLI) talks to this trait
/// rather than spawning processes itself.
pub trait Compute: Sync {
    fn invoke(&self, locus: &str, pedigree: &str) -> Result<String, AdmixError>;
}

/// Runs the external admix binary once per call.
///
/// Each call writes its inputs to freshly created, uniquely named temporary files, so
/// any number of calls can run at once from different threads.
#[derive(Clone, Debug)]
pub struct Admix {
    program: PathBuf,
    temp_dir: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl Admix {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Admix {
            program: program.into(),
            temp_dir: None,
            timeout: None,
        }
    }

    /// Create the temporary files in `dir` instead of the system temp directory.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Kill admix and fail the call if it runs for longer than `limit`.
    pub fn timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn scratch_file(&self, prefix: &str) -> std::io::Result<NamedTempFile> {
        let mut builder = Builder::new();
        builder.prefix(prefix);
        match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
    }

    /// An unnamed file, unlinked as soon as it is created, which collects everything
    /// admix prints on either stream.
    fn capture_file(&self) -> std::io::Result<File> {
        match &self.temp_dir {
            Some(dir) => tempfile::tempfile_in(dir),
            None => tempfile::tempfile(),
        }
    }

    /// Waits for the child, returning `None` if the timeout elapsed first. The child is
    /// killed and reaped in that case.
    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        let Some(limit) = self.timeout else {
            return child.wait().map(Some);
        };

        let start = Instant::now();
        loop {
            if let Some(status) = child.try_wait()? {
                return Ok(Some(status));
            }
            if start.elapsed() >= limit {
                child.kill()?;
                child.wait()?;
                return Ok(None);
            }
            std::thread::sleep(POLL_INTERVAL);
        }
    }
}

impl Compute for Admix {
    fn invoke(&self, locus: &str, pedigree: &str) -> Result<String, AdmixError> {
        // the guards delete their files when dropped, on every return path
        let mut loc = self.scratch_file("admix.loc")?;
        loc.write_all(locus.as_bytes())?;
        loc.flush()?;

        let mut ped = self.scratch_file("admix.ped")?;
        ped.write_all(pedigree.as_bytes())?;
        ped.flush()?;

        let out = self.scratch_file("admix.out")?;

        // stdout and stderr share one file description, so their writes stay in order
        let mut capture = self.capture_file()?;

        debug!(
            "Running {} on {} and {}",
            self.program.display(),
            loc.path().display(),
            ped.path().display()
        );

        let mut child = Command::new(&self.program)
            .args(ADMIX_FLAGS)
            .arg(loc.path())
            .arg(ped.path())
            .arg(out.path())
            .stdin(Stdio::null())
            .stdout(Stdio::from(capture.try_clone()?))
            .stderr(Stdio::from(capture.try_clone()?))
            .spawn()?;

        let status = self.wait(&mut child)?;

        let mut diagnostic = Vec::new();
        capture.seek(SeekFrom::Start(0))?;
        capture.read_to_end(&mut diagnostic)?;
        let diagnostic = String::from_utf8_lossy(&diagnostic).trim().to_string();

        match status {
            Some(status) if status.success() => {
                let output = std::fs::read_to_string(out.path())?;
                debug!("admix finished, {} bytes of output", output.len());
                Ok(output)
            }
            Some(status) => {
                warn!("admix failed ({status})");
                Err(AdmixError::Computation(diagnostic))
            }
            None => {
                let limit = self.timeout.unwrap_or_default();
                warn!("admix killed after {limit:?}");
                let message = format!("admix did not finish within {limit:?}");
                Err(AdmixError::Computation(if diagnostic.is_empty() {
                    message
                } else {
                    format!("{message}\n{diagnostic}")
                }))
            }
        }
    }
}
