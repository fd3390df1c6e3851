use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};
use rayon::prelude::*;
use serde::Deserialize;
use thiserror::Error;

use crate::job::{Job, JobRecord};
use crate::wrapper::{AdmixError, Compute};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("invalid manifest row {row}: {source}")]
    InvalidRow { row: usize, source: csv::Error },

    #[error("manifest lists no jobs")]
    Empty,
}

/// One line of a batch manifest.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ManifestEntry {
    pub locus: PathBuf,
    pub pedigree: PathBuf,
}

/// Reads a tab-delimited manifest with a `locus` and a `pedigree` column. Relative
/// paths are resolved against `base`.
pub fn read_manifest(reader: impl Read, base: &Path) -> Result<Vec<ManifestEntry>, ManifestError> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .comment(Some(b'#'))
        .trim(Trim::All)
        .from_reader(reader);

    let entries = rdr
        .deserialize::<ManifestEntry>()
        .enumerate()
        .map(|(row, entry)| {
            let entry = entry.map_err(|source| ManifestError::InvalidRow { row: row + 1, source })?;
            Ok(ManifestEntry {
                locus: base.join(entry.locus),
                pedigree: base.join(entry.pedigree),
            })
        })
        .collect::<Result<Vec<_>, ManifestError>>()?;

    if entries.is_empty() {
        return Err(ManifestError::Empty);
    }
    Ok(entries)
}

/// Loads every job named in the manifest at `path`.
pub fn load_jobs(path: &str) -> Result<Vec<Job>> {
    let file = File::open(path).with_context(|| format!("Unable to open manifest {path}"))?;
    let base = Path::new(path).parent().unwrap_or(Path::new(""));

    read_manifest(file, base)?
        .iter()
        .map(|entry| Job::from_paths(&entry.locus, &entry.pedigree))
        .collect()
}

/// Runs all jobs on a pool of `threads` workers. Records come back in the order the jobs
/// were given; a failing admix run is recorded and does not stop the others.
pub fn run_batch(jobs: &[Job], admix: &impl Compute, threads: usize) -> Result<Vec<JobRecord>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .context("Could not start worker threads")?;

    info!("Running {} jobs on {} threads", jobs.len(), threads);

    let records = pool.install(|| {
        jobs.par_iter()
            .map(|job| job.run(admix))
            .collect::<Result<Vec<_>, AdmixError>>()
    })?;

    let failed = records.iter().filter(|r| !r.succeeded).count();
    if failed > 0 {
        warn!("{failed} of {} jobs failed", records.len());
    }

    Ok(records)
}
