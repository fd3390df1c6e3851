use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::locus::LocusFile;
use crate::wrapper::{AdmixError, Compute};

#[derive(Debug, Error, PartialEq)]
pub enum GenotypeError {
    #[error("pedigree file must have a name")]
    MissingName,

    #[error("pedigree file {0} has no data")]
    MissingData(String),
}

/// A pedigree (genotype) file: one line per individual with family, individual,
/// affection status, population, sex and then the marker genotypes.
#[derive(Debug, Clone)]
pub struct GenotypeFile {
    pub name: String,
    pub data: String,
}

impl GenotypeFile {
    pub fn new(name: &str, data: String) -> Result<Self, GenotypeError> {
        let file = GenotypeFile {
            name: name.to_string(),
            data,
        };
        file.validate()?;
        Ok(file)
    }

    /// Reads a pedigree file, naming it after the file stem.
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Unable to read pedigree file {}", path.display()))?;
        Ok(GenotypeFile::new(&stem(path), data)?)
    }

    pub fn validate(&self) -> Result<(), GenotypeError> {
        if self.name.trim().is_empty() {
            return Err(GenotypeError::MissingName);
        }
        if self.data.trim().is_empty() {
            return Err(GenotypeError::MissingData(self.name.clone()));
        }
        Ok(())
    }
}

/// One admix run: a locus file paired with a pedigree (genotype) file.
#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub locus_file: String,
    pub pedigree_file: String,
    pub locus: String,
    pub pedigree: String,
}

/// The stored outcome of a job. When admix fails, `results` holds its diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub name: String,
    pub locus_file: String,
    pub pedigree_file: String,
    pub succeeded: bool,
    pub results: String,
    pub started: String,
    pub elapsed: f64,
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

impl Job {
    pub fn new(locus_file: &str, pedigree_file: &str, locus: String, pedigree: String) -> Self {
        Job {
            name: format!("{locus_file} {pedigree_file}"),
            locus_file: locus_file.to_string(),
            pedigree_file: pedigree_file.to_string(),
            locus,
            pedigree,
        }
    }

    /// Reads a ready-made locus file and a pedigree file. The job is named after the two
    /// file stems.
    pub fn from_paths(locus: &Path, pedigree: &Path) -> Result<Self> {
        let locus_text = std::fs::read_to_string(locus)
            .with_context(|| format!("Unable to read locus file {}", locus.display()))?;
        let genotype = GenotypeFile::from_path(pedigree)?;

        Ok(Job::new(&stem(locus), &genotype.name, locus_text, genotype.data))
    }

    /// Pairs a locus file built from an allele frequency table with a pedigree file.
    pub fn from_locus_file(locus: &LocusFile, pedigree: &Path) -> Result<Self> {
        let genotype = GenotypeFile::from_path(pedigree)?;

        Ok(Job::new(&locus.name, &genotype.name, locus.export(), genotype.data))
    }

    pub fn execute(&self, admix: &impl Compute) -> Result<String, AdmixError> {
        admix.invoke(&self.locus, &self.pedigree)
    }

    /// Runs the job and records its outcome. A failing admix run is recorded rather than
    /// returned; only I/O problems are errors here.
    pub fn run(&self, admix: &impl Compute) -> Result<JobRecord, AdmixError> {
        let started = chrono::offset::Local::now();
        let timer = Instant::now();

        let (succeeded, results) = match self.execute(admix) {
            Ok(output) => (true, output),
            Err(AdmixError::Computation(message)) => {
                warn!("Job \"{}\" failed: {}", self.name, message);
                (false, message)
            }
            Err(e) => return Err(e),
        };

        Ok(JobRecord {
            name: self.name.clone(),
            locus_file: self.locus_file.clone(),
            pedigree_file: self.pedigree_file.clone(),
            succeeded,
            results,
            started: started.to_rfc3339(),
            elapsed: timer.elapsed().as_secs_f64(),
        })
    }
}
