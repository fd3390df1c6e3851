use std::fmt::Write as _;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest marker name the locus file format allows.
pub const MAX_MARKER_NAME: usize = 16;

/// Smallest number of parental populations an admixture estimate makes sense for.
pub const MIN_POPULATIONS: usize = 2;

/// Most populations admix is built to handle.
pub const MAX_POPULATIONS: usize = 3;

#[derive(Debug, Error)]
pub enum LocusError {
    #[error("locus file must have a name")]
    MissingName,

    #[error("at least 2 populations are needed, found {0}")]
    TooFewPopulations(usize),

    #[error("admix handles at most 3 populations, found {0}")]
    TooManyPopulations(usize),

    #[error("locus file has no markers")]
    NoMarkers,

    #[error("invalid marker name '{0}' (1-16 characters, no blanks)")]
    InvalidMarkerName(String),

    #[error("invalid allele name '{allele}' for marker {marker}")]
    InvalidAlleleName { marker: String, allele: String },

    #[error("marker {marker} allele {allele}: expected {expected} frequencies, found {found}")]
    FrequencyCount {
        marker: String,
        allele: String,
        expected: usize,
        found: usize,
    },

    #[error("marker {marker} allele {allele}: frequency '{value}' is not a number")]
    InvalidFrequency {
        marker: String,
        allele: String,
        value: String,
    },

    #[error("marker {marker} allele {allele}: frequency {value} is outside [0, 1]")]
    FrequencyRange {
        marker: String,
        allele: String,
        value: f64,
    },

    #[error("could not read allele frequency table: {0}")]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allele {
    pub name: String,
    /// One frequency per population, in population order
    pub freqs: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    pub name: String,
    pub alleles: Vec<Allele>,
}

/// A set of markers with their allele frequencies in each parental population.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusFile {
    pub name: String,
    pub population: usize,
    pub markers: Vec<Marker>,
}

fn is_field(name: &str) -> bool {
    !name.is_empty() && !name.contains(char::is_whitespace)
}

impl LocusFile {
    /// Reads a tab-delimited allele frequency table. The header names the columns
    /// `marker`, `allele` and then one column per population; every row adds one allele to
    /// its marker. Markers keep the order they are first seen in.
    ///
    /// # Errors
    ///
    /// Fails if the table cannot be parsed, a frequency is not a number, or the
    /// resulting locus file does not pass [`LocusFile::validate`].
    pub fn from_table(name: &str, reader: impl Read) -> Result<Self, LocusError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(b'\t')
            .comment(Some(b'#'))
            .trim(Trim::All)
            .from_reader(reader);

        let population = rdr.headers()?.len().saturating_sub(2);

        let mut markers: IndexMap<String, Vec<Allele>> = IndexMap::new();
        let mut record = StringRecord::new();
        while rdr.read_record(&mut record)? {
            let marker = record.get(0).unwrap_or_default().to_string();
            let allele = record.get(1).unwrap_or_default().to_string();

            let freqs = record
                .iter()
                .skip(2)
                .map(|value| {
                    value.parse::<f64>().map_err(|_| LocusError::InvalidFrequency {
                        marker: marker.clone(),
                        allele: allele.clone(),
                        value: value.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            markers
                .entry(marker)
                .or_default()
                .push(Allele { name: allele, freqs });
        }

        let locus = LocusFile {
            name: name.to_string(),
            population,
            markers: markers
                .into_iter()
                .map(|(name, alleles)| Marker { name, alleles })
                .collect(),
        };
        locus.validate()?;
        Ok(locus)
    }

    /// Reads an allele frequency table from disk, naming the locus file after the
    /// file stem.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, LocusError> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_table(&name, File::open(path)?)
    }

    pub fn validate(&self) -> Result<(), LocusError> {
        if self.name.trim().is_empty() {
            return Err(LocusError::MissingName);
        }
        if self.population < MIN_POPULATIONS {
            return Err(LocusError::TooFewPopulations(self.population));
        }
        if self.population > MAX_POPULATIONS {
            return Err(LocusError::TooManyPopulations(self.population));
        }
        if self.markers.is_empty() {
            return Err(LocusError::NoMarkers);
        }

        for marker in &self.markers {
            if !is_field(&marker.name) || marker.name.chars().count() > MAX_MARKER_NAME {
                return Err(LocusError::InvalidMarkerName(marker.name.clone()));
            }
            for allele in &marker.alleles {
                if !is_field(&allele.name) {
                    return Err(LocusError::InvalidAlleleName {
                        marker: marker.name.clone(),
                        allele: allele.name.clone(),
                    });
                }
                if allele.freqs.len() != self.population {
                    return Err(LocusError::FrequencyCount {
                        marker: marker.name.clone(),
                        allele: allele.name.clone(),
                        expected: self.population,
                        found: allele.freqs.len(),
                    });
                }
                if let Some(&value) = allele.freqs.iter().find(|f| !(0.0..=1.0).contains(*f)) {
                    return Err(LocusError::FrequencyRange {
                        marker: marker.name.clone(),
                        allele: allele.name.clone(),
                        value,
                    });
                }
            }
        }

        Ok(())
    }

    /// Writes the locus file in the format admix reads: the marker name on a line of its
    /// own, then one line per allele with the allele name and its population frequencies.
    pub fn export(&self) -> String {
        let mut out = String::new();
        for marker in &self.markers {
            let _ = writeln!(out, "{}", marker.name);
            for allele in &marker.alleles {
                let _ = write!(out, "{}", allele.name);
                for freq in &allele.freqs {
                    let _ = write!(out, " {freq}");
                }
                out.push('\n');
            }
        }
        out
    }
}
