use std::time::Duration;

use clap::builder::styling::AnsiColor;
use clap::builder::Styles;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::wrapper::{Admix, DEFAULT_ADMIX_BIN};

const fn extra_build_info() -> &'static str {
    match option_env!("CARGO_BUILD_DESC") {
        Some(e) => e,
        None => env!("CARGO_PKG_VERSION"),
    }
}
pub const VERSION: &str = extra_build_info();
const INFO_STRING: &str = "
admixweb version ";
const AFTER_STRING: &str = "
   ──────────────────────────────────
   run locus and pedigree files through the admix population admixture tool";

// colouring of the help
const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().bold())
    .usage(AnsiColor::BrightMagenta.on_default().bold())
    .literal(AnsiColor::BrightMagenta.on_default())
    .placeholder(AnsiColor::White.on_default());

#[derive(Parser)]
#[command(
    version = VERSION,
    about = format!("{}{}{}", INFO_STRING, VERSION, AFTER_STRING),
    arg_required_else_help = true,
    flatten_help = true,
    styles = STYLES
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// How admix output is written.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum OutputFormat {
    /// exactly what admix wrote
    Text,
    /// HTML table rows, one per output line
    Table,
    /// a standalone HTML page
    Html,
}

/// Where to find admix, and how to run it.
#[derive(Args, Debug)]
pub struct AdmixArgs {
    /// the admix executable
    #[arg(long, env = "ADMIX_BIN", default_value = DEFAULT_ADMIX_BIN)]
    pub admix_bin: String,

    /// directory for the temporary input and output files
    #[arg(long, env = "ADMIX_TMPDIR")]
    pub temp_dir: Option<String>,

    /// give up on admix after this many seconds
    #[arg(long, env = "ADMIX_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl AdmixArgs {
    pub fn admix(&self) -> Admix {
        let mut admix = Admix::new(&self.admix_bin);
        if let Some(dir) = &self.temp_dir {
            admix = admix.temp_dir(dir);
        }
        if let Some(secs) = self.timeout {
            admix = admix.timeout(Duration::from_secs(secs));
        }
        admix
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run admix on a locus file and a pedigree file
    #[command(arg_required_else_help = true)]
    Run {
        /// the locus (marker) file, in admix format
        #[arg(long, conflicts_with = "table", required_unless_present = "table")]
        loc: Option<String>,

        /// build the locus file from a tab-delimited allele frequency table instead
        #[arg(long)]
        table: Option<String>,

        /// the pedigree (genotype) file
        #[arg(long)]
        ped: String,

        /// output file
        #[arg(short)]
        output: Option<String>,

        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,

        #[command(flatten)]
        admix: AdmixArgs,
    },

    /// Build an admix locus file from a tab-delimited allele frequency table.
    /// The header is `marker  allele  <population 1> ... <population N>`.
    #[command(arg_required_else_help = true)]
    Locus {
        /// the allele frequency table
        table: String,

        /// name of the locus file, defaults to the table's file stem
        #[arg(long)]
        name: Option<String>,

        /// output file
        #[arg(short)]
        output: Option<String>,
    },

    /// Run every job in a manifest concurrently and write the job records as JSON
    #[command(arg_required_else_help = true)]
    Batch {
        /// tab-delimited manifest with `locus` and `pedigree` columns
        manifest: String,

        /// output file
        #[arg(short, default_value = "jobs.json")]
        output: String,

        /// the number of threads to use
        #[arg(short, long, default_value_t = 4)]
        threads: usize,

        #[command(flatten)]
        admix: AdmixArgs,
    },

    /// Reformat existing admix output as HTML
    Prettify {
        /// admix output, read from standard input if not given
        input: Option<String>,

        /// output file
        #[arg(short)]
        output: Option<String>,

        /// write a standalone HTML page rather than bare table rows
        #[arg(long, action)]
        page: bool,
    },
}
