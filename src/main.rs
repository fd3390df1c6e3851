extern crate env_logger;
#[macro_use]
extern crate log;
use std::{
    fs::File,
    io::{prelude::*, stdin, stdout, BufWriter},
    path::Path,
};

use anyhow::{Context, Result};
use clap::Parser;

mod batch;
mod cli;
mod job;
mod locus;
mod prettify;
mod report;
mod wrapper;

#[cfg(all(test, unix))]
mod testing;

use cli::{Cli, Commands, OutputFormat};
use job::Job;
use locus::LocusFile;
use wrapper::AdmixError;

/// Creates a `BufWriter` for the given output option. This allows for an output file to be passed
/// or otherwise will default to using standard output.
fn get_writer(output: &Option<String>) -> Result<impl Write> {
    // get output as a BufWriter - equal to stdout if None
    let writer = BufWriter::new(match output {
        Some(ref x) => {
            let file = File::create(Path::new(x))
                .with_context(|| format!("Unable to create output file {x}"))?;
            Box::new(file) as Box<dyn Write + Send>
        }
        None => Box::new(stdout()) as Box<dyn Write + Send>,
    });
    Ok(writer)
}

/// Reads the whole input file, or standard input if no path is given.
fn read_input(input: &Option<String>) -> Result<String> {
    let mut text = String::new();
    match input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("Unable to open {path}"))?
                .read_to_string(&mut text)?;
        }
        None => {
            stdin().read_to_string(&mut text)?;
        }
    }
    Ok(text)
}

fn write_output(writer: &mut impl Write, title: &str, output: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => writer.write_all(output.as_bytes())?,
        OutputFormat::Table => writeln!(writer, "{}", prettify::prettify(output))?,
        OutputFormat::Html => writer.write_all(report::render_page(title, output)?.as_bytes())?,
    }
    writer.flush()?;
    Ok(())
}

fn try_main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_target(false)
        .init();

    let cli = Cli::parse();

    info!("admixweb v{}", cli::VERSION);

    match &cli.command {
        Commands::Run {
            loc,
            table,
            ped,
            output,
            format,
            admix,
        } => {
            let job = match table {
                Some(table) => {
                    let locus = LocusFile::from_path(table)
                        .with_context(|| format!("Invalid allele frequency table {table}"))?;
                    info!("Built locus file with {} markers", locus.markers.len());
                    Job::from_locus_file(&locus, Path::new(ped))?
                }
                None => {
                    let loc = loc.as_deref().context("Either --loc or --table is required")?;
                    Job::from_paths(Path::new(loc), Path::new(ped))?
                }
            };

            let admix = admix.admix();
            info!("Running job \"{}\" with {}", job.name, admix.program().display());

            let result = job.execute(&admix).map_err(|e| match e {
                AdmixError::Computation(msg) => anyhow::anyhow!(indoc::formatdoc! {"
                    admix exited with an error. Its output was:
                    {msg}"}),
                AdmixError::Io(e) => anyhow::Error::new(e)
                    .context(format!("Could not run {}", admix.program().display())),
            })?;

            let mut writer = get_writer(output)?;
            write_output(&mut writer, &job.name, &result, *format)?;

            info!("Completed successfully.")
        }
        Commands::Locus {
            table,
            name,
            output,
        } => {
            let mut locus = LocusFile::from_path(table)
                .with_context(|| format!("Invalid allele frequency table {table}"))?;
            if let Some(name) = name {
                locus.name = name.clone();
                locus.validate()?;
            }

            let mut writer = get_writer(output)?;
            writer.write_all(locus.export().as_bytes())?;
            writer.flush()?;

            info!(
                "Wrote locus file \"{}\": {} markers, {} populations",
                locus.name,
                locus.markers.len(),
                locus.population
            );
        }
        Commands::Batch {
            manifest,
            output,
            threads,
            admix,
        } => {
            let jobs = batch::load_jobs(manifest)?;
            let records = batch::run_batch(&jobs, &admix.admix(), *threads)?;

            let file = File::create(output)
                .with_context(|| format!("Unable to create output file {output}"))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, &records)
                .context("Could not write job records")?;
            writer.flush()?;

            info!("Completed {} jobs to {output}", records.len());
        }
        Commands::Prettify {
            input,
            output,
            page,
        } => {
            let text = read_input(input)?;
            let title = input.as_deref().unwrap_or("admix output");
            let format = if *page {
                OutputFormat::Html
            } else {
                OutputFormat::Table
            };

            let mut writer = get_writer(output)?;
            write_output(&mut writer, title, &text, format)?;
        }
    };
    Ok(())
}

fn main() {
    if let Err(err) = try_main() {
        error!("{}", err);

        // report any errors that are produced
        err.chain()
            .skip(1)
            .for_each(|cause| error!("  because: {}", cause));

        std::process::exit(1);
    }
}
