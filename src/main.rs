//! field-nose CLI - profile the columns of a CSV file.

use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use field_nose::{Profiler, ResolutionMode};

/// Streaming field-type profiler.
///
/// Reads a CSV file, trains one profiler per column, and reports the
/// inferred semantic type, pattern, and statistics for each.
#[derive(Parser, Debug)]
#[command(name = "field-nose")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input CSV file(s) to profile
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Only profile the column at this zero-based index
    #[arg(short = 'c', long)]
    col: Option<usize>,

    /// Detection window size (minimum 20)
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Maximum number of distinct values tracked per column
    #[arg(long)]
    max_cardinality: Option<usize>,

    /// Resolve ambiguous dates day-first (default: month-first)
    #[arg(long)]
    dmy: bool,

    /// Field delimiter (single ASCII character)
    #[arg(short = 'd', long, default_value = ",")]
    delimiter: char,

    /// Print every trained value
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let mut exit_code = ExitCode::SUCCESS;
    for file in &args.files {
        if let Err(e) = profile_file(file, &args) {
            eprintln!("Error processing {}: {e}", file.display());
            exit_code = ExitCode::FAILURE;
        }
    }
    exit_code
}

fn profile_file(path: &PathBuf, args: &Args) -> Result<(), Box<dyn Error>> {
    if !args.delimiter.is_ascii() {
        return Err("delimiter must be a single ASCII character".into());
    }

    let start = Instant::now();
    let bytes = fs::read(path)?;
    let text = simdutf8::basic::from_utf8(&bytes).map_err(|_| "input is not valid UTF-8")?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(args.delimiter as u8)
        .flexible(true)
        .from_reader(text.as_bytes());

    let resolution = if args.dmy {
        ResolutionMode::DayFirst
    } else {
        ResolutionMode::MonthFirst
    };

    let headers = reader.headers()?.clone();
    let num_fields = headers.len();
    let mut profilers = Vec::with_capacity(num_fields);
    for header in headers.iter() {
        let mut profiler = Profiler::with_resolution(header, resolution);
        if let Some(samples) = args.samples {
            profiler.set_sample_size(samples)?;
        }
        if let Some(cardinality) = args.max_cardinality {
            profiler.set_max_cardinality(cardinality)?;
        }
        profilers.push(profiler);
    }

    let mut records = 0u64;
    let mut skipped = 0u64;
    for record in reader.records() {
        let record = record?;
        if record.len() != num_fields {
            skipped += 1;
            continue;
        }
        records += 1;
        for (column, value) in record.iter().enumerate() {
            if args.col.is_some_and(|only| only != column) {
                continue;
            }
            if args.verbose {
                eprintln!("{}: '{}'", headers.get(column).unwrap_or(""), value);
            }
            // CSV cannot represent null, so empty fields train as blank
            profilers[column].train(Some(value));
        }
    }
    if skipped != 0 {
        eprintln!("{}: skipped {skipped} ragged record(s)", path.display());
    }

    let mut types_detected = 0usize;
    let mut matched = 0u64;
    let mut sampled = 0u64;
    for (column, profiler) in profilers.iter_mut().enumerate() {
        if args.col.is_some_and(|only| only != column) {
            continue;
        }
        let result = profiler.result();
        println!("{result}");
        if result.confidence() > 0.0 {
            types_detected += 1;
        }
        matched += result.match_count();
        sampled += result.sample_count();
    }

    let profiled = args.col.map_or(num_fields, |_| 1);
    eprintln!(
        "{}: {} records, {}/{} columns typed, matched {}/{} values in {:?}",
        path.display(),
        records,
        types_detected,
        profiled,
        matched,
        sampled,
        start.elapsed(),
    );
    Ok(())
}
