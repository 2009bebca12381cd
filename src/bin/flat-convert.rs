//! CLI tool to convert flat-file data between record formats.

use clap::{Parser, ValueEnum};
use flatfile_rs::{
    CsvParserConfig, CsvReader, CsvWriter, DelimitedParserConfig, DelimitedReader,
    DelimitedWriter, FixedLengthParserConfig, FixedLengthReader, FixedLengthWriter, ReadError,
    RecordReader, RecordWriter,
};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Delimited,
    Fixed,
    Csv,
}

/// Convert a flat file from one record format to another.
///
/// Fixed-length input is carried through as whole lines; delimited and CSV
/// input is re-emitted field by field.
#[derive(Parser)]
#[command(name = "flat-convert")]
struct Cli {
    /// Input data file
    input: String,

    /// Input record format
    #[arg(long, value_enum, default_value_t = Format::Delimited)]
    from: Format,

    /// Output record format
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    to: Format,

    /// Field delimiter for delimited/CSV formats
    #[arg(short, long, default_value_t = ',')]
    delimiter: char,

    /// Escape character for the delimited format
    #[arg(short, long)]
    escape: Option<char>,

    /// Line continuation character
    #[arg(short = 'c', long)]
    continuation: Option<char>,

    /// Comment prefix; may be repeated
    #[arg(long = "comment")]
    comments: Vec<String>,

    /// Skip records that fail to parse instead of stopping
    #[arg(short, long)]
    skip_bad_records: bool,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Show record counts on stderr
    #[arg(short, long)]
    verbose: bool,
}

fn make_reader(cli: &Cli, input: Box<dyn BufRead>) -> Result<Box<dyn RecordReader>, String> {
    match cli.from {
        Format::Delimited => {
            let config = DelimitedParserConfig {
                delimiter: cli.delimiter,
                escape: cli.escape,
                line_continuation: cli.continuation,
                comments: cli.comments.clone(),
                ..Default::default()
            };
            DelimitedReader::new(input, config)
                .map(|r| Box::new(r) as Box<dyn RecordReader>)
                .map_err(|e| e.to_string())
        }
        Format::Fixed => {
            let config = FixedLengthParserConfig {
                line_continuation: cli.continuation,
                comments: cli.comments.clone(),
                ..Default::default()
            };
            FixedLengthReader::new(input, config)
                .map(|r| Box::new(r) as Box<dyn RecordReader>)
                .map_err(|e| e.to_string())
        }
        Format::Csv => {
            let config = CsvParserConfig {
                delimiter: cli.delimiter,
                multiline: true,
                comments: cli.comments.clone(),
                ..Default::default()
            };
            CsvReader::new(input, config)
                .map(|r| Box::new(r) as Box<dyn RecordReader>)
                .map_err(|e| e.to_string())
        }
    }
}

fn make_writer(cli: &Cli, output: Box<dyn Write>) -> Result<Box<dyn RecordWriter>, String> {
    match cli.to {
        Format::Delimited => {
            let config = DelimitedParserConfig {
                delimiter: cli.delimiter,
                escape: cli.escape,
                ..Default::default()
            };
            DelimitedWriter::new(output, config)
                .map(|w| Box::new(w) as Box<dyn RecordWriter>)
                .map_err(|e| e.to_string())
        }
        Format::Fixed => FixedLengthWriter::new(output, FixedLengthParserConfig::default())
            .map(|w| Box::new(w) as Box<dyn RecordWriter>)
            .map_err(|e| e.to_string()),
        Format::Csv => {
            let config = CsvParserConfig {
                delimiter: cli.delimiter,
                ..Default::default()
            };
            CsvWriter::new(output, config)
                .map(|w| Box::new(w) as Box<dyn RecordWriter>)
                .map_err(|e| e.to_string())
        }
    }
}

fn run(cli: &Cli) -> Result<(usize, usize), String> {
    let file = File::open(&cli.input)
        .map_err(|e| format!("error reading input file '{}': {e}", cli.input))?;
    let mut reader = make_reader(cli, Box::new(BufReader::new(file)))?;

    let output: Box<dyn Write> = match &cli.output {
        Some(path) => Box::new(BufWriter::new(File::create(path).map_err(|e| {
            format!("error creating output file '{path}': {e}")
        })?)),
        None => Box::new(io::stdout()),
    };
    let mut writer = make_writer(cli, output)?;

    let mut read_count = 0;
    let mut written_count = 0;
    loop {
        match reader.read() {
            Ok(Some(record)) => {
                read_count += 1;
                writer
                    .write(&record.value)
                    .map_err(|e| format!("error writing record {read_count}: {e}"))?;
                written_count += 1;
            }
            Ok(None) => break,
            Err(err @ ReadError::Malformed { .. }) if cli.skip_bad_records => {
                read_count += 1;
                eprintln!("skipping record: {err}");
            }
            Err(err) => return Err(err.to_string()),
        }
    }

    writer.close().map_err(|e| e.to_string())?;
    Ok((read_count, written_count))
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok((read_count, written_count)) => {
            if cli.verbose {
                eprintln!("Records:  {read_count} in -> {written_count} out");
            }
        }
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    }
}
