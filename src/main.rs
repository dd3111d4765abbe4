//! # ebcdic-convert CLI - EBCDIC to Unicode Converter
//!
//! Command-line interface for converting mainframe text files, detecting
//! their code page and screening batches of uploads.

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI features disabled. Enable with --features cli");
    std::process::exit(1);
}

#[cfg(feature = "cli")]
fn main() -> anyhow::Result<()> {
    cli::run()
}

#[cfg(feature = "cli")]
mod cli {
    use std::fs;
    use std::io::{self, Read};
    use std::path::PathBuf;

    use anyhow::{Context, Result};
    use clap::{Args, Parser, Subcommand, ValueEnum};
    use tracing_subscriber::EnvFilter;

    use ebcdic_convert::batch::DEFAULT_MAX_INPUT_BYTES;
    use ebcdic_convert::detection::{DEFAULT_PLAUSIBILITY_THRESHOLD, DEFAULT_SAMPLE_SIZE};
    use ebcdic_convert::{
        BatchOptions, CodePage, ConversionReport, ConversionRequest, EncodingDetector,
        FileOutcome, SourceSelection, UnicodeEncoding, convert, run_batch,
    };

    /// ebcdic-convert: EBCDIC to Unicode text converter
    #[derive(Parser)]
    #[command(name = "ebcdic-convert")]
    #[command(version, about, long_about = None)]
    struct Cli {
        #[command(subcommand)]
        command: Commands,

        /// Enable verbose output
        #[arg(short, long, global = true)]
        verbose: bool,

        /// Output format (text, json)
        #[arg(long, global = true, default_value = "text")]
        format: OutputFormat,
    }

    #[derive(Subcommand)]
    enum Commands {
        /// Convert an EBCDIC file to Unicode text
        Convert(ConvertArgs),

        /// Screen and convert several files, skipping ones that fail the gates
        Batch(BatchArgs),

        /// Detect the code page of a file
        Detect(DetectArgs),

        /// Check whether a file plausibly contains EBCDIC text
        Check(CheckArgs),

        /// List supported encodings
        List(ListArgs),
    }

    #[derive(Args)]
    struct ConvertArgs {
        /// EBCDIC input file
        input: PathBuf,

        /// Source code page, or "auto" to detect it
        #[arg(short = 'f', long = "from", default_value = "auto")]
        from: SourceSelection,

        /// Destination encoding (utf-8, utf-16, utf-32, ...); chosen automatically if omitted
        #[arg(short = 't', long = "to")]
        to: Option<UnicodeEncoding>,

        /// Write a JSON conversion report to this path
        #[arg(short, long)]
        report: Option<PathBuf>,
    }

    #[derive(Args)]
    struct BatchArgs {
        /// Input files
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Source code page, or "auto" to detect it per file
        #[arg(short = 'f', long = "from", default_value = "auto")]
        from: SourceSelection,

        /// Destination encoding; chosen per file if omitted
        #[arg(short = 't', long = "to")]
        to: Option<UnicodeEncoding>,

        /// Allowed file extension (repeatable)
        #[arg(long = "allow-ext", default_value = "ebc")]
        allow_ext: Vec<String>,

        /// Accept files with any extension
        #[arg(long, conflicts_with = "allow_ext")]
        any_extension: bool,

        /// Largest accepted input in MiB
        #[arg(long, default_value_t = DEFAULT_MAX_INPUT_BYTES / (1024 * 1024))]
        max_size_mb: u64,
    }

    #[derive(Args)]
    struct DetectArgs {
        /// Input file (stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Show replacement counts for every candidate
        #[arg(long)]
        candidates: bool,
    }

    #[derive(Args)]
    struct CheckArgs {
        /// Input file (stdin if not specified)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Bytes to inspect
        #[arg(long, default_value_t = DEFAULT_SAMPLE_SIZE)]
        sample_size: usize,

        /// Replacement ratio a code page must stay below
        #[arg(long, default_value_t = DEFAULT_PLAUSIBILITY_THRESHOLD)]
        threshold: f64,
    }

    #[derive(Args)]
    struct ListArgs {
        /// List destination encodings instead of source code pages
        #[arg(long)]
        destinations: bool,
    }

    #[derive(Clone, Debug, ValueEnum)]
    enum OutputFormat {
        Text,
        Json,
    }

    pub fn run() -> Result<()> {
        let cli = Cli::parse();
        init_logging(cli.verbose);

        match cli.command {
            Commands::Convert(ref args) => convert_command(args, &cli)?,
            Commands::Batch(ref args) => batch_command(args, &cli)?,
            Commands::Detect(ref args) => detect_command(args, &cli)?,
            Commands::Check(ref args) => check_command(args, &cli)?,
            Commands::List(ref args) => list_command(args, &cli)?,
        }

        Ok(())
    }

    fn init_logging(verbose: bool) {
        let default_filter = if verbose { "debug" } else { "warn" };
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new(default_filter)),
            )
            .with_writer(io::stderr)
            .init();
    }

    fn read_input(input: Option<&PathBuf>, limit: Option<usize>) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        match input {
            Some(path) => {
                let file = fs::File::open(path)
                    .with_context(|| format!("Failed to open input file: {}", path.display()))?;
                match limit {
                    Some(limit) => file.take(limit as u64).read_to_end(&mut buffer),
                    None => (&file).read_to_end(&mut buffer),
                }
                .with_context(|| format!("Failed to read input file: {}", path.display()))?;
            }
            None => {
                let stdin = io::stdin();
                match limit {
                    Some(limit) => stdin.lock().take(limit as u64).read_to_end(&mut buffer),
                    None => stdin.lock().read_to_end(&mut buffer),
                }
                .context("Failed to read from stdin")?;
            }
        }
        Ok(buffer)
    }

    fn convert_command(args: &ConvertArgs, cli: &Cli) -> Result<()> {
        let start_time = std::time::Instant::now();

        let mut request = ConversionRequest::new(&args.input);
        request.source = args.from;
        request.destination = args.to;
        request.report_path = args.report.clone();

        let result = convert(&request)
            .with_context(|| format!("Failed to convert {}", args.input.display()))?;

        match cli.format {
            OutputFormat::Json => {
                let report = ConversionReport::from_result(&args.input, &result);
                println!("{}", report.to_json()?);
            }
            OutputFormat::Text => {
                let origin = match args.from {
                    SourceSelection::Auto => "detected",
                    SourceSelection::Explicit(_) => "requested",
                };
                let choice = if args.to.is_some() { "requested" } else { "selected" };

                println!(
                    "✓ Converted {} -> {}",
                    args.input.display(),
                    result.output_path.display()
                );
                println!("  Source encoding:        {} ({origin})", result.source_encoding);
                println!(
                    "  Destination encoding:   {} ({choice})",
                    result.destination_encoding.label()
                );
                println!(
                    "  Bytes:                  {} -> {}",
                    result.input_bytes, result.output_bytes
                );
                println!("  Replacement characters: {}", result.replacement_count);
                if let Some(report) = &result.report_path {
                    println!("  Report:                 {}", report.display());
                }
                if cli.verbose {
                    eprintln!("Finished in {:?}", start_time.elapsed());
                }
            }
        }

        Ok(())
    }

    fn batch_command(args: &BatchArgs, cli: &Cli) -> Result<()> {
        let extensions = if args.any_extension {
            Vec::new()
        } else {
            args.allow_ext.clone()
        };
        let mut options = BatchOptions::new()
            .with_destination(args.to)
            .with_allowed_extensions(extensions)
            .with_max_input_bytes(args.max_size_mb.saturating_mul(1024 * 1024));
        options.source = args.from;

        let outcomes = run_batch(&args.inputs, &options);

        match cli.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcomes)?),
            OutputFormat::Text => {
                for outcome in &outcomes {
                    match outcome {
                        FileOutcome::Converted {
                            input,
                            output,
                            source_encoding,
                            destination_encoding,
                            replacement_count,
                            ..
                        } => println!(
                            "✓ {} -> {} [{} -> {}, {} replacement characters]",
                            input.display(),
                            output.display(),
                            source_encoding,
                            destination_encoding.label(),
                            replacement_count
                        ),
                        FileOutcome::Rejected { input, reason } => {
                            println!("✗ {}: {}", input.display(), reason)
                        }
                        FileOutcome::Failed { input, error } => {
                            println!("✗ {}: {}", input.display(), error)
                        }
                    }
                }
            }
        }

        if outcomes.iter().any(|outcome| !outcome.is_converted()) {
            std::process::exit(1);
        }

        Ok(())
    }

    fn detect_command(args: &DetectArgs, cli: &Cli) -> Result<()> {
        let data = read_input(args.input.as_ref(), None)?;
        let result = EncodingDetector::new().detect(&data);

        match cli.format {
            OutputFormat::Json => {
                let candidates: Vec<_> = result
                    .candidates
                    .iter()
                    .map(|(codepage, replacements)| {
                        serde_json::json!({
                            "encoding": codepage.name(),
                            "replacement_characters": replacements
                        })
                    })
                    .collect();

                let json = serde_json::json!({
                    "detected_encoding": result.codepage.name(),
                    "replacement_characters": result.replacements,
                    "fallback": result.fallback,
                    "input_bytes": data.len(),
                    "candidates": candidates
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                println!("Detected encoding: {}", result.codepage);
                println!("Replacement characters: {}", result.replacements);
                println!("Input size: {} bytes", data.len());

                if result.fallback {
                    println!("No candidate could be scored; using fallback");
                }

                if args.candidates {
                    println!("\nAll candidates:");
                    for (codepage, replacements) in &result.candidates {
                        println!("  {:8} {}", codepage.name(), replacements);
                    }
                }
            }
        }

        Ok(())
    }

    fn check_command(args: &CheckArgs, cli: &Cli) -> Result<()> {
        let detector = EncodingDetector::new()
            .with_sample_size(args.sample_size)
            .with_threshold(args.threshold);
        let sample = read_input(args.input.as_ref(), Some(args.sample_size))?;
        let passing = detector.plausible_candidates(&sample);
        let plausible = !passing.is_empty();

        match cli.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "plausible": plausible,
                    "sample_bytes": sample.len(),
                    "passing_encodings": passing.iter().map(|cp| cp.name()).collect::<Vec<_>>()
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Text => {
                if plausible {
                    println!(
                        "✓ Looks like EBCDIC ({} of {} code pages decode the sample)",
                        passing.len(),
                        detector.candidates().len()
                    );
                } else {
                    println!("✗ Content does not look like valid EBCDIC data");
                }
            }
        }

        if !plausible {
            std::process::exit(1);
        }

        Ok(())
    }

    fn list_command(args: &ListArgs, cli: &Cli) -> Result<()> {
        if args.destinations {
            match cli.format {
                OutputFormat::Json => {
                    let encodings: Vec<_> = UnicodeEncoding::ALL
                        .iter()
                        .map(|encoding| {
                            serde_json::json!({
                                "name": encoding.name(),
                                "label": encoding.label(),
                                "unit_size": encoding.unit_size(),
                                "bom": encoding.bom().is_some(),
                                "auto_candidate": UnicodeEncoding::CANDIDATES.contains(encoding)
                            })
                        })
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&encodings)?);
                }
                OutputFormat::Text => {
                    println!("Destination encodings ({} total):", UnicodeEncoding::ALL.len());
                    println!();
                    for encoding in UnicodeEncoding::ALL {
                        let auto = if UnicodeEncoding::CANDIDATES.contains(&encoding) {
                            "[auto]"
                        } else {
                            ""
                        };
                        println!("{:12} {}", encoding.name(), auto);
                    }
                }
            }
            return Ok(());
        }

        match cli.format {
            OutputFormat::Json => {
                let codepages: Vec<_> = CodePage::ALL
                    .iter()
                    .map(|codepage| {
                        serde_json::json!({
                            "name": codepage.name(),
                            "id": codepage.id(),
                            "description": codepage.description()
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&codepages)?);
            }
            OutputFormat::Text => {
                println!("Source code pages ({} total, detection order):", CodePage::ALL.len());
                println!();
                for codepage in CodePage::ALL {
                    println!("{:8} {}", codepage.name(), codepage.description());
                }
            }
        }

        Ok(())
    }
}
