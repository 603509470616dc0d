mod cli;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use fm_tree::{mapping_location, Flattener, FlattenerMapping, TreeConfig, TreeError};

use cli::{normalize_args, unescape_separator, Cli};

fn run(cli: &Cli) -> Result<(), TreeError> {
    let mut mapping = FlattenerMapping::read(&cli.mapping)?;
    // Locations given on the command line are relative to the working directory
    if let Some(document) = &cli.xml_document {
        mapping.document_url = Some(mapping_location("", document));
    }
    if let Some(schema) = &cli.schema {
        mapping.schema_url = Some(mapping_location("", schema));
    }
    if let Some(separator) = &cli.separator {
        mapping.separator = unescape_separator(separator);
    }

    let config = TreeConfig {
        validate_document: cli.validate,
        ..TreeConfig::flattener()
    };
    let mut flattener = Flattener::new(config);
    flattener.load_mapping(&mapping, Some(&cli.mapping.to_string_lossy()))?;
    for problem in flattener.validation_errors() {
        log::error!("{problem}");
    }

    let mut out = BufWriter::new(File::create(&cli.output)?);
    flattener.write(&mut out)?;
    out.flush()?;
    log::info!("flat file written to {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse_from(normalize_args(std::env::args_os())) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::from(2)
        }
    }
}
