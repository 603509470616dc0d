mod cli;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::ExitCode;

use clap::Parser;
use fm_tree::{mapping_location, MakerMapping, TreeError, XmlMaker};

use cli::{normalize_args, split_list, Cli};

/// Replaces the locations of `targets`, in order, by those listed on the command line.
fn override_locations<'a>(
    kind: &str,
    list: &str,
    targets: impl ExactSizeIterator<Item = &'a mut String>,
) {
    let locations = split_list(list);
    if locations.len() != targets.len() {
        log::warn!(
            "{} {kind} given for {} in the mapping",
            locations.len(),
            targets.len()
        );
    }
    for (target, location) in targets.zip(locations) {
        // Locations given on the command line are relative to the working directory
        *target = mapping_location("", &location);
    }
}

fn run(cli: &Cli) -> Result<(), TreeError> {
    let mut mapping = MakerMapping::read(&cli.mapping)?;
    if let Some(list) = &cli.flatfiles {
        let urls = mapping.flat_files.iter_mut().map(|f| &mut f.url);
        override_locations("flat files", list, urls);
    }
    if let Some(list) = &cli.dictionaries {
        let urls = mapping.dictionaries.iter_mut().map(|d| &mut d.url);
        override_locations("dictionaries", list, urls);
    }
    if let Some(schema) = &cli.schema {
        mapping.tree.schema_url = Some(mapping_location("", schema));
    }

    let mut maker = XmlMaker::load(&mapping, Some(&cli.mapping.to_string_lossy()))?;
    if !maker.check() {
        log::warn!("some required nodes get no value, the document may not be valid");
    }

    let mut out = BufWriter::new(File::create(&cli.output)?);
    maker.write(&mut out)?;
    out.flush()?;
    log::info!("document written to {}", cli.output.display());
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
