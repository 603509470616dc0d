use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(long, help = "The flattener mapping file")]
    pub mapping: PathBuf,

    #[arg(short = 'o', value_name = "FILE", help = "Where to write the flat file")]
    pub output: PathBuf,

    #[arg(
        long = "xmlDocument",
        value_name = "URL",
        help = "The document to flatten instead of the one the mapping names"
    )]
    pub xml_document: Option<String>,

    #[arg(long, value_name = "URL", help = "The schema to use instead of the mapping's")]
    pub schema: Option<String>,

    #[arg(long, help = "Check the document against the schema and log the problems found")]
    pub validate: bool,

    #[arg(long, help = "Field separator, `\\t` for a tab")]
    pub separator: Option<String>,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "More logging (-v info, -vv debug)"
    )]
    pub verbose: u8,
}

const LONG_FLAGS: &[&str] = &[
    "mapping",
    "xmlDocument",
    "schema",
    "validate",
    "separator",
    "verbose",
];

/// Accepts the single-dash spelling of long flags (`-mapping`) next to the usual one.
pub fn normalize_args(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| {
            let Some(text) = arg.to_str() else {
                return arg;
            };
            let flag = text
                .strip_prefix('-')
                .filter(|rest| !rest.starts_with('-'))
                .map(|rest| rest.split_once('=').map_or(rest, |(name, _)| name));
            if flag.is_some_and(|name| LONG_FLAGS.contains(&name)) {
                OsString::from(format!("-{text}"))
            } else {
                arg
            }
        })
        .collect()
}

/// Turns the escapes people type for invisible separators into the characters themselves
pub fn unescape_separator(separator: &str) -> String {
    separator
        .replace("\\t", "\t")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
}
