use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(long, help = "The maker mapping file")]
    pub mapping: PathBuf,

    #[arg(short = 'o', value_name = "FILE", help = "Where to write the XML document")]
    pub output: PathBuf,

    #[arg(
        long,
        value_name = "URLS",
        help = "Comma separated flat files replacing those of the mapping, in order"
    )]
    pub flatfiles: Option<String>,

    #[arg(
        long,
        value_name = "URLS",
        help = "Comma separated dictionaries replacing those of the mapping, in order"
    )]
    pub dictionaries: Option<String>,

    #[arg(long, value_name = "URL", help = "The schema to use instead of the mapping's")]
    pub schema: Option<String>,

    #[arg(
        short,
        long,
        action = clap::ArgAction::Count,
        help = "More logging (-v info, -vv debug)"
    )]
    pub verbose: u8,
}

const LONG_FLAGS: &[&str] = &["mapping", "flatfiles", "dictionaries", "schema", "verbose"];

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

/// Splits a comma separated list of locations, dropping the quotes around each
pub fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|item| item.trim().trim_matches(|c: char| c == '"' || c == '\'').to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_and_flags() {
        let args = [
            "xml-maker",
            "-mapping",
            "m.xml",
            "-o",
            "out.xml",
            "-flatfiles",
            "a.txt,\"b c.txt\"",
        ];
        let cli = Cli::try_parse_from(normalize_args(args.map(OsString::from))).unwrap();
        assert_eq!(cli.mapping, PathBuf::from("m.xml"));
        assert_eq!(split_list(cli.flatfiles.as_deref().unwrap()), ["a.txt", "b c.txt"]);
        assert!(cli.dictionaries.is_none());
        assert_eq!(split_list(" , x ,"), ["x"]);
    }
}
