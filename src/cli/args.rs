use anyhow::{bail, Result};

use crate::context::Verbosity;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub reload: bool,
    pub download: bool,
    pub verbosity: Verbosity,
    pub scripts: Vec<String>,
    pub export_tables: Vec<String>,
    pub exit: bool,
    pub help: bool,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage:\n  {program} [-d] [-r] [-q | -v] [-s <script>...] [-t <table>...] [-x]\n\nFlags:\n  -d, --download               Replace the CSV files with a fresh copy of the dataset\n  -r, --reload                 Rebuild the database from the CSV files before anything else\n  -q, --quiet                  Only print warnings and errors\n  -v, --verbose                Print debug logging\n  -s, --execute-script <f>...  Run one or more SQL scripts from the scripts directory\n  -t, --export-table <t>...    Export one or more tables to <table>.csv\n  -x, --exit                   Exit after handling the flags instead of opening the menu\n  -h, --help                   Show this help\n\nEnvironment:\n  F1DB_DATABASE, F1DB_CSV_DIR, F1DB_CUSTOM_CSV_DIR, F1DB_SCRIPTS_DIR, F1DB_QUERIES,\n  F1DB_ROW_LIMIT, F1DB_DOWNLOAD_URL, F1DB_OUTPUT=json, RUST_LOG"
    )
}

/// Parse everything after the program name. `-s` and `-t` take every value up
/// to the next flag.
pub fn parse_args<I, S>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = args.into_iter().map(Into::into).collect();
    let mut out = CliArgs::default();
    let mut quiet = false;
    let mut verbose = false;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-d" | "--download" => out.download = true,
            "-r" | "--reload" => out.reload = true,
            "-q" | "--quiet" => quiet = true,
            "-v" | "--verbose" => verbose = true,
            "-x" | "--exit" => out.exit = true,
            "-h" | "--help" => out.help = true,
            flag @ ("-s" | "--execute-script" | "-t" | "--export-table") => {
                let mut values = Vec::new();
                while i + 1 < args.len() && !args[i + 1].starts_with('-') {
                    values.push(args[i + 1].clone());
                    i += 1;
                }
                if values.is_empty() {
                    bail!("{flag} requires at least one value");
                }
                if flag == "-s" || flag == "--execute-script" {
                    out.scripts.extend(values);
                } else {
                    out.export_tables.extend(values);
                }
            }
            other => bail!("unknown argument '{other}'"),
        }
        i += 1;
    }
    if quiet && verbose {
        bail!("--quiet and --verbose cannot be combined");
    }
    out.verbosity = if quiet {
        Verbosity::Quiet
    } else if verbose {
        Verbosity::Verbose
    } else {
        Verbosity::Normal
    };
    Ok(out)
}
