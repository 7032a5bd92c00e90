use anyhow::{Context, Result};
use tracing::{info, warn};

use f1db::catalog::Catalog;
use f1db::cli::{parse_args, run_main_menu, run_scripts, usage, Prompt, SessionEnd};
use f1db::context::{init_console_logging, SessionContext};
use f1db::download::download_dataset;
use f1db::error::F1dbError;
use f1db::rebuild::{check_inputs, rebuild_database};
use f1db::scripts::ScriptParams;
use f1db::store::Store;
use f1db::Config;

fn rebuild(ctx: &SessionContext) -> Result<()> {
    let report = rebuild_database(ctx).context("rebuilding the database")?;
    info!(tables = report.tables_loaded.len(), rows = report.rows_loaded(), "database rebuilt");
    Ok(())
}

fn download(ctx: &SessionContext) -> Result<()> {
    let _enter = ctx.span().enter();
    let report = download_dataset(ctx.config()).context("downloading the dataset")?;
    println!("Downloaded {} CSV files into '{}'.", report.extracted, ctx.config().csv_dir.display());
    Ok(())
}

/// Make sure a store exists before the session opens. Returns false when the
/// operator declines to create one.
fn ensure_inputs(ctx: &SessionContext, prompt: &mut Prompt) -> Result<bool> {
    match check_inputs(ctx.config()) {
        Ok(()) => Ok(true),
        Err(F1dbError::MissingInput { what: "csv directory", path }) => {
            println!("No CSV files found in '{}'.", path.display());
            if prompt.confirm("Download the CSV files from the source now?")? {
                download(ctx)?;
                rebuild(ctx)?;
                Ok(true)
            } else {
                eprintln!("Place the race-results CSV files in '{}' and try again.", path.display());
                Ok(false)
            }
        }
        Err(F1dbError::MissingInput { what, path }) => {
            println!("The {what} '{}' does not exist.", path.display());
            if prompt.confirm("Rebuild the database now?")? {
                rebuild(ctx)?;
                Ok(true)
            } else {
                Ok(false)
            }
        }
        Err(e) => Err(e.into()),
    }
}

fn main() -> Result<()> {
    let mut argv = std::env::args();
    let program = argv.next().unwrap_or_else(|| "f1db".to_string());
    let args = match parse_args(argv) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}\n\n{}", usage(&program));
            std::process::exit(2);
        }
    };
    if args.help {
        println!("{}", usage(&program));
        return Ok(());
    }

    let _log_guard = init_console_logging(args.verbosity);
    let ctx = SessionContext::new(Config::from_env(), args.verbosity);
    let mut prompt = Prompt::new()?;

    if args.download {
        download(&ctx)?;
        if !args.reload {
            println!("New CSV files downloaded, but -r/--reload was not given; the database still holds the previous data.");
        }
    }
    if args.reload {
        rebuild(&ctx)?;
    } else if !ensure_inputs(&ctx, &mut prompt)? {
        return Ok(());
    }

    let mut first_session = true;
    loop {
        let store = Store::open(&ctx).context("opening the database")?;
        if let Some(startup) = &ctx.config().startup_script {
            if let Err(e) = store.run_script(startup, &ScriptParams::new()) {
                warn!(script = %startup, "startup script failed: {}", e);
            }
        }

        if first_session {
            first_session = false;
            run_scripts(&mut prompt, &store, &args.scripts)?;
            for table in &args.export_tables {
                let summary = store.export_table(table, None).with_context(|| format!("exporting '{table}'"))?;
                println!("Exported {} rows to {}", summary.rows, summary.path.display());
            }
            if args.exit {
                store.close()?;
                return Ok(());
            }
        }

        let mut catalog = match Catalog::load(&store) {
            Ok(c) => c,
            Err(e) => {
                warn!("named queries unavailable: {}", e);
                Catalog::bind(&store, Vec::new())
            }
        };
        let end = run_main_menu(&mut prompt, &store, &mut catalog)?;
        drop(catalog);
        store.close()?;
        match end {
            SessionEnd::Quit => return Ok(()),
            SessionEnd::Rebuild => rebuild(&ctx)?,
        }
    }
}
