//! Interactive console menus.
//!
//! Each screen lists numbered items followed by the standard "back" and "exit"
//! entries. Bad selections and recoverable store errors are printed and the
//! screen is shown again; nothing typed at a prompt ends the session except
//! the exit entry or end of input.

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use thiserror::Error;
use tracing::debug;

use crate::catalog::{Catalog, ComputeState};
use crate::cli::outputformatter::print_query_result;
use crate::download::download_dataset;
use crate::error::F1dbError;
use crate::scripts::{ScriptParams, SqlScript};
use crate::store::Store;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("please enter an item number")]
    Empty,
    #[error("this menu only allows you to select one item")]
    MultipleNotAllowed,
    #[error("these selections are not numbers: {}", .0.join(", "))]
    NotANumber(Vec<String>),
    #[error("these selections are not in this menu: {}", .0.join(", "))]
    OutOfRange(Vec<String>),
}

/// Parse a line of 1-based item numbers (space or comma separated) into
/// 0-based indices, in the order typed.
pub fn parse_selection(input: &str, count: usize, multi: bool) -> Result<Vec<usize>, SelectionError> {
    let tokens: Vec<&str> = input.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty()).collect();
    if tokens.is_empty() {
        return Err(SelectionError::Empty);
    }
    if !multi && tokens.len() > 1 {
        return Err(SelectionError::MultipleNotAllowed);
    }
    let bad: Vec<String> = tokens.iter().filter(|t| !t.chars().all(|c| c.is_ascii_digit())).map(|t| t.to_string()).collect();
    if !bad.is_empty() {
        return Err(SelectionError::NotANumber(bad));
    }
    let mut out = Vec::with_capacity(tokens.len());
    let mut outside = Vec::new();
    for t in tokens {
        match t.parse::<usize>() {
            Ok(n) if n >= 1 && n <= count => out.push(n - 1),
            _ => outside.push(t.to_string()),
        }
    }
    if !outside.is_empty() {
        return Err(SelectionError::OutOfRange(outside));
    }
    Ok(out)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Choice {
    Items(Vec<usize>),
    Back,
    Exit,
}

#[derive(Clone, Debug)]
pub struct Menu {
    pub title: String,
    pub items: Vec<String>,
    pub multi: bool,
    pub has_parent: bool,
}

impl Menu {
    pub fn new(title: impl Into<String>, items: Vec<String>, multi: bool, has_parent: bool) -> Self {
        Self { title: title.into(), items, multi, has_parent }
    }

    fn entries(&self) -> Vec<String> {
        let mut all = self.items.clone();
        if self.has_parent {
            all.push("Return to the previous menu.".to_string());
        }
        all.push("Exit the program.".to_string());
        all
    }

    pub fn render(&self) -> Vec<String> {
        let mut lines = vec![self.title.clone(), String::new()];
        for (i, item) in self.entries().iter().enumerate() {
            if i == self.items.len() {
                lines.push(String::new());
            }
            lines.push(format!("{}. {}", i + 1, item));
        }
        lines
    }

    /// Map a selection onto items or the trailing back/exit entries. Picking
    /// back or exit alongside other items acts on the items first.
    pub fn choose(&self, input: &str) -> Result<Choice, SelectionError> {
        let picks = parse_selection(input, self.entries().len(), self.multi)?;
        let n = self.items.len();
        let items: Vec<usize> = picks.iter().copied().filter(|&i| i < n).collect();
        let exit_index = if self.has_parent { n + 1 } else { n };
        if items.is_empty() {
            if picks.contains(&exit_index) {
                return Ok(Choice::Exit);
            }
            return Ok(Choice::Back);
        }
        Ok(Choice::Items(items))
    }
}

/// Line editor wrapper. `None` means the operator closed input.
pub struct Prompt {
    editor: DefaultEditor,
}

impl Prompt {
    pub fn new() -> Result<Self> { Ok(Self { editor: DefaultEditor::new()? }) }

    pub fn line(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = self.editor.add_history_entry(line.as_str());
                }
                Ok(Some(line.trim().to_string()))
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn confirm(&mut self, question: &str) -> Result<bool> {
        loop {
            match self.line(&format!("{question} [y/n]: "))? {
                None => return Ok(false),
                Some(a) if a.eq_ignore_ascii_case("y") || a.eq_ignore_ascii_case("yes") => return Ok(true),
                Some(a) if a.eq_ignore_ascii_case("n") || a.eq_ignore_ascii_case("no") => return Ok(false),
                Some(_) => println!("Please answer y or n."),
            }
        }
    }

    pub fn pause(&mut self) -> Result<()> {
        self.line("Press Enter to continue...")?;
        Ok(())
    }

    /// Show `menu` until a valid selection is made.
    pub fn select(&mut self, menu: &Menu) -> Result<Choice> {
        loop {
            println!();
            for line in menu.render() {
                println!("{line}");
            }
            println!();
            let label = if menu.multi { "Enter your selection(s): " } else { "Enter your selection: " };
            let Some(input) = self.line(label)? else { return Ok(Choice::Exit) };
            match menu.choose(&input) {
                Ok(choice) => return Ok(choice),
                Err(e) => println!("{e}"),
            }
        }
    }

    /// Ask for every placeholder of `script` not already in `params`.
    pub fn fill_params(&mut self, script: &SqlScript, mut params: ScriptParams) -> Result<Option<ScriptParams>> {
        for name in script.missing(&params) {
            let Some(value) = self.line(&format!("Please provide a value for '${name}' in {}: ", script.name()))? else {
                return Ok(None);
            };
            params.insert(name, value);
        }
        Ok(Some(params))
    }
}

/// Why the main menu returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    Quit,
    Rebuild,
}

// Recoverable store errors are shown and the menu carries on.
fn report(result: Result<(), F1dbError>) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(e) if e.is_recoverable() => {
            println!("ERROR ({}): {}", e.code_str(), e);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Run the named scripts in order, prompting for placeholders. A script whose
/// prompts are abandoned is skipped.
pub fn run_scripts(prompt: &mut Prompt, store: &Store, names: &[String]) -> Result<()> {
    for name in names {
        let script = match store.scripts().load(name) {
            Ok(s) => s,
            Err(e) => {
                report(Err(e))?;
                continue;
            }
        };
        let Some(params) = prompt.fill_params(&script, ScriptParams::new())? else { continue };
        report(store.run_script(script.name(), &params))?;
    }
    Ok(())
}

pub fn run_main_menu(prompt: &mut Prompt, store: &Store, catalog: &mut Catalog<'_>) -> Result<SessionEnd> {
    let menu = Menu::new(
        "Main menu.",
        vec![
            "Redownload the raw-data files from the source.".to_string(),
            "Rebuild the database from the raw-data files.".to_string(),
            "Execute a single SELECT statement and print its output.".to_string(),
            "Execute the contents of a SQL script file.".to_string(),
            "Run one or more pre-defined queries against the database.".to_string(),
            "Export a table to a CSV file.".to_string(),
        ],
        false,
        false,
    );
    loop {
        let picks = match prompt.select(&menu)? {
            Choice::Items(picks) => picks,
            Choice::Back | Choice::Exit => return Ok(SessionEnd::Quit),
        };
        for pick in picks {
            debug!(item = pick + 1, "main menu selection");
            match pick {
                0 => {
                    report(download_dataset(store.context().config()).map(|r| {
                        println!("Downloaded {} CSV files. Rebuild the database to load them.", r.extracted);
                    }))?;
                }
                1 => {
                    if prompt.confirm("This deletes and rebuilds the database. Continue?")? {
                        return Ok(SessionEnd::Rebuild);
                    }
                }
                2 => {
                    if let Some(sql) = prompt.line("Enter your SELECT statement: ")? {
                        report(store.query(&sql).map(|res| print_query_result(&res)))?;
                        prompt.pause()?;
                    }
                }
                3 => {
                    if scripts_menu(prompt, store)? == Choice::Exit {
                        return Ok(SessionEnd::Quit);
                    }
                }
                4 => {
                    if queries_menu(prompt, catalog)? == Choice::Exit {
                        return Ok(SessionEnd::Quit);
                    }
                }
                _ => {
                    if let Some(table) = prompt.line("Enter the table name to be exported: ")? {
                        report(store.export_table(&table, None).map(|s| {
                            println!("Exported {} rows to {}", s.rows, s.path.display());
                        }))?;
                    }
                }
            }
        }
    }
}

fn scripts_menu(prompt: &mut Prompt, store: &Store) -> Result<Choice> {
    let config = store.context().config();
    let names: Vec<String> = store.scripts().list()?.into_iter().filter(|n| !config.is_schema_script(n)).collect();
    let menu = Menu::new("Run any of the SQL script files below.", names.clone(), true, true);
    loop {
        match prompt.select(&menu)? {
            Choice::Items(picks) => {
                let chosen: Vec<String> = picks.into_iter().map(|i| names[i].clone()).collect();
                run_scripts(prompt, store, &chosen)?;
            }
            other => return Ok(other),
        }
    }
}

fn queries_menu(prompt: &mut Prompt, catalog: &mut Catalog<'_>) -> Result<Choice> {
    let names: Vec<String> = catalog.names().into_iter().map(String::from).collect();
    let menu = Menu::new("Run any of the pre-defined queries below.", names.clone(), false, true);
    loop {
        match prompt.select(&menu)? {
            Choice::Items(picks) => {
                for i in picks {
                    if query_menu(prompt, catalog, &names[i])? == Choice::Exit {
                        return Ok(Choice::Exit);
                    }
                }
            }
            other => return Ok(other),
        }
    }
}

fn compute(prompt: &mut Prompt, catalog: &mut Catalog<'_>, name: &str) -> Result<()> {
    if catalog.get(name)?.state() == ComputeState::Computed {
        println!("'{name}' is already up to date.");
        return Ok(());
    }
    let mut overrides = ScriptParams::new();
    for param in catalog.missing_parameters(name)? {
        let Some(value) = prompt.line(&format!("Please provide a value for '${param}' in query '{name}': "))? else {
            return Ok(());
        };
        overrides.insert(param, value);
    }
    report(catalog.ensure_computed_with(name, &overrides).map(|_| ()))
}

fn query_menu(prompt: &mut Prompt, catalog: &mut Catalog<'_>, name: &str) -> Result<Choice> {
    let def = catalog.get(name)?.definition().clone();
    let mut items = vec![
        "Run this query to calculate its results table.".to_string(),
        "Export this query's results table to a CSV.".to_string(),
    ];
    items.extend(
        def.visualizations.iter().map(|v| format!("Export the data for the {} chart titled '{}' as a CSV.", v.figure_type, v.title)),
    );
    let menu = Menu::new(name, items, true, true);
    loop {
        let picks = match prompt.select(&menu)? {
            Choice::Items(picks) => picks,
            other => return Ok(other),
        };
        for pick in picks {
            // Every action needs the table, so parameters are asked for up front.
            compute(prompt, catalog, name)?;
            if !catalog.is_computed(name)? {
                continue;
            }
            match pick {
                0 => {}
                1 => report(catalog.export(name, None).map(|s| println!("Exported {} rows to {}", s.rows, s.path.display())))?,
                i => report(catalog.export_visualization(name, i - 2, None).map(|p| println!("Wrote {}", p.display())))?,
            }
        }
    }
}
