//! Console front end: flag parsing, menus and table output.

pub mod args;
pub mod menu;
pub mod outputformatter;

pub use args::{parse_args, usage, CliArgs};
pub use menu::{run_main_menu, run_scripts, Prompt, SessionEnd};
pub use outputformatter::print_query_result;
