//! Command-line interface: argument parsing, console I/O, and the REPL

pub mod args;
pub mod console;
pub mod repl;

pub use args::CliArgs;
pub use console::Console;
pub use repl::App;
