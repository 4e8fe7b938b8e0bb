//! Little Compiler (parse tree to tiny target code).

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::use_self)]
#![allow(clippy::redundant_else)]
#![allow(clippy::too_many_lines)]
#![warn(rust_2018_idioms)]
#![warn(missing_debug_implementations)]

pub mod args;
pub mod compiler;
pub mod error;

use std::process;

use clap::Parser;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args = args::Args::parse();

    if let Err(err) = compiler::driver::run_compiler(&args) {
        // Duplicate declarations are reported on stdout with a clean exit.
        if err.is_declaration_error() {
            println!("{err}");
            process::exit(0);
        }

        report_err!(env!("CARGO_PKG_NAME"), "{err}");
        process::exit(1);
    }
}
