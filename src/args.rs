//! Module for parsing command-line arguments passed to the compiler.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Compiles a serialized parse tree into tiny target code.
#[derive(Parser, Debug)]
#[command(name = "littlec", version, about, long_about = None)]
pub struct Args {
    /// Input file containing the JSON parse tree (use "-" for stdin).
    ///
    /// Defaults to stdin.
    #[arg(value_name = "FILE")]
    pub in_path: Option<PathBuf>,

    /// Compilation phase whose output is written.
    #[arg(short, long, value_enum, default_value_t = Stage::All)]
    pub stage: Stage,

    /// Output file (defaults to stdout).
    #[arg(short, long = "output", value_name = "FILE")]
    pub out_path: Option<PathBuf>,
}

impl Args {
    /// Input path, or `None` when reading from stdin.
    #[inline]
    #[must_use]
    pub fn input(&self) -> Option<&PathBuf> {
        self.in_path.as_ref().filter(|path| path.as_os_str() != "-")
    }
}

/// Compilation phase whose output is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Stage {
    /// Scoped symbol table report
    Symbols,
    /// Statement trees, in post-order
    Tree,
    /// Intermediate representation listing
    Ir,
    /// Target code
    Tiny,
    /// Symbol table report, IR listing, then target code
    All,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_full_listing_on_stdin() {
        let args = Args::try_parse_from(["littlec"]).unwrap();

        assert_eq!(args.stage, Stage::All);
        assert!(args.input().is_none());
        assert!(args.out_path.is_none());
    }

    #[test]
    fn dash_reads_stdin() {
        let args = Args::try_parse_from(["littlec", "-"]).unwrap();

        assert!(args.in_path.is_some());
        assert!(args.input().is_none());
    }

    #[test]
    fn stage_and_output_flags() {
        let args = Args::try_parse_from(["littlec", "-s", "ir", "--output", "out.tiny", "prog.json"])
            .unwrap();

        assert_eq!(args.stage, Stage::Ir);
        assert_eq!(args.out_path, Some(PathBuf::from("out.tiny")));
        assert_eq!(args.input(), Some(&PathBuf::from("prog.json")));
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!(Args::try_parse_from(["littlec", "--stage", "codegen"]).is_err());
    }
}
