//! Compiler driver that orchestrates the multi-stage process of compiling a
//! Little parse tree into target code.

use std::fs;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use log::debug;

use crate::args::{Args, Stage};
use crate::compiler::syntax::Program;
use crate::compiler::{Result, asm, emit, ir, symbols, tree};
use crate::error::Error;

/// Name reported for errors on standard input.
const STDIN: &str = "<stdin>";
/// Name reported for errors on standard output.
const STDOUT: &str = "<stdout>";

/// Executes the compilation pipeline for the parse tree named by `args`,
/// writing the selected stage's output.
///
/// # Errors
///
/// Returns an error if the input cannot be read or deserialized, the output
/// cannot be written, or any compilation phase fails.
pub fn run_compiler(args: &Args) -> Result<()> {
    let src = read_input(args.input().map(PathBuf::as_path))?;
    let program: Program = serde_json::from_str(&src)?;

    debug!("compiling program '{}'", program.ident);

    let writer: Box<dyn Write> = match &args.out_path {
        Some(path) => Box::new(fs::File::create(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?),
        None => Box::new(io::stdout().lock()),
    };

    let out_path = args.out_path.as_deref().unwrap_or_else(|| Path::new(STDOUT));

    compile(&program, args.stage, BufWriter::new(writer), out_path)
}

/// Runs the stages up to `stage` over `program`, writing that stage's output.
/// Nothing is written unless every stage up to `stage` succeeds.
///
/// # Errors
///
/// Returns an error if any compilation phase fails or writing to `writer`
/// fails (reported against `out_path`).
pub fn compile<W: Write>(program: &Program, stage: Stage, mut writer: W, out_path: &Path) -> Result<()> {
    let io_err = |source: io::Error| Error::Io {
        path: out_path.to_path_buf(),
        source,
    };

    let table = symbols::build_scope_table(program)?;

    if stage == Stage::Symbols {
        write!(writer, "{table}").map_err(io_err)?;
        return writer.flush().map_err(io_err);
    }

    let statements = tree::build_statements(program, &table)?;

    if stage == Stage::Tree {
        for stmt in &statements {
            writeln!(writer, "{stmt}").map_err(io_err)?;
        }
        return writer.flush().map_err(io_err);
    }

    let ir = ir::generate_ir(&statements)?;

    if stage == Stage::Ir {
        write!(writer, "{ir}").map_err(io_err)?;
        return writer.flush().map_err(io_err);
    }

    let asm = asm::generate_asm(&ir, &table);

    let written = match stage {
        Stage::Tiny => emit::write_target(&asm, writer),
        _ => emit::write_listing(&table, &ir, &asm, writer),
    };

    written.map_err(io_err)
}

/// Reads the whole input, from `path` or from stdin when `None`.
fn read_input(path: Option<&Path>) -> Result<String> {
    let src = match path {
        Some(path) => fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?,
        None => {
            let mut src = String::new();
            io::stdin()
                .lock()
                .read_to_string(&mut src)
                .map_err(|source| Error::Io {
                    path: PathBuf::from(STDIN),
                    source,
                })?;
            src
        }
    };

    debug!("read {} byte(s) of parse tree", src.len());

    Ok(src)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::fixtures::program;

    const SUM: &str = include_str!("../../demos/sum.json");

    fn run(src: &str, stage: Stage) -> Result<String> {
        let program: Program = serde_json::from_str(src)?;
        let mut out = vec![];
        compile(&program, stage, &mut out, Path::new(STDOUT))?;

        Ok(String::from_utf8(out).expect("output should be UTF-8"))
    }

    #[test]
    fn demo_symbol_report() {
        assert_eq!(
            run(SUM, Stage::Symbols).unwrap(),
            "Symbol table GLOBAL\n\
             name prompt type STRING value \"Enter two numbers\"\n\
             \n\
             name a type INT\n\
             name b type INT\n\
             name total type INT\n\
             name avg type FLOAT\n\
             \n\
             Symbol Table main\n\
             \n\
             Symbol table BLOCK 1\n\
             name big type INT\n\
             \n\
             Symbol table BLOCK 2\n\
             name half type FLOAT\n\
             \n"
        );
    }

    #[test]
    fn demo_ir_listing() {
        assert_eq!(
            run(SUM, Stage::Ir).unwrap(),
            ";IR code\n\
             ;LABEL main\n\
             ;LINK\n\
             ;WRITES prompt\n\
             ;READI a\n\
             ;READI b\n\
             ;STOREI 2 $T1\n\
             ;MULTI b $T1 $T2\n\
             ;ADDI a $T2 $T3\n\
             ;STOREI $T3 total\n\
             ;STOREI 10 $T4\n\
             ;SUBI total $T4 $T5\n\
             ;STOREI $T5 big\n\
             ;WRITEI big\n\
             ;STOREF 2 $T6\n\
             ;DIVF avg $T6 $T7\n\
             ;STOREF $T7 half\n\
             ;WRITEF half\n\
             ;STOREF 1.5 $T8\n\
             ;STOREF $T8 avg\n\
             ;WRITEI total\n\
             ;WRITEF avg\n\
             ;RET\n"
        );
    }

    #[test]
    fn demo_target_code() {
        assert_eq!(
            run(SUM, Stage::Tiny).unwrap(),
            "str prompt \"Enter two numbers\"\n\
             var a\n\
             var b\n\
             var total\n\
             var avg\n\
             var big\n\
             var half\n\
             sys writes prompt\n\
             sys readi a\n\
             sys readi b\n\
             move 2 r1\n\
             move b r2\n\
             muli r1 r2\n\
             move a r3\n\
             addi r2 r3\n\
             move r3 total\n\
             move 10 r4\n\
             move total r5\n\
             subi r4 r5\n\
             move r5 big\n\
             sys writei big\n\
             move 2 r6\n\
             move avg r7\n\
             divr r6 r7\n\
             move r7 half\n\
             sys writer half\n\
             move 1.5 r8\n\
             move r8 avg\n\
             sys writei total\n\
             sys writer avg\n\
             sys halt\n"
        );
    }

    #[test]
    fn full_listing_joins_every_stage() {
        let all = run(SUM, Stage::All).unwrap();
        let expected = format!(
            "{}{}{}\n{}",
            run(SUM, Stage::Symbols).unwrap(),
            run(SUM, Stage::Ir).unwrap(),
            emit::TARGET_MARKER,
            run(SUM, Stage::Tiny).unwrap()
        );

        assert_eq!(all, expected);
    }

    #[test]
    fn tree_stage_prints_one_line_per_statement() {
        let out = run(SUM, Stage::Tree).unwrap();

        // Global string declaration plus nine body statements.
        assert_eq!(out.lines().count(), 10);
    }

    #[test]
    fn declaration_error_writes_nothing() {
        let dup = serde_json::json!({
            "ident": "p",
            "decls": [{ "var": { "ty": "INT", "idents": ["x", "x"] } }]
        });

        let mut out = vec![];
        let err = compile(&program(dup), Stage::All, &mut out, Path::new(STDOUT)).unwrap_err();

        assert!(err.is_declaration_error());
        assert!(out.is_empty());
    }

    #[test]
    fn malformed_tree_is_reported() {
        assert!(matches!(
            run(r#"{ "decls": [] }"#, Stage::All),
            Err(Error::ParseTree(_))
        ));
    }
}
