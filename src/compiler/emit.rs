//! Code Emission
//!
//! Compiler pass that writes textual output for each pipeline stage.

use std::io::{self, Write};

use crate::compiler::asm::ASM;
use crate::compiler::ir::IR;
use crate::compiler::symbols::ScopeTable;

/// Marker line preceding target code in the full listing.
pub const TARGET_MARKER: &str = ";tiny code";

/// Writes target code, one instruction per line.
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_target<W: Write>(asm: &ASM, mut writer: W) -> io::Result<()> {
    for inst in &asm.instructions {
        writeln!(writer, "{inst}")?;
    }

    writer.flush()
}

/// Writes the full listing: symbol table report, _IR_ listing, then target
/// code after [`TARGET_MARKER`].
///
/// # Errors
///
/// Returns an error if writing to `writer` fails.
pub fn write_listing<W: Write>(
    table: &ScopeTable,
    ir: &IR,
    asm: &ASM,
    mut writer: W,
) -> io::Result<()> {
    write!(writer, "{table}{ir}")?;
    writeln!(writer, "{TARGET_MARKER}")?;

    write_target(asm, writer)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::compiler::asm::generate_asm;
    use crate::compiler::fixtures::{assign, main_program, var};
    use crate::compiler::ir::generate_ir;
    use crate::compiler::symbols::build_scope_table;
    use crate::compiler::tree::build_statements;

    #[test]
    fn listing_sections_in_order() {
        let program = main_program(json!([var("INT", &["x"])]), json!([assign("x", &["5"])]));
        let table = build_scope_table(&program).unwrap();
        let ir = generate_ir(&build_statements(&program, &table).unwrap()).unwrap();
        let asm = generate_asm(&ir, &table);

        let mut out = vec![];
        write_listing(&table, &ir, &asm, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Symbol table GLOBAL\n\
             name x type INT\n\
             \n\
             Symbol Table main\n\
             \n\
             ;IR code\n\
             ;LABEL main\n\
             ;LINK\n\
             ;STOREI 5 $T1\n\
             ;STOREI $T1 x\n\
             ;RET\n\
             ;tiny code\n\
             var x\n\
             move 5 r1\n\
             move r1 x\n\
             sys halt\n"
        );
    }
}
