//! Target Code Generation
//!
//! Compiler pass that lowers intermediate representation (_IR_) into the
//! register-machine target instruction set.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;

use log::debug;

use crate::compiler::ir::{self, IR};
use crate::compiler::symbols::ScopeTable;
use crate::compiler::tree::BinaryOperator;
use crate::compiler::types::Type;

/// Target program: storage declarations, then code, then `sys halt`.
#[derive(Debug)]
pub struct ASM {
    pub instructions: Vec<Instruction>,
    /// Number of registers used.
    pub registers: usize,
}

impl fmt::Display for ASM {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for inst in &self.instructions {
            writeln!(f, "{inst}")?;
        }

        Ok(())
    }
}

/// Target register, renamed from an _IR_ temporary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Register(pub usize);

impl fmt::Display for Register {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Target operand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Register(Register),
    /// Named storage declared in the program header.
    Var(String),
    /// Numeric constant.
    Imm(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Register(reg) => write!(f, "{reg}"),
            Operand::Var(ident) | Operand::Imm(ident) => write!(f, "{ident}"),
        }
    }
}

/// Typed arithmetic opcode (`i` integer, `r` real).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithOp {
    AddI,
    AddR,
    SubI,
    SubR,
    MulI,
    MulR,
    DivI,
    DivR,
}

impl ArithOp {
    /// Selects the opcode for `op` on values of type `ty`.
    ///
    /// # Panics
    ///
    /// Panics if `ty` is [`Type::String`].
    #[must_use]
    pub fn new(op: BinaryOperator, ty: Type) -> Self {
        match (op, ty) {
            (BinaryOperator::Add, Type::Int) => ArithOp::AddI,
            (BinaryOperator::Add, Type::Float) => ArithOp::AddR,
            (BinaryOperator::Sub, Type::Int) => ArithOp::SubI,
            (BinaryOperator::Sub, Type::Float) => ArithOp::SubR,
            (BinaryOperator::Mul, Type::Int) => ArithOp::MulI,
            (BinaryOperator::Mul, Type::Float) => ArithOp::MulR,
            (BinaryOperator::Div, Type::Int) => ArithOp::DivI,
            (BinaryOperator::Div, Type::Float) => ArithOp::DivR,
            (_, Type::String) => {
                unreachable!("STRING arithmetic is rejected during IR generation")
            }
        }
    }
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opcode = match self {
            ArithOp::AddI => "addi",
            ArithOp::AddR => "addr",
            ArithOp::SubI => "subi",
            ArithOp::SubR => "subr",
            ArithOp::MulI => "muli",
            ArithOp::MulR => "mulr",
            ArithOp::DivI => "divi",
            ArithOp::DivR => "divr",
        };

        write!(f, "{opcode}")
    }
}

/// System call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SysCall {
    ReadI(String),
    ReadR(String),
    WriteI(String),
    WriteR(String),
    WriteS(String),
    Halt,
}

impl fmt::Display for SysCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SysCall::ReadI(ident) => write!(f, "readi {ident}"),
            SysCall::ReadR(ident) => write!(f, "readr {ident}"),
            SysCall::WriteI(ident) => write!(f, "writei {ident}"),
            SysCall::WriteR(ident) => write!(f, "writer {ident}"),
            SysCall::WriteS(ident) => write!(f, "writes {ident}"),
            SysCall::Halt => write!(f, "halt"),
        }
    }
}

/// Target instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// `INT`/`FLOAT` storage declaration.
    Var(String),
    /// `STRING` storage declaration with its value.
    Str { ident: String, literal: String },
    Move { src: Operand, dst: Operand },
    /// `dst = dst op src`.
    Arith {
        op: ArithOp,
        src: Operand,
        dst: Register,
    },
    Sys(SysCall),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Var(ident) => write!(f, "var {ident}"),
            Instruction::Str { ident, literal } => write!(f, "str {ident} {literal}"),
            Instruction::Move { src, dst } => write!(f, "move {src} {dst}"),
            Instruction::Arith { op, src, dst } => write!(f, "{op} {src} {dst}"),
            Instruction::Sys(call) => write!(f, "sys {call}"),
        }
    }
}

/// Renames _IR_ temporaries to registers, numbered in order of first
/// appearance.
#[derive(Debug, Default)]
struct Registers {
    map: HashMap<ir::Temp, Register>,
}

impl Registers {
    fn alias(&mut self, tmp: ir::Temp) -> Register {
        let next = Register(self.map.len() + 1);

        match self.map.entry(tmp) {
            Entry::Occupied(entry) => *entry.get(),
            Entry::Vacant(entry) => *entry.insert(next),
        }
    }

    fn operand(&mut self, op: &ir::Operand) -> Operand {
        match op {
            ir::Operand::Temp(tmp) => Operand::Register(self.alias(*tmp)),
            ir::Operand::Var(ident) => Operand::Var(ident.clone()),
            ir::Operand::Literal(literal) => Operand::Imm(literal.clone()),
        }
    }
}

/// Lowers `ir` into target code. Storage for every name in `table` is
/// declared up front, once per name.
#[must_use]
pub fn generate_asm(ir: &IR, table: &ScopeTable) -> ASM {
    let mut instructions: Vec<Instruction> = table
        .storage()
        .into_iter()
        .map(|sym| match (&sym.ty, &sym.literal) {
            (Type::String, Some(literal)) => Instruction::Str {
                ident: sym.ident.clone(),
                literal: literal.clone(),
            },
            _ => Instruction::Var(sym.ident.clone()),
        })
        .collect();

    let mut registers = Registers::default();

    for inst in &ir.instructions {
        match inst {
            // No target counterpart.
            ir::Instruction::Label(_) | ir::Instruction::Link | ir::Instruction::Ret => {}
            ir::Instruction::Store { src, dst, .. } => {
                let src = registers.operand(src);
                let dst = registers.operand(dst);

                instructions.push(Instruction::Move { src, dst });
            }
            ir::Instruction::Binary {
                op,
                ty,
                lhs,
                rhs,
                dst,
            } => {
                // Two-address form: the left operand is copied into the
                // destination register, which the right operand then updates.
                let lhs = registers.operand(lhs);
                let rhs = registers.operand(rhs);
                let dst = registers.alias(*dst);

                instructions.extend([
                    Instruction::Move {
                        src: lhs,
                        dst: Operand::Register(dst),
                    },
                    Instruction::Arith {
                        op: ArithOp::new(*op, *ty),
                        src: rhs,
                        dst,
                    },
                ]);
            }
            ir::Instruction::Read { ty, ident } => {
                let call = match ty {
                    Type::Int => SysCall::ReadI(ident.clone()),
                    Type::Float => SysCall::ReadR(ident.clone()),
                    Type::String => unreachable!("STRING reads are rejected during IR generation"),
                };

                instructions.push(Instruction::Sys(call));
            }
            ir::Instruction::Write { ty, ident } => {
                let call = match ty {
                    Type::Int => SysCall::WriteI(ident.clone()),
                    Type::Float => SysCall::WriteR(ident.clone()),
                    Type::String => SysCall::WriteS(ident.clone()),
                };

                instructions.push(Instruction::Sys(call));
            }
        }
    }

    instructions.push(Instruction::Sys(SysCall::Halt));

    debug!(
        "generated {} target instruction(s), {} register(s)",
        instructions.len(),
        registers.map.len()
    );

    ASM {
        instructions,
        registers: registers.map.len(),
    }
}
