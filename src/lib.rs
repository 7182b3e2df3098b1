//! A self-hosting compiler for a small C-family systems language,
//! targeting x86-64 Linux executables via direct syscalls — no libc, no
//! dynamic linker, no PIE.
//!
//! The pipeline, front to back: [`lexer`] → [`parser`] produce an
//! [`ast::Program`]; [`compile::compile_program`] drives declaration
//! registration ([`decl`]), struct layout, local-variable hoisting
//! ([`hoist`]), and per-function translation ([`translate`]) against the
//! [`asm::Assembler`] trait, whose concrete implementation
//! ([`backend::X86Backend`]) encodes real x86-64 machine code and links
//! a minimal ELF image.

pub mod arena;
pub mod asm;
pub mod ast;
pub mod backend;
pub mod compile;
pub mod decl;
pub mod diag;
pub mod hoist;
pub mod lexer;
pub mod parser;
pub mod prototype;
pub mod symbol;
pub mod translate;
pub mod types;
