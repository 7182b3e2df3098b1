//! §6 Concrete back-end: a direct x86-64 instruction encoder plus an ELF
//! executable writer, grounded on the teacher crate's own
//! `codegen.rs`/`InstSink` (`ArrayVec<u8, 64>` per-instruction buffer,
//! `byteorder` little-endian writes, a minimal hand-rolled ELF header) —
//! but with no MIR/VCode/register-allocation layer in between: the
//! translator drives this encoder's `emit_*` calls directly, one stack
//! machine instruction at a time, exactly as §9 ("Stack evaluation model")
//! calls for.
//!
//! Calling convention: every argument is passed on the stack (no
//! register arguments), pushed by the caller in left-to-right source
//! order so the first parameter ends on top (see §4.5 CALL); the callee
//! addresses its parameters at `[rbp+16]`, `[rbp+24]`, … (`[rbp+8]` is
//! the return address, `[rbp+0]` the caller's saved `rbp`). Locals live
//! at negative, byte-exact offsets from `rbp` as assigned by the hoister.
//! The operand stack used by expression evaluation *is* the machine
//! stack (`rsp`); every `emit_*` that "pushes a value" really does push
//! a qword, and every slot — `byte` included — occupies 8 bytes on the
//! operand stack, narrowed only at `emit_load`/`emit_store` time.

use std::collections::HashMap;

use arrayvec::ArrayVec;
use bitflags::bitflags;
use byteorder::{ByteOrder, LittleEndian};

use crate::asm::{Assembler, BinOp, Label};
use crate::types::Type;

bitflags! {
  /// ELF64 program-header `p_flags`.
  #[derive(Clone, Copy, PartialEq, Eq, Debug)]
  struct PFlags: u32 {
    const X = 1;
    const W = 2;
    const R = 4;
  }
}

/// Where the single `PT_LOAD` segment is based. Matches the teacher's own
/// hardcoded entry point convention (`TEXT_START` in the retrieved
/// snapshot): a fixed low address, no PIE, no dynamic linker.
const TEXT_START: u64 = 0x0040_0000;
const ELF_HEADER_AND_PHDR_SIZE: u64 = 0x78;

/// One recorded stack-machine instruction. The translator never sees
/// this type; it only drives [`Assembler`]'s trait methods. Recording
/// rather than encoding immediately lets [`X86Backend::writeout`] do a
/// standard two-pass assemble: every instruction here has a statically
/// known encoded length (no variable-length optimization, no peephole
/// shrinking — see the module doc), so label addresses can be computed
/// in one forward pass before any bytes are emitted.
#[derive(Clone, Debug)]
enum Instr {
  Num(i64),
  /// Push the address of the `n`th queued string (see `strings`).
  Str(u32),
  Lea(i32),
  Ptr(Label),
  Load(Type),
  Store(Type),
  Call(u32),
  Lcall(Label, u32),
  Ret,
  Preamble(u32, bool),
  Syscall,
  Pop(u32),
  Jmp(Label),
  Jz(Label),
  Neg,
  Not,
  Binop(BinOp),
}

impl Instr {
  /// Fixed encoded length in bytes. See the per-variant `encode` bodies
  /// in [`X86Backend::write_text`] for the actual byte sequences —
  /// these two must be kept in lockstep, which is why both live next to
  /// each other rather than being derived from the emitted buffer.
  fn len(&self) -> u32 {
    match self {
      Instr::Num(_) => 11,             // movabs rax, imm64 (10) + push rax (1)
      Instr::Str(_) => 8,              // lea rax, [rip+disp32] (7) + push rax (1)
      Instr::Lea(_) => 8,              // lea rax, [rbp+disp32] (7) + push rax (1)
      Instr::Ptr(_) => 11,             // movabs rax, imm64 (10) + push rax (1)
      Instr::Load(ty) => if matches!(ty, Type::Byte) { 6 } else { 5 },
      Instr::Store(ty) => if matches!(ty, Type::Byte) { 5 } else { 6 },
      Instr::Call(_) => 3,             // pop rax ; call rax  (1 + 2)
      Instr::Lcall(..) => 5,           // call rel32
      Instr::Ret => 3,                 // pop rax ; leave ; ret
      Instr::Preamble(..) => 11,       // push rbp(1) ; mov rbp,rsp(3) ; sub rsp,imm32(7)
      Instr::Syscall => 7 * 7 + 2 + 1, // 7x mov r, [rbp+disp32] (7 bytes) + syscall(2) + push rax(1)
      Instr::Pop(n) => *n,             // n x `pop rax`
      Instr::Jmp(_) => 5,              // jmp rel32
      Instr::Jz(_) => 10,              // pop rax(1); test rax,rax(3); jz rel32(2+4)
      Instr::Neg => 5,                 // pop rax(1); neg rax(3); push rax(1)
      Instr::Not => 5,                 // pop rax(1); not rax(3); push rax(1)
      Instr::Binop(op) => binop_len(*op),
    }
  }
}

/// `pop rax; pop rcx` (2) + the operator itself + the result push(es).
/// Comparisons additionally synthesize a 0/1 boolean via `setcc`+`movzx`
/// rather than leaving raw flags, so they're longer than the arithmetic
/// ops.
fn binop_len(op: BinOp) -> u32 {
  match op {
    BinOp::Add | BinOp::Sub | BinOp::BitAnd | BinOp::BitOr | BinOp::Xor => 2 + 3 + 1,
    BinOp::Mul => 2 + 4 + 1,
    BinOp::Div | BinOp::Mod => 2 + 2 + 3 + 1,
    BinOp::Lsh | BinOp::Rsh => 2 + 3 + 1,
    BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne => 2 + 3 + 3 + 4 + 1,
  }
}

/// In-progress records for `RecordingAssembler`'s sibling: the real
/// encoder. Implements [`Assembler`] by appending to `instrs` and
/// deferring all address resolution to [`X86Backend::writeout`].
pub struct X86Backend {
  instrs: Vec<Instr>,
  strings: Vec<Vec<u8>>,
  next_label: u32,
  fixed: HashMap<Label, ()>,
  /// Resolved once `writeout` runs; `None` beforehand.
  addr: HashMap<Label, u64>,
  /// The emit position (in instruction-index terms) each label was fixed
  /// at — resolved to a byte address in `writeout`'s layout pass.
  fixup_at: HashMap<Label, usize>,
}

impl Default for X86Backend {
  fn default() -> Self { Self::new() }
}

impl X86Backend {
  #[must_use] pub fn new() -> Self {
    X86Backend {
      instrs: Vec::new(), strings: Vec::new(), next_label: 0,
      fixed: HashMap::new(), addr: HashMap::new(), fixup_at: HashMap::new(),
    }
  }

  fn text_len(&self) -> u64 { self.instrs.iter().map(|i| u64::from(i.len())).sum() }

  /// First pass: walk `instrs` once, assigning every fixed label the
  /// byte offset (from `TEXT_START`) of the instruction at which it was
  /// fixed.
  fn layout(&mut self) {
    let mut offset = 0u64;
    let mut fixups_by_index: Vec<(usize, Label)> =
      self.fixup_at.iter().map(|(&l, &idx)| (idx, l)).collect();
    fixups_by_index.sort_unstable_by_key(|&(idx, _)| idx);
    let mut next_fixup = fixups_by_index.into_iter().peekable();
    for (i, instr) in self.instrs.iter().enumerate() {
      while let Some(&(idx, label)) = next_fixup.peek() {
        if idx != i { break }
        self.addr.insert(label, TEXT_START + offset);
        next_fixup.next();
      }
      offset += u64::from(instr.len());
    }
    while let Some((_, label)) = next_fixup.next() {
      self.addr.insert(label, TEXT_START + offset);
    }
  }

  fn string_addr(&self, text_len: u64, idx: u32) -> u64 {
    let base = TEXT_START + text_len;
    self.strings[..idx as usize].iter().map(|s| (s.len() + 1) as u64).sum::<u64>() + base
  }
}

impl Assembler for X86Backend {
  fn mklabel(&mut self) -> Label {
    let l = Label(self.next_label);
    self.next_label += 1;
    l
  }

  fn fixup_label(&mut self, l: Label) {
    debug_assert!(!self.fixed.contains_key(&l), "label fixed twice");
    self.fixed.insert(l, ());
    self.fixup_at.insert(l, self.instrs.len());
  }

  fn is_fixed(&self, l: Label) -> bool { self.fixed.contains_key(&l) }

  fn emit_num(&mut self, n: i64) { self.instrs.push(Instr::Num(n)); }

  fn emit_str(&mut self, bytes: &[u8]) {
    let idx = u32::try_from(self.strings.len()).expect("too many string literals");
    self.strings.push(bytes.to_vec());
    self.instrs.push(Instr::Str(idx));
  }

  fn emit_lea(&mut self, offset: i32) { self.instrs.push(Instr::Lea(offset)); }
  fn emit_ptr(&mut self, l: Label) { self.instrs.push(Instr::Ptr(l)); }
  fn emit_load(&mut self, ty: &Type) { self.instrs.push(Instr::Load(ty.clone())); }
  fn emit_store(&mut self, ty: &Type) { self.instrs.push(Instr::Store(ty.clone())); }
  fn emit_call(&mut self, argc: u32) { self.instrs.push(Instr::Call(argc)); }
  fn emit_lcall(&mut self, l: Label, argc: u32) { self.instrs.push(Instr::Lcall(l, argc)); }
  fn emit_ret(&mut self) { self.instrs.push(Instr::Ret); }
  fn emit_preamble(&mut self, frame_bytes: u32, is_entry: bool) {
    self.instrs.push(Instr::Preamble(frame_bytes, is_entry));
  }
  fn emit_syscall(&mut self) { self.instrs.push(Instr::Syscall); }
  fn emit_pop(&mut self, count: u32) { self.instrs.push(Instr::Pop(count)); }
  fn emit_jmp(&mut self, l: Label) { self.instrs.push(Instr::Jmp(l)); }
  fn emit_jz(&mut self, l: Label) { self.instrs.push(Instr::Jz(l)); }
  fn emit_neg(&mut self) { self.instrs.push(Instr::Neg); }
  fn emit_not(&mut self) { self.instrs.push(Instr::Not); }
  fn emit_binop(&mut self, op: BinOp) { self.instrs.push(Instr::Binop(op)); }

  #[allow(clippy::too_many_lines)]
  fn writeout(&mut self, entry: Label) -> Vec<u8> {
    self.layout();
    let text_len = self.text_len();

    let mut text = Vec::with_capacity(text_len as usize);
    let mut offset = 0u64;
    let instrs = self.instrs.clone();
    for instr in &instrs {
      let mut buf: ArrayVec<u8, 64> = ArrayVec::new();
      encode(instr, &self.addr, offset, &mut buf, |idx| self.string_addr(text_len, idx));
      text.extend_from_slice(&buf);
      offset += u64::from(instr.len());
    }
    debug_assert_eq!(text.len() as u64, text_len);

    let mut rodata = Vec::new();
    for s in &self.strings {
      rodata.extend_from_slice(s);
      rodata.push(0);
    }

    let entry_addr = *self.addr.get(&entry).expect("entry label never fixed");

    let mut out = Vec::with_capacity((ELF_HEADER_AND_PHDR_SIZE as usize) + text.len() + rodata.len());
    write_elf_header(&mut out, entry_addr, text_len + rodata.len() as u64);
    out.extend_from_slice(&text);
    out.extend_from_slice(&rodata);
    out
  }
}

fn write_elf_header(out: &mut Vec<u8>, entry: u64, image_len: u64) {
  out.extend_from_slice(&[
    0x7f, b'E', b'L', b'F', 2, 1, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0,
  ]);
  let mut tmp = [0u8; 8];
  LittleEndian::write_u16(&mut tmp[..2], 2); out.extend_from_slice(&tmp[..2]); // e_type = ET_EXEC
  LittleEndian::write_u16(&mut tmp[..2], 0x3e); out.extend_from_slice(&tmp[..2]); // e_machine = x86-64
  LittleEndian::write_u32(&mut tmp[..4], 1); out.extend_from_slice(&tmp[..4]); // e_version
  LittleEndian::write_u64(&mut tmp, entry); out.extend_from_slice(&tmp); // e_entry
  LittleEndian::write_u64(&mut tmp, 0x40); out.extend_from_slice(&tmp); // e_phoff
  LittleEndian::write_u64(&mut tmp, 0); out.extend_from_slice(&tmp); // e_shoff
  LittleEndian::write_u32(&mut tmp[..4], 0); out.extend_from_slice(&tmp[..4]); // e_flags
  LittleEndian::write_u16(&mut tmp[..2], 0x40); out.extend_from_slice(&tmp[..2]); // e_ehsize
  LittleEndian::write_u16(&mut tmp[..2], 0x38); out.extend_from_slice(&tmp[..2]); // e_phentsize
  LittleEndian::write_u16(&mut tmp[..2], 1); out.extend_from_slice(&tmp[..2]); // e_phnum
  LittleEndian::write_u16(&mut tmp[..2], 0x40); out.extend_from_slice(&tmp[..2]); // e_shentsize
  LittleEndian::write_u16(&mut tmp[..2], 0); out.extend_from_slice(&tmp[..2]); // e_shnum
  LittleEndian::write_u16(&mut tmp[..2], 0); out.extend_from_slice(&tmp[..2]); // e_shstrndx

  let flags = (PFlags::R | PFlags::W | PFlags::X).bits();
  LittleEndian::write_u32(&mut tmp[..4], 1); out.extend_from_slice(&tmp[..4]); // p_type = PT_LOAD
  LittleEndian::write_u32(&mut tmp[..4], flags); out.extend_from_slice(&tmp[..4]); // p_flags
  LittleEndian::write_u64(&mut tmp, ELF_HEADER_AND_PHDR_SIZE); out.extend_from_slice(&tmp); // p_offset
  LittleEndian::write_u64(&mut tmp, TEXT_START + ELF_HEADER_AND_PHDR_SIZE); out.extend_from_slice(&tmp); // p_vaddr
  LittleEndian::write_u64(&mut tmp, 0); out.extend_from_slice(&tmp); // p_paddr
  LittleEndian::write_u64(&mut tmp, image_len); out.extend_from_slice(&tmp); // p_filesz
  LittleEndian::write_u64(&mut tmp, image_len); out.extend_from_slice(&tmp); // p_memsz
  LittleEndian::write_u64(&mut tmp, 0x1000); out.extend_from_slice(&tmp); // p_align
  debug_assert_eq!(out.len() as u64, ELF_HEADER_AND_PHDR_SIZE);
}

/// Encode one [`Instr`] into `buf`. `rip` is this instruction's own
/// address (for rip-relative string loads); `addr` resolves labels.
fn encode(
  instr: &Instr, addr: &HashMap<Label, u64>, offset: u64, buf: &mut ArrayVec<u8, 64>,
  string_addr: impl Fn(u32) -> u64,
) {
  match instr {
    Instr::Num(n) => { movabs_rax(buf, *n as u64); push_rax(buf); }
    Instr::Str(idx) => {
      let target = string_addr(*idx);
      let rip_after = TEXT_START + offset + 7;
      let disp = (target as i64 - rip_after as i64) as i32;
      buf.extend([0x48, 0x8d, 0x05]);
      buf.extend(disp.to_le_bytes());
      push_rax(buf);
    }
    Instr::Lea(disp) => {
      buf.extend([0x48, 0x8d, 0x85]);
      buf.extend(disp.to_le_bytes());
      push_rax(buf);
    }
    Instr::Ptr(l) => { movabs_rax(buf, addr[l]); push_rax(buf); }
    Instr::Load(ty) => {
      pop_into(buf, 0); // rax = address
      if matches!(ty, Type::Byte) {
        buf.extend([0x48, 0x0f, 0xb6, 0x00]); // movzx rax, byte [rax]
      } else {
        buf.extend([0x48, 0x8b, 0x00]); // mov rax, [rax]
      }
      push_rax(buf);
    }
    Instr::Store(ty) => {
      pop_into(buf, 0); // address
      pop_into(buf, 3); // value -> rbx
      if matches!(ty, Type::Byte) {
        buf.extend([0x88, 0x18]); // mov [rax], bl
      } else {
        buf.extend([0x48, 0x89, 0x18]); // mov [rax], rbx
      }
      push_rbx(buf);
    }
    Instr::Call(_) => {
      pop_into(buf, 0); // callee address
      buf.extend([0xff, 0xd0]); // call rax
    }
    Instr::Lcall(l, _) => {
      let target = addr[l];
      let rip_after = TEXT_START + offset + 5;
      let disp = (target as i64 - rip_after as i64) as i32;
      buf.push(0xe8);
      buf.extend(disp.to_le_bytes());
    }
    Instr::Ret => {
      pop_into(buf, 0); // return value -> rax
      buf.push(0xc9); // leave (mov rsp,rbp; pop rbp)
      buf.push(0xc3); // ret
    }
    Instr::Preamble(frame_bytes, _is_entry) => {
      buf.push(0x55); // push rbp
      buf.extend([0x48, 0x89, 0xe5]); // mov rbp, rsp
      buf.extend([0x48, 0x81, 0xec]); // sub rsp, imm32
      buf.extend(frame_bytes.to_le_bytes());
    }
    Instr::Syscall => {
      // The 7 operands (n, a1..a6) are this stub's own parameters, laid
      // out by the caller at [rbp+16], [rbp+24], ... — not on the
      // operand stack, since `emit_preamble` already established a
      // fresh frame. Raw syscall ABI: rax=n, rdi=a1, rsi=a2, rdx=a3,
      // r10=a4, r8=a5, r9=a6.
      mov_reg_from_rbp(buf, Reg::Rax, 16);
      mov_reg_from_rbp(buf, Reg::Rdi, 24);
      mov_reg_from_rbp(buf, Reg::Rsi, 32);
      mov_reg_from_rbp(buf, Reg::Rdx, 40);
      mov_reg_from_rbp(buf, Reg::R10, 48);
      mov_reg_from_rbp(buf, Reg::R8, 56);
      mov_reg_from_rbp(buf, Reg::R9, 64);
      buf.extend([0x0f, 0x05]); // syscall
      push_rax(buf);
    }
    Instr::Pop(n) => { for _ in 0..*n { buf.push(0x58); } }
    Instr::Jmp(l) => {
      let target = addr[l];
      let rip_after = TEXT_START + offset + 5;
      let disp = (target as i64 - rip_after as i64) as i32;
      buf.push(0xe9);
      buf.extend(disp.to_le_bytes());
    }
    Instr::Jz(l) => {
      pop_into(buf, 0);
      buf.extend([0x48, 0x85, 0xc0]); // test rax, rax
      let target = addr[l];
      let rip_after = TEXT_START + offset + instr.len() as u64;
      let disp = (target as i64 - rip_after as i64) as i32;
      buf.extend([0x0f, 0x84]);
      buf.extend(disp.to_le_bytes());
    }
    Instr::Neg => { pop_into(buf, 0); buf.extend([0x48, 0xf7, 0xd8]); push_rax(buf); }
    Instr::Not => { pop_into(buf, 0); buf.extend([0x48, 0xf7, 0xd0]); push_rax(buf); }
    Instr::Binop(op) => encode_binop(*op, buf),
  }
}

fn movabs_rax(buf: &mut ArrayVec<u8, 64>, n: u64) {
  buf.extend([0x48, 0xb8]);
  buf.extend(n.to_le_bytes());
}

fn push_rax(buf: &mut ArrayVec<u8, 64>) { buf.push(0x50); }
fn push_rbx(buf: &mut ArrayVec<u8, 64>) { buf.push(0x53); }

/// `pop` into one of the low eight GPRs (`reg` 0=rax, 3=rbx, ...).
fn pop_into(buf: &mut ArrayVec<u8, 64>, reg: u8) { buf.push(0x58 + reg); }

/// The six syscall-argument registers, addressed by `Instr::Syscall`'s
/// `mov reg, [rbp+disp32]` loads.
#[derive(Clone, Copy)]
enum Reg { Rax, Rdi, Rsi, Rdx, R10, R8, R9 }

/// `mov reg, [rbp+disp32]`. `r10`/`r8`/`r9` need REX.R to extend the
/// ModRM reg field into the high GPR half.
fn mov_reg_from_rbp(buf: &mut ArrayVec<u8, 64>, reg: Reg, disp: i32) {
  let (rex, modrm) = match reg {
    Reg::Rax => (0x48, 0x85),
    Reg::Rdi => (0x48, 0xbd),
    Reg::Rsi => (0x48, 0xb5),
    Reg::Rdx => (0x48, 0x95),
    Reg::R10 => (0x4c, 0x95),
    Reg::R8 => (0x4c, 0x85),
    Reg::R9 => (0x4c, 0x8d),
  };
  buf.extend([rex, 0x8b, modrm]);
  buf.extend(disp.to_le_bytes());
}

/// `pop rax; pop rcx; <op> rax, rcx; push rax` (or `rdx` for `Mod`) —
/// left operand ends on top per §4.5's evaluation order, so it comes off
/// first into `rax`. The right operand goes into `rcx` rather than `rbx`
/// so the shift count is already in `cl` with no extra move.
fn encode_binop(op: BinOp, buf: &mut ArrayVec<u8, 64>) {
  pop_into(buf, 0);
  pop_into(buf, 1);
  match op {
    BinOp::Add => { buf.extend([0x48, 0x01, 0xc8]); push_rax(buf); }      // add rax, rcx
    BinOp::Sub => { buf.extend([0x48, 0x29, 0xc8]); push_rax(buf); }      // sub rax, rcx
    BinOp::Mul => { buf.extend([0x48, 0x0f, 0xaf, 0xc1]); push_rax(buf); } // imul rax, rcx
    BinOp::Div => {
      buf.extend([0x48, 0x99]);       // cqo: sign-extend rax into rdx:rax
      buf.extend([0x48, 0xf7, 0xf9]); // idiv rcx
      push_rax(buf);
    }
    BinOp::Mod => {
      buf.extend([0x48, 0x99]);       // cqo
      buf.extend([0x48, 0xf7, 0xf9]); // idiv rcx
      buf.push(0x52);                 // push rdx (remainder)
    }
    BinOp::Lsh => { buf.extend([0x48, 0xd3, 0xe0]); push_rax(buf); } // shl rax, cl
    BinOp::Rsh => { buf.extend([0x48, 0xd3, 0xf8]); push_rax(buf); } // sar rax, cl
    BinOp::BitAnd => { buf.extend([0x48, 0x21, 0xc8]); push_rax(buf); } // and rax, rcx
    BinOp::BitOr => { buf.extend([0x48, 0x09, 0xc8]); push_rax(buf); }  // or rax, rcx
    BinOp::Xor => { buf.extend([0x48, 0x31, 0xc8]); push_rax(buf); }    // xor rax, rcx
    BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge | BinOp::Eq | BinOp::Ne => {
      buf.extend([0x48, 0x39, 0xc8]); // cmp rax, rcx
      let setcc = match op {
        BinOp::Lt => 0x9c,
        BinOp::Gt => 0x9f,
        BinOp::Le => 0x9e,
        BinOp::Ge => 0x9d,
        BinOp::Eq => 0x94,
        BinOp::Ne => 0x95,
        _ => unreachable!(),
      };
      buf.extend([0x0f, setcc, 0xc0]);       // setcc al
      buf.extend([0x48, 0x0f, 0xb6, 0xc0]);  // movzx rax, al
      push_rax(buf);
    }
  }
}

/// A trace-recording `Assembler` double used by unit tests across the
/// core: it substitutes for [`X86Backend`] so the translator, hoister,
/// and declaration-table logic can be exercised without decoding real
/// machine code.
pub struct RecordingAssembler {
  pub trace: Vec<String>,
  next_label: u32,
  fixed: std::collections::HashSet<Label>,
}

impl Default for RecordingAssembler {
  fn default() -> Self { Self::new() }
}

impl RecordingAssembler {
  #[must_use] pub fn new() -> Self {
    RecordingAssembler { trace: Vec::new(), next_label: 0, fixed: std::collections::HashSet::new() }
  }
}

impl Assembler for RecordingAssembler {
  fn mklabel(&mut self) -> Label {
    let l = Label(self.next_label);
    self.next_label += 1;
    l
  }
  fn fixup_label(&mut self, l: Label) {
    debug_assert!(!self.fixed.contains(&l), "label fixed twice");
    self.fixed.insert(l);
    self.trace.push(format!("fixup {l:?}"));
  }
  fn is_fixed(&self, l: Label) -> bool { self.fixed.contains(&l) }
  fn emit_num(&mut self, n: i64) { self.trace.push(format!("num {n}")); }
  fn emit_str(&mut self, bytes: &[u8]) { self.trace.push(format!("str {bytes:?}")); }
  fn emit_lea(&mut self, offset: i32) { self.trace.push(format!("lea {offset}")); }
  fn emit_ptr(&mut self, l: Label) { self.trace.push(format!("ptr {l:?}")); }
  fn emit_load(&mut self, ty: &Type) { self.trace.push(format!("load {ty:?}")); }
  fn emit_store(&mut self, ty: &Type) { self.trace.push(format!("store {ty:?}")); }
  fn emit_call(&mut self, argc: u32) { self.trace.push(format!("call {argc}")); }
  fn emit_lcall(&mut self, l: Label, argc: u32) { self.trace.push(format!("lcall {l:?} {argc}")); }
  fn emit_ret(&mut self) { self.trace.push("ret".into()); }
  fn emit_preamble(&mut self, frame_bytes: u32, is_entry: bool) {
    self.trace.push(format!("preamble {frame_bytes} {is_entry}"));
  }
  fn emit_syscall(&mut self) { self.trace.push("syscall".into()); }
  fn emit_pop(&mut self, count: u32) { self.trace.push(format!("pop {count}")); }
  fn emit_jmp(&mut self, l: Label) { self.trace.push(format!("jmp {l:?}")); }
  fn emit_jz(&mut self, l: Label) { self.trace.push(format!("jz {l:?}")); }
  fn emit_neg(&mut self) { self.trace.push("neg".into()); }
  fn emit_not(&mut self) { self.trace.push("not".into()); }
  fn emit_binop(&mut self, op: BinOp) { self.trace.push(format!("binop {op:?}")); }
  fn writeout(&mut self, entry: Label) -> Vec<u8> {
    self.trace.push(format!("writeout {entry:?}"));
    Vec::new()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn elf_header_starts_with_the_magic_bytes() {
    let mut asm = X86Backend::new();
    let entry = asm.mklabel();
    asm.fixup_label(entry);
    asm.emit_ret();
    let image = asm.writeout(entry);
    assert_eq!(&image[..4], b"\x7fELF");
    assert_eq!(image[4], 2); // EI_CLASS = 64-bit
    assert_eq!(image[5], 1); // EI_DATA = little-endian
  }

  #[test]
  fn entry_point_matches_the_fixed_label_address() {
    let mut asm = X86Backend::new();
    asm.emit_num(1); // padding before the entry so the address isn't TEXT_START
    let entry = asm.mklabel();
    asm.fixup_label(entry);
    asm.emit_ret();
    let image = asm.writeout(entry);
    let e_entry = LittleEndian::read_u64(&image[24..32]);
    assert_eq!(e_entry, TEXT_START + u64::from(Instr::Num(1).len()));
  }

  #[test]
  fn recording_assembler_traces_every_call_in_order() {
    let mut asm = RecordingAssembler::new();
    let l = asm.mklabel();
    asm.emit_num(42);
    asm.fixup_label(l);
    asm.emit_ret();
    assert_eq!(asm.trace, vec!["num 42", format!("fixup {l:?}"), "ret".to_string()]);
  }

  #[test]
  #[should_panic(expected = "label fixed twice")]
  fn fixing_a_label_twice_panics() {
    let mut asm = RecordingAssembler::new();
    let l = asm.mklabel();
    asm.fixup_label(l);
    asm.fixup_label(l);
  }
}
