//! End-to-end scenarios from the external interface spec: full source
//! strings compiled to a linked ELF image and checked for the
//! ELF/program-header invariants a kernel loader would rely on. This
//! suite never invokes a second toolchain or the kernel loader itself —
//! byte-level assertions stand in for "would run and exit N".

use std::io::Read;
use std::sync::Arc;

use byteorder::{ByteOrder, LittleEndian};

use stackc::arena::Arena;
use stackc::ast::Program;
use stackc::backend::X86Backend;
use stackc::compile::compile_program;
use stackc::diag::CResult;
use stackc::parser::parse_file;

fn prelude_src() -> String {
  let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/prelude.lang");
  std::fs::read_to_string(path).expect("demos/prelude.lang must be readable")
}

fn compile_with_prelude(src: &str) -> CResult<Vec<u8>> {
  let arena = Arena::new();
  let mut decls = Vec::new();
  let prelude = prelude_src();
  parse_file(&arena, Arc::new("<prelude>".into()), prelude.as_bytes(), &mut decls)?;
  parse_file(&arena, Arc::new("<test>".into()), src.as_bytes(), &mut decls)?;
  let program = Program { decls };
  let mut asm = X86Backend::new();
  compile_program(&arena, &mut asm, &program)
}

fn assert_elf_header(image: &[u8]) {
  assert_eq!(&image[..4], b"\x7fELF");
  assert_eq!(image[4], 2, "EI_CLASS must be ELFCLASS64");
  assert_eq!(image[5], 1, "EI_DATA must be little-endian");
  let e_type = LittleEndian::read_u16(&image[16..18]);
  assert_eq!(e_type, 2, "e_type must be ET_EXEC");
  let e_machine = LittleEndian::read_u16(&image[18..20]);
  assert_eq!(e_machine, 0x3e, "e_machine must be EM_X86_64");
  let e_entry = LittleEndian::read_u64(&image[24..32]);
  assert!(e_entry >= 0x0040_0000, "entry point must land inside the loaded segment");
}

/// Scenario 1: `main(){} _start(){ exit(42); }`.
#[test]
fn trivial_exit_compiles_to_a_valid_elf_image() {
  let image = compile_with_prelude("main(){} _start(){ exit(42); }").unwrap();
  assert_elf_header(&image);
}

/// Scenario 2: recursive factorial.
#[test]
fn recursive_factorial_compiles() {
  let src = "fact(n: int): int { if n < 2 { return 1; } return n * fact(n - 1); } \
             main(){} _start(){ exit(fact(5)); }";
  let image = compile_with_prelude(src).unwrap();
  assert_elf_header(&image);
}

/// Scenario 3: struct member access.
#[test]
fn struct_member_assignment_compiles() {
  let src = "struct pt { x: int; y: int; } \
             main(){} _start(){ var p: pt; p.x = 3; p.y = 4; exit(p.x + p.y); }";
  let image = compile_with_prelude(src).unwrap();
  assert_elf_header(&image);
}

/// Scenario 4: string indexing and char-to-int cast.
#[test]
fn string_indexing_and_char_cast_compiles() {
  let src = "main(){} _start(){ var s: *byte; s = \"AB\"; exit(s[0] + s[1] - 'A':int - 'A':int); }";
  let image = compile_with_prelude(src).unwrap();
  assert_elf_header(&image);
}

/// Scenario 5: a `loop`/`break` summation.
#[test]
fn loop_with_break_compiles() {
  let src = "main(){} _start(){ var i: int; var s: int; i = 0; s = 0; \
             loop { if i == 10 { break; } s = s + i; i = i + 1; } exit(s); }";
  let image = compile_with_prelude(src).unwrap();
  assert_elf_header(&image);
}

/// Scenario 6: redefining a struct member is fatal.
#[test]
fn duplicate_struct_member_is_rejected() {
  let src = "struct pt { x: int; x: int; } main(){} _start(){ exit(0); }";
  let err = compile_with_prelude(src).unwrap_err();
  assert!(format!("{err}").contains("duplicate member"), "got: {err}");
}

/// Missing `_start` is fatal even if everything else compiles cleanly.
#[test]
fn missing_start_is_rejected() {
  let err = compile_with_prelude("f(): int { return 1; }").unwrap_err();
  assert!(format!("{err}").contains("_start"), "got: {err}");
}

/// Determinism: identical input produces a bytewise identical image —
/// map iteration order, label assignment, and emission order are all
/// deterministic end to end.
#[test]
fn identical_input_compiles_to_identical_bytes() {
  let src = "main(){} _start(){ exit(7); }";
  let a = compile_with_prelude(src).unwrap();
  let b = compile_with_prelude(src).unwrap();
  assert_eq!(a, b);
}

/// The produced image can be written out and marked executable, the way
/// a real build would hand it to the kernel loader. No subprocess is
/// spawned; this only checks the file-mode bit the CLI itself sets.
#[test]
fn image_can_be_written_and_marked_executable() {
  use std::os::unix::fs::PermissionsExt;

  let image = compile_with_prelude("main(){} _start(){ exit(0); }").unwrap();
  let mut file = tempfile::NamedTempFile::new().unwrap();
  std::io::Write::write_all(&mut file, &image).unwrap();

  let mut perms = file.as_file().metadata().unwrap().permissions();
  perms.set_mode(0o755);
  file.as_file().set_permissions(perms).unwrap();

  let mode = file.as_file().metadata().unwrap().permissions().mode();
  assert_eq!(mode & 0o111, 0o111, "file must be executable by owner/group/other");

  let mut reopened = std::fs::File::open(file.path()).unwrap();
  let mut buf = [0u8; 4];
  reopened.read_exact(&mut buf).unwrap();
  assert_eq!(&buf, b"\x7fELF");
}
