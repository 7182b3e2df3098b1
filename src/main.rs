//! CLI driver: `compiler [-o OUT] [-C CFILE] [--prelude FILE] [-v] SOURCE…`
//!
//! Hand-rolled `std::env::args()` parsing, left-to-right, match-on-
//! leading-dash — the grammar is a handful of cases wide and the teacher
//! crate doesn't pull in `clap` either. `main` is the one place a
//! terminal `Err` becomes a printed diagnostic and a non-zero exit; every
//! library call below this point returns `Result` and propagates with
//! `?`.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use stackc::arena::Arena;
use stackc::ast::{Program, TopLevel};
use stackc::backend::X86Backend;
use stackc::compile::compile_program;
use stackc::diag::{CompileError, CResult};
use stackc::parser::parse_file;

struct Args {
  sources: Vec<PathBuf>,
  out: Option<PathBuf>,
  prelude: Option<PathBuf>,
  verbosity: LevelFilter,
}

fn parse_args() -> CResult<Args> {
  let mut sources = Vec::new();
  let mut out = None;
  let mut prelude = None;
  let mut verbosity = LevelFilter::Info;

  let mut it = std::env::args().skip(1);
  while let Some(arg) = it.next() {
    match arg.as_str() {
      "-o" => {
        let path = it.next().ok_or_else(|| CompileError::fatal("-o requires an argument"))?;
        out = Some(PathBuf::from(path));
      }
      "-C" => {
        // Reserved: parsed and discarded, matching the original's inert
        // -C flag (its open_coutput call is commented out upstream).
        let _ = it.next().ok_or_else(|| CompileError::fatal("-C requires an argument"))?;
      }
      "--prelude" => {
        let path = it.next().ok_or_else(|| CompileError::fatal("--prelude requires an argument"))?;
        prelude = Some(PathBuf::from(path));
      }
      "-v" => verbosity = LevelFilter::Debug,
      "-vv" => verbosity = LevelFilter::Trace,
      s if s.starts_with('-') => {
        return Err(CompileError::fatal(format!("unrecognized option {s}")));
      }
      s => sources.push(PathBuf::from(s)),
    }
  }

  Ok(Args { sources, out, prelude, verbosity })
}

fn init_logger(level: LevelFilter) {
  let config = Config::default();
  if TermLogger::init(level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto).is_err() {
    let _ = simplelog::SimpleLogger::init(level, config);
  }
}

fn read_source(arena: &Arena, path: &PathBuf, decls: &mut Vec<TopLevel<'_>>) -> CResult<()> {
  let bytes = fs::read(path)?;
  let file = Arc::new(path.clone());
  parse_file(arena, file, &bytes, decls)
}

fn run(args: Args) -> CResult<()> {
  let out = args.out.as_ref().ok_or_else(|| CompileError::fatal("missing -o output path"))?;

  let arena = Arena::new();
  let mut decls = Vec::new();

  if let Some(prelude) = &args.prelude {
    log::info!("splicing prelude {}", prelude.display());
    read_source(&arena, prelude, &mut decls)?;
  }
  for src in &args.sources {
    log::info!("parsing {}", src.display());
    read_source(&arena, src, &mut decls)?;
  }

  let program = Program { decls };
  let mut asm = X86Backend::new();
  let bytes = compile_program(&arena, &mut asm, &program)?;

  fs::write(out, &bytes)?;
  #[cfg(unix)]
  {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(out)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(out, perms)?;
  }

  Ok(())
}

fn main() -> ExitCode {
  let args = match parse_args() {
    Ok(a) => a,
    Err(e) => { eprintln!("{e}"); return ExitCode::FAILURE; }
  };
  init_logger(args.verbosity);

  match run(args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("{e}");
      ExitCode::FAILURE
    }
  }
}
