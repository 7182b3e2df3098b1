//! Global string interner.
//!
//! Every identifier that flows through the compiler (declaration names,
//! member names, struct names) is interned once and compared by the
//! resulting small `Copy` handle rather than by string content. This
//! mirrors the `Symbol`/`Interner` split the teacher crate's entity table
//! is built on, reimplemented here with `hashbrown` since the interner
//! itself lives in a sibling crate that isn't part of this workspace.

use std::fmt;
use std::sync::Mutex;
use hashbrown::HashMap;

/// An interned string. Cheap to copy, compare, and hash. Ordered by the
/// string it names, not by interning id — the declaration table is a
/// `BTreeMap` keyed on `Symbol` and must iterate in `strcmp` order
/// (matching the original's name-keyed BST), not insertion order.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbol(u32);

impl PartialOrd for Symbol {
  fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> { Some(self.cmp(other)) }
}

impl Ord for Symbol {
  fn cmp(&self, other: &Self) -> std::cmp::Ordering { self.as_str().cmp(other.as_str()) }
}

struct Interner {
  map: HashMap<&'static str, Symbol>,
  strings: Vec<&'static str>,
}

impl Interner {
  fn new() -> Self { Self { map: HashMap::new(), strings: Vec::new() } }

  fn intern(&mut self, s: &str) -> Symbol {
    if let Some(&sym) = self.map.get(s) { return sym }
    let s: &'static str = Box::leak(s.to_owned().into_boxed_str());
    let sym = Symbol(self.strings.len() as u32);
    self.strings.push(s);
    self.map.insert(s, sym);
    sym
  }

  fn resolve(&self, sym: Symbol) -> &'static str { self.strings[sym.0 as usize] }
}

static INTERNER: Mutex<Option<Interner>> = Mutex::new(None);

fn with_interner<R>(f: impl FnOnce(&mut Interner) -> R) -> R {
  let mut guard = INTERNER.lock().unwrap_or_else(|e| e.into_inner());
  f(guard.get_or_insert_with(Interner::new))
}

/// Interns `s`, returning a `Symbol` that compares equal for equal strings.
#[must_use] pub fn intern(s: &str) -> Symbol { with_interner(|i| i.intern(s)) }

impl Symbol {
  /// Look up the original string. The returned reference is valid for the
  /// life of the process: interned strings are never freed.
  #[must_use] pub fn as_str(self) -> &'static str { with_interner(|i| i.resolve(self)) }
}

impl fmt::Debug for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:?}", self.as_str()) }
}

impl fmt::Display for Symbol {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn equal_strings_intern_to_equal_symbols() {
    assert_eq!(intern("foo"), intern("foo"));
    assert_ne!(intern("foo"), intern("bar"));
  }

  #[test]
  fn round_trips_through_as_str() {
    let sym = intern("hoisted_local");
    assert_eq!(sym.as_str(), "hoisted_local");
  }
}
