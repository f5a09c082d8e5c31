use std::fmt;

use indexmap::IndexMap;

use crate::error::SymbolError;

/// Storage class of a declared variable. Each kind has its own index space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Kind {
    Static,
    Field,
    Argument,
    Local,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Static, Kind::Field, Kind::Argument, Kind::Local];

    /// VM memory segment a variable of this kind lives in.
    pub fn segment(self) -> Segment {
        match self {
            Kind::Static => Segment::Static,
            Kind::Field => Segment::This,
            Kind::Argument => Segment::Argument,
            Kind::Local => Segment::Local,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Kind::Static => "static",
            Kind::Field => "field",
            Kind::Argument => "argument",
            Kind::Local => "local",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Segment {
    Constant,
    Argument,
    Local,
    Static,
    This,
    That,
    Pointer,
    Temp,
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Segment::Constant => "constant",
            Segment::Argument => "argument",
            Segment::Local => "local",
            Segment::Static => "static",
            Segment::This => "this",
            Segment::That => "that",
            Segment::Pointer => "pointer",
            Segment::Temp => "temp",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SymbolEntry {
    pub name: String,
    pub ty: String,
    pub kind: Kind,
    pub index: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct Counters {
    statics: usize,
    fields: usize,
    arguments: usize,
    locals: usize,
}

impl Counters {
    fn get_mut(&mut self, kind: Kind) -> &mut usize {
        match kind {
            Kind::Static => &mut self.statics,
            Kind::Field => &mut self.fields,
            Kind::Argument => &mut self.arguments,
            Kind::Local => &mut self.locals,
        }
    }

    fn get(&self, kind: Kind) -> usize {
        match kind {
            Kind::Static => self.statics,
            Kind::Field => self.fields,
            Kind::Argument => self.arguments,
            Kind::Local => self.locals,
        }
    }
}

/// One scope's worth of declarations, kept in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SymbolTable {
    table: IndexMap<String, SymbolEntry>,
    counters: Counters,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears every entry and zeroes all counters.
    pub fn reset(&mut self) {
        self.table.clear();
        self.counters = Counters::default();
    }

    /// Declares `name` and returns the index it was given.
    ///
    /// The index is the number of `kind` entries defined before it. A name
    /// already present in this table is rejected and nothing changes.
    pub fn define(&mut self, name: &str, ty: &str, kind: Kind) -> Result<usize, SymbolError> {
        if self.table.contains_key(name) {
            return Err(SymbolError::AlreadyDefined(name.to_string()));
        }

        let counter = self.counters.get_mut(kind);
        let index = *counter;
        *counter += 1;

        log::debug!("define {} {} {} #{}", kind, ty, name, index);
        self.table.insert(
            name.to_string(),
            SymbolEntry {
                name: name.to_string(),
                ty: ty.to_string(),
                kind,
                index,
            },
        );
        Ok(index)
    }

    pub fn var_count(&self, kind: Kind) -> usize {
        self.counters.get(kind)
    }

    pub fn get(&self, name: &str) -> Option<&SymbolEntry> {
        self.table.get(name)
    }

    fn lookup(&self, name: &str) -> Result<&SymbolEntry, SymbolError> {
        self.get(name)
            .ok_or_else(|| SymbolError::NotFound(name.to_string()))
    }

    pub fn kind_of(&self, name: &str) -> Result<Kind, SymbolError> {
        self.lookup(name).map(|e| e.kind)
    }

    pub fn type_of(&self, name: &str) -> Result<&str, SymbolError> {
        self.lookup(name).map(|e| e.ty.as_str())
    }

    pub fn index_of(&self, name: &str) -> Result<usize, SymbolError> {
        self.lookup(name).map(|e| e.index)
    }

    pub fn entries(&self) -> impl Iterator<Item = &SymbolEntry> {
        self.table.values()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl fmt::Display for SymbolTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for e in self.entries() {
            writeln!(
                f,
                "{:<16} {:<12} {:<9} {:>3}  ({} {})",
                e.name,
                e.ty,
                e.kind,
                e.index,
                e.kind.segment(),
                e.index
            )?;
        }
        Ok(())
    }
}

/// The two tables visible while compiling a subroutine.
#[derive(Clone, Debug, Default)]
pub struct Scopes {
    pub class: SymbolTable,
    pub subroutine: SymbolTable,
}

impl Scopes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks `name` up in the subroutine scope, then in the class scope.
    pub fn resolve(&self, name: &str) -> Option<&SymbolEntry> {
        self.subroutine.get(name).or_else(|| self.class.get(name))
    }
}
