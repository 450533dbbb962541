//! Language collaborators.
//!
//! The engine does not know the syntax or semantics of the language it builds. A language
//! plugs in by implementing [`Parser`], [`Declarer`], [`Lowerer`] and [`Evaluator`]; the
//! [`builder::Builder`] drives them through the import pipeline.
//!
//! Syntax trees and scopes live in arenas owned by the language. The engine only ever holds
//! [`NodeId`] handles and [`SymbolTable`] snapshots.
use crate::runtime::frame::Frame;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod builder;
pub mod filter;

pub use filter::{BuildConstraints, FileFilter};

/// Handle of a node in a language's syntax arena.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for NodeId {
    fn from(index: usize) -> Self {
        Self(index as u32)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Outcome of parsing one source file.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Parsed {
    /// Package clause of the file.
    pub package: String,
    /// Root of the file's syntax tree, `None` for a file without syntactic content.
    pub root: Option<NodeId>,
    /// Import paths referenced by the file, in source order.
    pub imports: Vec<String>,
}

impl Parsed {
    pub fn new(package: impl Into<String>, root: Option<NodeId>) -> Self {
        Self {
            package: package.into(),
            root,
            imports: Vec::new(),
        }
    }

    pub fn with_imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SymbolKind {
    Const,
    Var,
    Func,
    Type,
    Package,
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const => f.write_str("const"),
            Self::Var => f.write_str("var"),
            Self::Func => f.write_str("func"),
            Self::Type => f.write_str("type"),
            Self::Package => f.write_str("package"),
        }
    }
}

/// A top-level declaration of a package.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub kind: SymbolKind,
    /// Declaring node, if any.
    pub node: Option<NodeId>,
    /// Slot in the shared execution frame holding the symbol's value.
    pub slot: Option<usize>,
}

impl Symbol {
    pub fn new(kind: SymbolKind) -> Self {
        Self {
            kind,
            node: None,
            slot: None,
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }
}

/// Global symbols of one package, in declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTable(IndexMap<String, Symbol>);

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, symbol: Symbol) -> Option<Symbol> {
        self.0.insert(name.into(), symbol)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Symbol)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Symbol)> for SymbolTable {
    fn from_iter<T: IntoIterator<Item = (String, Symbol)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Turns source text into a syntax tree.
pub trait Parser {
    /// Parse `source`, named `name` for diagnostics. A parse error is fatal for the file.
    fn parse(&mut self, source: &str, name: &str) -> anyhow::Result<Parsed>;
}

/// The global declaration pass.
pub trait Declarer {
    /// Declare the top-level names of the file rooted at `root`.
    ///
    /// Returns the nodes that could not be declared yet because they reference a name
    /// declared by a sibling file that has not been visited.
    fn declare(
        &mut self,
        root: NodeId,
        sub_path: &str,
        import_path: &str,
    ) -> anyhow::Result<Vec<NodeId>>;

    /// Declare previously pending nodes once more, returning those still unresolved.
    fn redeclare(&mut self, pending: &[NodeId], import_path: &str) -> anyhow::Result<Vec<NodeId>>;

    /// Snapshot of the package scope of `import_path`.
    fn package_symbols(&self, import_path: &str) -> SymbolTable;

    /// Number of global slots declared so far, across all packages.
    fn global_slots(&self) -> usize;
}

/// Control-flow lowering.
pub trait Lowerer {
    /// Lower the file rooted at `root`, returning its initialization routines.
    fn lower(&mut self, root: NodeId, import_path: &str) -> anyhow::Result<Vec<NodeId>>;

    /// Generate the code binding the function values declared by the file at `root`.
    fn wire_entry_points(&mut self, root: NodeId) -> anyhow::Result<()>;

    /// Synthesize one node initializing every global variable of the package.
    fn wire_globals(&mut self, roots: &[NodeId], import_path: &str) -> anyhow::Result<NodeId>;
}

/// Executes lowered nodes.
pub trait Evaluator {
    type Value: Clone + Default + Send;

    fn execute(&mut self, node: NodeId, frame: Option<&Frame<Self::Value>>) -> anyhow::Result<()>;
}

/// Everything the builder needs from a language.
pub trait Language: Parser + Declarer + Lowerer + Evaluator {}

impl<T> Language for T where T: Parser + Declarer + Lowerer + Evaluator {}
