//! A toy language exercising every collaborator trait.
//!
//! One declaration per line:
//!
//! ```text
//! package main
//! import "example.com/lib"
//! var x = 1
//! var y = x
//! var z = lib.answer
//! func init
//! func main
//! ```
//!
//! `var` initializers may name a variable declared later, in any file of the package, or a
//! variable of an imported package qualified by its package name; `panic` fails when
//! evaluated. Executing a `func` records `<package>.<name>` in the trace; initializing globals
//! stores their values in the frame.
use crate::lang::{
    Declarer, Evaluator, Lowerer, NodeId, Parsed, Parser, Symbol, SymbolKind, SymbolTable,
};
use crate::runtime::frame::Frame;
use anyhow::{anyhow, bail};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Builtin that fails when evaluated.
const PANIC: &str = "panic";

#[derive(Clone, Debug, PartialEq, Eq)]
enum Expr {
    Int(i64),
    Ident(String),
    Qualified(String, String),
}

#[derive(Debug)]
enum Node {
    File {
        name: String,
        package: String,
        imports: Vec<String>,
        decls: Vec<NodeId>,
        import_path: Option<String>,
    },
    Var {
        name: String,
        init: Expr,
        file: NodeId,
    },
    Func {
        name: String,
        package: String,
    },
    Globals {
        import_path: String,
        vars: Vec<NodeId>,
    },
}

/// Shared handles to what a [`Toy`] observed.
#[derive(Clone, Debug, Default)]
pub struct Recorder {
    parses: Arc<AtomicUsize>,
    trace: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    /// Number of files parsed.
    pub fn parses(&self) -> usize {
        self.parses.load(Ordering::SeqCst)
    }

    /// Executed entry-point wirings, global initializations and functions, in order.
    pub fn trace(&self) -> Vec<String> {
        self.trace.lock().clone()
    }

    fn record(&self, event: String) {
        self.trace.lock().push(event);
    }
}

#[derive(Debug, Default)]
pub struct Toy {
    nodes: Vec<Node>,
    scopes: HashMap<String, SymbolTable>,
    package_names: HashMap<String, String>,
    slots: usize,
    recorder: Recorder,
}

impl Toy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorder(&self) -> Recorder {
        self.recorder.clone()
    }

    fn push(&mut self, node: Node) -> NodeId {
        self.nodes.push(node);
        NodeId::from(self.nodes.len() - 1)
    }

    fn node(&self, id: NodeId) -> anyhow::Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| anyhow!("no such node {id}"))
    }

    fn file_of(&self, id: NodeId) -> anyhow::Result<(&[String], &str)> {
        match self.node(id)? {
            Node::File { imports, name, .. } => Ok((imports.as_slice(), name.as_str())),
            _ => bail!("{id} is not a file"),
        }
    }

    fn scope(&mut self, import_path: &str) -> &mut SymbolTable {
        self.scopes.entry(import_path.to_string()).or_default()
    }

    /// Import path a package name refers to from within `file`.
    fn qualifier(&self, file: NodeId, package: &str) -> anyhow::Result<String> {
        let (imports, name) = self.file_of(file)?;
        imports
            .iter()
            .find(|path| self.package_names.get(*path).map(String::as_str) == Some(package))
            .cloned()
            .ok_or_else(|| anyhow!("{name}: undefined: {package}"))
    }

    /// Declare one `var` or `func`, returning `false` if it references an undeclared name.
    fn declare_one(&mut self, id: NodeId, import_path: &str) -> anyhow::Result<bool> {
        let symbol = match self.node(id)? {
            Node::Func { name, .. } if name == "init" => return Ok(true),
            Node::Func { name, .. } => (name.clone(), Symbol::new(SymbolKind::Func).with_node(id)),
            Node::Var { name, init, file } => {
                let resolved = match init {
                    Expr::Int(_) => true,
                    Expr::Ident(ident) if ident == PANIC => true,
                    Expr::Ident(ident) => self
                        .scopes
                        .get(import_path)
                        .map_or(false, |scope| scope.contains(ident)),
                    Expr::Qualified(package, ident) => {
                        let path = self.qualifier(*file, package)?;
                        if !self.scopes.get(&path).map_or(false, |s| s.contains(ident)) {
                            bail!("undefined: {package}.{ident}");
                        }
                        true
                    }
                };
                if !resolved {
                    return Ok(false);
                }
                (
                    name.clone(),
                    Symbol::new(SymbolKind::Var)
                        .with_node(id)
                        .with_slot(self.slots),
                )
            }
            other => bail!("cannot declare {other:?}"),
        };

        let (name, symbol) = symbol;
        if symbol.kind == SymbolKind::Var {
            self.slots += 1;
        }
        if self.scope(import_path).insert(name.clone(), symbol).is_some() {
            bail!("{name} redeclared in this block");
        }
        Ok(true)
    }

    fn eval(
        &self,
        id: NodeId,
        import_path: &str,
        frame: &Frame<i64>,
        done: &mut HashSet<NodeId>,
    ) -> anyhow::Result<i64> {
        let Node::Var { name, init, file } = self.node(id)? else {
            bail!("{id} is not a variable");
        };
        let slot = self
            .scopes
            .get(import_path)
            .and_then(|scope| scope.get(name))
            .and_then(|symbol| symbol.slot)
            .ok_or_else(|| anyhow!("{name} has no slot"))?;
        if done.contains(&id) {
            return frame.get(slot).ok_or_else(|| anyhow!("slot {slot} out of range"));
        }

        let value = match init {
            Expr::Int(value) => *value,
            Expr::Ident(ident) if ident == PANIC => bail!("panic while initializing {name}"),
            Expr::Ident(ident) => {
                let dep = self
                    .scopes
                    .get(import_path)
                    .and_then(|scope| scope.get(ident))
                    .and_then(|symbol| symbol.node)
                    .ok_or_else(|| anyhow!("undefined: {ident}"))?;
                self.eval(dep, import_path, frame, done)?
            }
            Expr::Qualified(package, ident) => {
                let path = self.qualifier(*file, package)?;
                let slot = self
                    .scopes
                    .get(&path)
                    .and_then(|scope| scope.get(ident))
                    .and_then(|symbol| symbol.slot)
                    .ok_or_else(|| anyhow!("undefined: {package}.{ident}"))?;
                frame
                    .get(slot)
                    .ok_or_else(|| anyhow!("slot {slot} out of range"))?
            }
        };

        if !frame.set(slot, value) {
            bail!("slot {slot} out of range");
        }
        done.insert(id);
        Ok(value)
    }
}

fn parse_expr(text: &str) -> anyhow::Result<Expr> {
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Expr::Int(value));
    }
    let valid = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_alphanumeric() || c == '_');
    match text.split_once('.') {
        Some((package, ident)) if valid(package) && valid(ident) => {
            Ok(Expr::Qualified(package.into(), ident.into()))
        }
        None if valid(text) => Ok(Expr::Ident(text.into())),
        _ => bail!("invalid expression {text:?}"),
    }
}

impl Parser for Toy {
    fn parse(&mut self, source: &str, name: &str) -> anyhow::Result<Parsed> {
        self.recorder.parses.fetch_add(1, Ordering::SeqCst);
        let base = name.rsplit('/').next().unwrap_or(name).to_string();

        let mut package = None;
        let mut imports = Vec::new();
        let mut decls = Vec::new();
        let mut content = false;

        for (number, line) in source.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            content = true;
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["package", pkg] if package.is_none() && decls.is_empty() => {
                    package = Some(pkg.to_string())
                }
                ["import", path] if path.len() > 2 && path.starts_with('"') && path.ends_with('"') => {
                    imports.push(path[1..path.len() - 1].to_string())
                }
                ["var", ident, "=", expr] => {
                    let init = parse_expr(expr)?;
                    decls.push((ident.to_string(), Some(init)));
                }
                ["func", ident] => decls.push((ident.to_string(), None)),
                _ => bail!("{}:{}: unexpected {:?}", name, number + 1, line),
            }
        }

        if !content {
            return Ok(Parsed::new(String::new(), None));
        }
        let package = package.ok_or_else(|| anyhow!("{name}: expected 'package'"))?;

        let file = self.push(Node::File {
            name: base,
            package: package.clone(),
            imports: imports.clone(),
            decls: Vec::new(),
            import_path: None,
        });
        let ids: Vec<NodeId> = decls
            .into_iter()
            .map(|(ident, init)| match init {
                Some(init) => self.push(Node::Var {
                    name: ident,
                    init,
                    file,
                }),
                None => self.push(Node::Func {
                    name: ident,
                    package: package.clone(),
                }),
            })
            .collect();
        if let Some(Node::File { decls, .. }) = self.nodes.get_mut(file.index()) {
            *decls = ids;
        }

        Ok(Parsed::new(package, Some(file)).with_imports(imports))
    }
}

impl Declarer for Toy {
    fn declare(
        &mut self,
        root: NodeId,
        _sub_path: &str,
        import_path: &str,
    ) -> anyhow::Result<Vec<NodeId>> {
        let decls = match self.nodes.get_mut(root.index()) {
            Some(Node::File {
                decls,
                package,
                import_path: path,
                ..
            }) => {
                *path = Some(import_path.to_string());
                let package = package.clone();
                let decls = decls.clone();
                self.package_names
                    .entry(import_path.to_string())
                    .or_insert(package);
                decls
            }
            _ => bail!("{root} is not a file"),
        };
        self.scope(import_path);

        let mut pending = Vec::new();
        for id in decls {
            if !self.declare_one(id, import_path)? {
                pending.push(id);
            }
        }
        Ok(pending)
    }

    fn redeclare(&mut self, pending: &[NodeId], import_path: &str) -> anyhow::Result<Vec<NodeId>> {
        let mut remaining = Vec::new();
        for id in pending {
            if !self.declare_one(*id, import_path)? {
                remaining.push(*id);
            }
        }
        Ok(remaining)
    }

    fn package_symbols(&self, import_path: &str) -> SymbolTable {
        self.scopes.get(import_path).cloned().unwrap_or_default()
    }

    fn global_slots(&self) -> usize {
        self.slots
    }
}

impl Lowerer for Toy {
    fn lower(&mut self, root: NodeId, _import_path: &str) -> anyhow::Result<Vec<NodeId>> {
        let Node::File { decls, .. } = self.node(root)? else {
            bail!("{root} is not a file");
        };
        Ok(decls
            .iter()
            .copied()
            .filter(|id| matches!(&self.nodes[id.index()], Node::Func { name, .. } if name == "init"))
            .collect())
    }

    fn wire_entry_points(&mut self, root: NodeId) -> anyhow::Result<()> {
        match self.node(root)? {
            Node::File { import_path: Some(_), .. } => Ok(()),
            Node::File { name, .. } => bail!("{name} was never declared"),
            _ => bail!("{root} is not a file"),
        }
    }

    fn wire_globals(&mut self, roots: &[NodeId], import_path: &str) -> anyhow::Result<NodeId> {
        let mut vars = Vec::new();
        for root in roots {
            let Node::File { decls, .. } = self.node(*root)? else {
                bail!("{root} is not a file");
            };
            vars.extend(
                decls
                    .iter()
                    .copied()
                    .filter(|id| matches!(self.nodes[id.index()], Node::Var { .. })),
            );
        }
        Ok(self.push(Node::Globals {
            import_path: import_path.to_string(),
            vars,
        }))
    }
}

impl Evaluator for Toy {
    type Value = i64;

    fn execute(&mut self, node: NodeId, frame: Option<&Frame<i64>>) -> anyhow::Result<()> {
        match self.node(node)? {
            Node::File { name, .. } => {
                self.recorder.record(format!("wire {name}"));
            }
            Node::Func { name, package } => {
                if frame.is_none() {
                    bail!("{package}.{name} executed without a frame");
                }
                self.recorder.record(format!("{package}.{name}"));
            }
            Node::Globals { import_path, vars } => {
                let frame = frame.ok_or_else(|| anyhow!("globals of {import_path} need a frame"))?;
                let mut done = HashSet::new();
                for var in vars {
                    self.eval(*var, import_path, frame, &mut done)?;
                }
                self.recorder.record(format!("globals {import_path}"));
            }
            Node::Var { name, .. } => bail!("variable {name} is not executable"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_file_has_no_root() {
        let mut toy = Toy::new();
        let parsed = toy.parse("// nothing here\n\n", "empty.sp").unwrap();
        assert_eq!(parsed.root, None);
        assert_eq!(toy.recorder().parses(), 1);
    }

    #[test]
    fn parses_declarations() {
        let mut toy = Toy::new();
        let parsed = toy
            .parse(
                "package lib\nimport \"example.com/dep\"\nvar x = dep.y\nfunc init\n",
                "/ws/src/lib/a.sp",
            )
            .unwrap();
        assert_eq!(parsed.package, "lib");
        assert_eq!(parsed.imports, vec!["example.com/dep".to_string()]);
        assert!(parsed.root.is_some());
    }

    #[test]
    fn rejects_garbage() {
        let mut toy = Toy::new();
        assert!(toy.parse("package a\nwhile true\n", "a.sp").is_err());
        assert!(toy.parse("var x = 1\n", "a.sp").is_err());
        assert!(toy.parse("package a\nvar x = 1 + 2\n", "a.sp").is_err());
    }

    #[test]
    fn forward_reference_is_pending() {
        let mut toy = Toy::new();
        let root = toy
            .parse("package a\nvar x = y\nvar y = 2\n", "a.sp")
            .unwrap()
            .root
            .unwrap();
        let pending = toy.declare(root, "a", "a").unwrap();
        assert_eq!(pending.len(), 1);
        assert!(toy.redeclare(&pending, "a").unwrap().is_empty());
        assert_eq!(toy.global_slots(), 2);
        assert!(toy.package_symbols("a").contains("x"));
    }
}
