//! Builder turning import paths into registered, initialized packages.
//!
//! Each import runs the same pipeline: find the sources, parse every file and import its
//! dependencies, declare globals (retrying once for references between sibling files), lower,
//! register the package, then run its initialization.
use crate::lang::{FileFilter, Language, NodeId};
use crate::runtime::config::BuildConfig;
use crate::runtime::registry::{CycleGuard, Globals};
use crate::runtime::resolver::{effective_pkg, is_relative, PackageLocator, PathResolver};
use crate::runtime::sources::{gzip_archive, Ephemeral, SourceSet};
use crate::runtime::{BuildError, PackageRecord};
use indexmap::IndexMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root given by the program's own entry package.
pub const MAIN_ROOT: &str = "main";

/// Builds packages of one interpreter session.
///
/// Sessions created from the same [`Globals`] share registered packages and the global frame.
/// Import cycles are tracked per session; two sessions building the same package at once both
/// succeed and the first registration wins.
pub struct Builder<L: Language> {
    lang: L,
    config: BuildConfig,
    resolver: PathResolver,
    filter: Arc<dyn FileFilter>,
    globals: Arc<Globals<L::Value>>,
    visiting: CycleGuard,
    entry: Option<PathBuf>,
}

impl<L: Language> Builder<L> {
    /// Create a builder with fresh shared state.
    pub fn new(lang: L, config: BuildConfig) -> Self {
        Self::new_with_globals(lang, config, Arc::new(Globals::new()))
    }

    /// Create a builder sharing packages with other sessions.
    pub fn new_with_globals(lang: L, config: BuildConfig, globals: Arc<Globals<L::Value>>) -> Self {
        Self {
            lang,
            resolver: PathResolver::new(&config),
            filter: Arc::new(config.constraints()),
            config,
            globals,
            visiting: CycleGuard::default(),
            entry: None,
        }
    }

    /// Replace the name-based source filter.
    pub fn with_filter<F: FileFilter + 'static>(mut self, filter: F) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Replace the locator consulted once the vendor chain is exhausted.
    pub fn with_locator<P: PackageLocator + 'static>(mut self, locator: P) -> Self {
        self.resolver = self.resolver.with_locator(locator);
        self
    }

    /// Source file the program is run from. Relative imports and the entry package's root
    /// derive from its location.
    pub fn with_entry<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.entry = Some(path.into());
        self
    }

    pub fn language(&self) -> &L {
        &self.lang
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn globals(&self) -> &Arc<Globals<L::Value>> {
        &self.globals
    }

    pub fn lookup(&self, import_path: &str) -> Option<Arc<PackageRecord>> {
        self.globals.lookup(import_path)
    }

    /// Import `import_path` as seen from packages under `root`, returning the package name.
    ///
    /// `root` is [`MAIN_ROOT`] for imports made by the entry package. Test files are loaded
    /// only if `skip_test` is `false`; dependencies are always loaded without them.
    pub fn import(
        &mut self,
        root: &str,
        import_path: &str,
        skip_test: bool,
    ) -> Result<String, BuildError> {
        if let Some(record) = self.globals.lookup(import_path) {
            log::debug!("{} already registered", import_path);
            return Ok(record.name.clone());
        }

        let (dir, root) = if is_relative(import_path) {
            let root = if root == MAIN_ROOT { "." } else { root };
            (
                self.entry_dir().join(root).join(import_path),
                root.to_string(),
            )
        } else {
            let root = self.entry_root(root)?;
            let resolved = self.resolver.resolve(&root, import_path)?;
            (resolved.dir, resolved.root)
        };

        if let Some(name) = self.enter(import_path)? {
            return Ok(name);
        }
        log::info!("importing {} from {}", import_path, dir.display());

        let filter = self.filter.clone();
        let sources = SourceSet::directory(&dir, filter.as_ref(), skip_test);
        self.build(import_path, &root, sources, skip_test)
    }

    /// Import a package from a gzip-compressed tar archive under `import_path`.
    ///
    /// Dependencies of the archived package resolve from the workspace root.
    pub fn import_archive<R: Read>(
        &mut self,
        reader: R,
        import_path: &str,
        skip_test: bool,
    ) -> Result<String, BuildError> {
        if let Some(name) = self.enter(import_path)? {
            return Ok(name);
        }
        log::info!("importing {} from archive", import_path);

        let filter = self.filter.clone();
        let mut archive = gzip_archive(reader);
        let sources = SourceSet::archive(&mut archive, filter.as_ref(), skip_test)?;
        self.build(import_path, "", sources, skip_test)
    }

    /// Import a package from in-memory sources under `import_path`.
    pub fn import_sources(
        &mut self,
        import_path: &str,
        src: Ephemeral,
        skip_test: bool,
    ) -> Result<String, BuildError> {
        if let Some(name) = self.enter(import_path)? {
            return Ok(name);
        }
        log::info!("importing {} from {}", import_path, src.location());

        let filter = self.filter.clone();
        let sources = SourceSet::ephemeral(src, filter.as_ref(), skip_test);
        self.build(import_path, "", sources, skip_test)
    }

    /// The name of `import_path` if it is registered, else mark it visiting.
    fn enter(&mut self, import_path: &str) -> Result<Option<String>, BuildError> {
        if let Some(record) = self.globals.lookup(import_path) {
            return Ok(Some(record.name.clone()));
        }
        self.visiting.begin(import_path)?;
        Ok(None)
    }

    fn entry_dir(&self) -> PathBuf {
        self.entry
            .as_deref()
            .and_then(Path::parent)
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// The source root of `root`. Imports made by the entry package resolve from the entry
    /// file's directory relative to the workspace source directory; without an entry file
    /// `main` is an ordinary root.
    fn entry_root(&self, root: &str) -> Result<String, BuildError> {
        if root != MAIN_ROOT {
            return Ok(root.to_string());
        }
        let extension = self.config.extension.as_str();
        let entry = match &self.entry {
            Some(entry) if entry.extension().map_or(false, |ext| ext == extension) => entry,
            _ => return Ok(root.to_string()),
        };

        let cwd = std::env::current_dir().map_err(|err| BuildError::io(".", err))?;
        let dir = cwd.join(entry.parent().unwrap_or_else(|| Path::new("")));
        match dir.strip_prefix(self.resolver.source_dir()) {
            Ok(rel) => Ok(rel.to_string_lossy().replace('\\', "/")),
            Err(_) => Err(BuildError::OutsideWorkspace(dir)),
        }
    }

    fn build(
        &mut self,
        import_path: &str,
        root: &str,
        sources: SourceSet<'_>,
        skip_test: bool,
    ) -> Result<String, BuildError> {
        let location = sources.location().to_string();
        let sub_path = effective_pkg(root, import_path);

        let mut package: Option<String> = None;
        let mut roots = Vec::new();
        let mut revisit: IndexMap<String, Vec<NodeId>> = IndexMap::new();

        for file in sources {
            let file = file?;
            let text = file.text().map_err(|err| BuildError::Parse {
                file: file.name.clone(),
                source: err.into(),
            })?;
            let parsed = self
                .lang
                .parse(text, &file.name)
                .map_err(|source| BuildError::Parse {
                    file: file.name.clone(),
                    source,
                })?;
            let Some(node) = parsed.root else {
                log::debug!("{} has no content", file.name);
                continue;
            };

            package = Some(merge_package_name(
                package,
                parsed.package,
                &location,
                skip_test,
            )?);

            for dep in &parsed.imports {
                self.import(&sub_path, dep, true)?;
            }

            log::debug!("declaring {} in {}", file.name, import_path);
            let pending = self
                .lang
                .declare(node, &sub_path, import_path)
                .map_err(|source| BuildError::Declaration {
                    import_path: import_path.to_string(),
                    source,
                })?;
            roots.push(node);
            revisit.entry(sub_path.clone()).or_default().extend(pending);
        }

        // Declarations referencing a sibling file visited later get one more pass.
        for (_, pending) in revisit {
            if pending.is_empty() {
                continue;
            }
            let remaining = self
                .lang
                .redeclare(&pending, import_path)
                .map_err(|source| BuildError::Declaration {
                    import_path: import_path.to_string(),
                    source,
                })?;
            if !remaining.is_empty() {
                return Err(BuildError::Unresolved {
                    import_path: import_path.to_string(),
                    count: remaining.len(),
                });
            }
        }

        let mut inits = Vec::new();
        for node in &roots {
            let lowered = self
                .lang
                .lower(*node, import_path)
                .map_err(|source| BuildError::Lowering {
                    import_path: import_path.to_string(),
                    source,
                })?;
            inits.extend(lowered);
        }

        let name = package.unwrap_or_else(|| {
            log::warn!("no source files for {} in {}", import_path, location);
            String::new()
        });
        let record = self.globals.register(
            import_path,
            PackageRecord::new(&name, self.lang.package_symbols(import_path)),
            self.lang.global_slots(),
        );
        log::info!(
            "registered package {} ({}) with {} symbols",
            import_path,
            name,
            record.symbols.len()
        );

        if skip_test && name == self.config.entry_package {
            if let Some(main) = record
                .symbols
                .get(&self.config.entry_symbol)
                .and_then(|symbol| symbol.node)
            {
                inits.push(main);
            }
        }
        self.initialize(import_path, &roots, &inits)?;

        Ok(name)
    }

    fn initialize(
        &mut self,
        import_path: &str,
        roots: &[NodeId],
        inits: &[NodeId],
    ) -> Result<(), BuildError> {
        let failed = |source| BuildError::Initialization {
            import_path: import_path.to_string(),
            source,
        };
        let globals = self.globals.clone();

        for node in roots {
            self.lang.wire_entry_points(*node).map_err(failed)?;
            self.lang.execute(*node, None).map_err(failed)?;
        }

        let vars = self.lang.wire_globals(roots, import_path).map_err(failed)?;
        self.lang
            .execute(vars, Some(globals.frame()))
            .map_err(failed)?;

        for node in inits {
            log::debug!("running {} of {}", node, import_path);
            self.lang
                .execute(*node, Some(globals.frame()))
                .map_err(failed)?;
        }
        Ok(())
    }
}

/// Check that a file's package clause agrees with the package seen so far.
///
/// When test files are included, `<name>_test` may sit next to `<name>`; the plain name wins.
fn merge_package_name(
    current: Option<String>,
    found: String,
    dir: &str,
    skip_test: bool,
) -> Result<String, BuildError> {
    let current = match current {
        Some(current) => current,
        None => return Ok(found),
    };
    if current == found {
        return Ok(current);
    }
    if !skip_test {
        if found.strip_suffix("_test") == Some(current.as_str()) {
            return Ok(current);
        }
        if current.strip_suffix("_test") == Some(found.as_str()) {
            log::warn!("{} declared before {} in {}", current, found, dir);
            return Ok(found);
        }
    }
    Err(BuildError::PackageNameConflict {
        first: current,
        second: found,
        dir: dir.to_string(),
    })
}
