//! Selection of the files participating in a build.
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Decides whether a file takes part in a build.
pub trait FileFilter: Send + Sync {
    /// `name` may carry directory components; `skip_test` excludes test files.
    fn include(&self, name: &str, skip_test: bool) -> bool;
}

impl<F> FileFilter for F
where
    F: Fn(&str, bool) -> bool + Send + Sync,
{
    fn include(&self, name: &str, skip_test: bool) -> bool {
        self(name, skip_test)
    }
}

static KNOWN_OS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "android", "dragonfly", "freebsd", "illumos", "ios", "linux", "macos", "netbsd",
        "openbsd", "solaris", "wasi", "windows",
    ]
    .into_iter()
    .collect()
});

static KNOWN_ARCH: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "386", "amd64", "arm", "arm64", "loong64", "mips", "mips64", "ppc64", "riscv64",
        "s390x", "wasm",
    ]
    .into_iter()
    .collect()
});

/// Name-based build constraints.
///
/// A file is part of the build when it carries the source extension, is not hidden
/// (`_` or `.` prefix), is not a test file while tests are skipped, and its
/// `_os`, `_arch` or `_os_arch` suffix, if any, matches the target.
#[derive(Clone, Debug)]
pub struct BuildConstraints {
    extension: String,
    os: String,
    arch: String,
}

impl BuildConstraints {
    pub fn new(extension: impl Into<String>, os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            extension: extension.into(),
            os: os.into(),
            arch: arch.into(),
        }
    }

    fn matches_target(&self, stem: &str) -> bool {
        let Some(index) = stem.find('_') else {
            return true;
        };
        let mut parts: Vec<&str> = stem[index + 1..].split('_').collect();
        if parts.last() == Some(&"test") {
            parts.pop();
        }

        let n = parts.len();
        if n >= 2 && KNOWN_OS.contains(parts[n - 2]) && KNOWN_ARCH.contains(parts[n - 1]) {
            return parts[n - 2] == self.os && parts[n - 1] == self.arch;
        }
        match parts.last() {
            Some(os) if KNOWN_OS.contains(os) => *os == self.os,
            Some(arch) if KNOWN_ARCH.contains(arch) => *arch == self.arch,
            _ => true,
        }
    }
}

impl FileFilter for BuildConstraints {
    fn include(&self, name: &str, skip_test: bool) -> bool {
        let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
        let Some(stem) = base
            .strip_suffix(self.extension.as_str())
            .and_then(|s| s.strip_suffix('.'))
        else {
            return false;
        };

        if stem.is_empty() || stem.starts_with('_') || stem.starts_with('.') {
            return false;
        }
        if skip_test && stem.ends_with("_test") {
            return false;
        }
        self.matches_target(stem)
    }
}

/// Architecture suffix used in file names for the host, e.g. `amd64` for `x86_64`.
pub fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86" => "386",
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "loongarch64" => "loong64",
        "powerpc64" => "ppc64",
        "wasm32" => "wasm",
        other => other,
    }
}
