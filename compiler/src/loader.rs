use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::ast::Header;
use crate::compiler::DeclKind;
use crate::error::{in_file, CompileError};
use crate::lexer::tokenize;
use crate::parser::parse_program;
use crate::spec::{Compilation, DefSpec, ModuleId, ModuleSpec};

/// The loader's view of its host: a byte source and a canonical-path
/// function, both total over paths.
pub trait Filesystem {
    fn read(&self, path: &Path) -> io::Result<String>;
    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf>;
}

/// The standard-library filesystem.
pub struct OsFilesystem;

impl Filesystem for OsFilesystem {
    fn read(&self, path: &Path) -> io::Result<String> {
        fs::read_to_string(path)
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }
}

/// An in-memory file map for embedders and tests. Paths are normalized
/// lexically, so `a/../b.thrift` and `b.thrift` name the same file.
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    files: HashMap<PathBuf, String>,
}

impl MemoryFilesystem {
    pub fn new() -> MemoryFilesystem {
        MemoryFilesystem { files: HashMap::new() }
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, text: impl Into<String>) {
        self.files.insert(normalize(&path.into()), text.into());
    }
}

impl Filesystem for MemoryFilesystem {
    fn read(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such file: {}", path.display()))
        })
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        let normalized = normalize(path);
        if self.files.contains_key(&normalized) {
            Ok(normalized)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            ))
        }
    }
}

/// Lexical path normalization: resolves `.` and `..` components without
/// touching the disk.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(Component::ParentDir);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

enum LoadState {
    Loading,
    Loaded(ModuleId),
}

/// The compile session: drives lexing, parsing, include loading, and the
/// two-phase link, producing an immutable [`Compilation`]. Each loaded file
/// is compiled once, cached by canonical path; re-entering a file that is
/// still loading is an import cycle.
pub struct Compiler<F = OsFilesystem> {
    fs:     F,
    states: HashMap<PathBuf, LoadState>,
    stack:  Vec<PathBuf>,

    pub(crate) modules:    Vec<ModuleSpec>,
    pub(crate) defs:       Vec<Option<DefSpec>>,
    pub(crate) decl_kinds: Vec<DeclKind>,
}

impl Compiler<OsFilesystem> {
    pub fn new() -> Compiler<OsFilesystem> {
        Compiler::with_filesystem(OsFilesystem)
    }
}

impl Default for Compiler<OsFilesystem> {
    fn default() -> Compiler<OsFilesystem> {
        Compiler::new()
    }
}

impl<F: Filesystem> Compiler<F> {
    pub fn with_filesystem(fs: F) -> Compiler<F> {
        Compiler {
            fs,
            states: HashMap::new(),
            stack: Vec::new(),
            modules: Vec::new(),
            defs: Vec::new(),
            decl_kinds: Vec::new(),
        }
    }

    /// Compile a root file and everything it transitively includes.
    pub fn compile(mut self, root: impl AsRef<Path>) -> Result<Compilation, CompileError> {
        let root = self.load(root.as_ref())?;
        let defs = self
            .defs
            .into_iter()
            .map(|slot| slot.expect("all definitions are linked after a successful compile"))
            .collect();
        Ok(Compilation { modules: self.modules, defs, root })
    }

    fn load(&mut self, path: &Path) -> Result<ModuleId, CompileError> {
        let canonical = self.fs.canonicalize(path).map_err(|err| CompileError::Include {
            path:   path.to_path_buf(),
            reason: err.to_string(),
        })?;

        match self.states.get(&canonical) {
            Some(LoadState::Loaded(id)) => return Ok(*id),
            Some(LoadState::Loading) => {
                // Report every file on the cycle, starting from the first
                // visit of the re-entered path.
                let start = self
                    .stack
                    .iter()
                    .position(|loading| *loading == canonical)
                    .unwrap_or(0);
                let mut names: Vec<String> = self.stack[start..]
                    .iter()
                    .map(|loading| loading.display().to_string())
                    .collect();
                names.push(canonical.display().to_string());
                return Err(CompileError::ImportCycle { cycle: names.join(" -> ") });
            }
            None => {}
        }

        self.states.insert(canonical.clone(), LoadState::Loading);
        self.stack.push(canonical.clone());
        let result = self.load_module(&canonical);
        self.stack.pop();

        let id = result?;
        self.states.insert(canonical, LoadState::Loaded(id));
        Ok(id)
    }

    fn load_module(&mut self, canonical: &Path) -> Result<ModuleId, CompileError> {
        let text = self
            .fs
            .read(canonical)
            .map_err(|err| in_file(canonical, CompileError::Io(err)))?;
        let tokens = tokenize(&text).map_err(|err| in_file(canonical, err))?;
        let program = parse_program(&tokens).map_err(|err| in_file(canonical, err))?;

        let mut includes = HashMap::new();
        let mut namespaces = Vec::new();
        let mut cpp_includes = Vec::new();
        let directory = canonical.parent().map(Path::to_path_buf).unwrap_or_default();

        for header in &program.headers {
            match header {
                Header::Include { path: include, .. } => {
                    // Includes resolve relative to the including file.
                    let module = self.load(&directory.join(include))?;
                    let short_name = file_stem(Path::new(include));
                    if includes.insert(short_name.clone(), module).is_some() {
                        return Err(in_file(
                            canonical,
                            CompileError::Include {
                                path:   PathBuf::from(include),
                                reason: format!(
                                    "the include name {:?} is already in use",
                                    short_name
                                ),
                            },
                        ));
                    }
                }
                Header::CppInclude { path, .. } => cpp_includes.push(path.clone()),
                Header::Namespace { scope, name, .. } => {
                    namespaces.push((scope.clone(), name.clone()))
                }
            }
        }

        let module = ModuleId(self.modules.len());
        self.modules.push(ModuleSpec {
            name: file_stem(canonical),
            path: canonical.to_path_buf(),
            includes,
            namespaces,
            cpp_includes,
            defs: Vec::new(),
            symbols: HashMap::new(),
        });

        self.compile_module(module, program)
            .map_err(|err| in_file(canonical, err))?;
        Ok(module)
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_resolves_dot_components() {
        assert_eq!(normalize(Path::new("a/./b.thrift")), PathBuf::from("a/b.thrift"));
        assert_eq!(normalize(Path::new("a/c/../b.thrift")), PathBuf::from("a/b.thrift"));
        assert_eq!(normalize(Path::new("../b.thrift")), PathBuf::from("../b.thrift"));
    }

    #[test]
    fn memory_filesystem_round_trip() {
        let mut fs = MemoryFilesystem::new();
        fs.insert("dir/x.thrift", "enum E { A }");
        assert!(fs.read(Path::new("dir/x.thrift")).is_ok());
        assert!(fs.read(Path::new("dir/sub/../x.thrift")).is_ok());
        assert!(fs.read(Path::new("missing.thrift")).is_err());
        assert_eq!(
            fs.canonicalize(Path::new("dir/sub/../x.thrift")).unwrap(),
            PathBuf::from("dir/x.thrift")
        );
    }
}
