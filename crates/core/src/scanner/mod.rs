pub mod dirfilter;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};

/// A single enumerated file: the absolute parent directory (trailing
/// separator included) and the bare filename, matching the original
/// tool's `(parent, file)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub parent: String,
    pub file: String,
}

impl ScanEntry {
    pub fn full_path(&self) -> PathBuf {
        Path::new(&self.parent).join(&self.file)
    }
}

/// White/black extension filter. A non-empty white list dominates; an
/// empty white list falls back to the black list; both empty accepts
/// everything. Matching is case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct ExtensionPolicy {
    white: HashSet<String>,
    black: HashSet<String>,
}

impl ExtensionPolicy {
    pub fn new<I, J>(white: I, black: J) -> Self
    where
        I: IntoIterator<Item = String>,
        J: IntoIterator<Item = String>,
    {
        Self {
            white: white.into_iter().map(|e| e.to_ascii_lowercase()).collect(),
            black: black.into_iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    pub fn white_only<I: IntoIterator<Item = String>>(white: I) -> Self {
        Self::new(white, std::iter::empty())
    }

    pub fn accepts(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        if !self.white.is_empty() {
            self.white.contains(&ext)
        } else if !self.black.is_empty() {
            !self.black.contains(&ext)
        } else {
            true
        }
    }
}

/// Recursive directory scanner producing `(parent, file)` pairs, with
/// the built-in directory blacklist and a caller-supplied extension
/// policy.
pub struct Scanner {
    recursive: bool,
    use_builtin_filter: bool,
    ext_policy: ExtensionPolicy,
}

impl Scanner {
    pub fn new(recursive: bool, use_builtin_filter: bool, ext_policy: ExtensionPolicy) -> Self {
        Self {
            recursive,
            use_builtin_filter,
            ext_policy,
        }
    }

    fn skip_entry(&self, entry: &DirEntry) -> bool {
        if !self.use_builtin_filter {
            return false;
        }
        entry
            .file_name()
            .to_str()
            .is_some_and(dirfilter::is_blacklisted)
    }

    fn accept_file(&self, path: &Path) -> bool {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.ext_policy.accepts(ext),
            None => false,
        }
    }

    /// Walks `root` synchronously, returning every accepted file as a
    /// `(parent, file)` pair. Directory traversal order is
    /// implementation-defined but stable within a single run.
    pub fn scan(&self, root: &Path) -> Result<Vec<ScanEntry>> {
        let mut out = Vec::new();

        if !self.recursive {
            let read_dir = std::fs::read_dir(root).map_err(|e| Error::ReadFile {
                path: root.to_path_buf(),
                source: e,
            })?;
            for entry in read_dir.filter_map(|e| e.ok()) {
                let path = entry.path();
                if !path.is_file() || !self.accept_file(&path) {
                    continue;
                }
                out.push(to_scan_entry(&path)?);
            }
            return Ok(out);
        }

        let walker = WalkDir::new(root).follow_links(true).into_iter();
        for entry in walker.filter_entry(|e| e.depth() == 0 || !self.skip_entry(e)) {
            let entry = match entry {
                Ok(e) => e,
                Err(_) => continue,
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if !self.accept_file(path) {
                continue;
            }
            out.push(to_scan_entry(path)?);
        }

        Ok(out)
    }

    /// Runs [`Scanner::scan`] on a detached worker thread; the caller
    /// blocks on the returned handle via [`block_wait`].
    pub fn scan_bg(self, root: PathBuf) -> JoinHandle<Result<Vec<ScanEntry>>> {
        std::thread::spawn(move || self.scan(&root))
    }
}

/// Blocks until a background scan started with [`Scanner::scan_bg`]
/// completes, returning its result.
pub fn block_wait(handle: JoinHandle<Result<Vec<ScanEntry>>>) -> Result<Vec<ScanEntry>> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Ok(Vec::new()),
    }
}

fn to_scan_entry(path: &Path) -> Result<ScanEntry> {
    let abs = std::fs::canonicalize(path).map_err(|e| Error::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let file = abs
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut parent = abs
        .parent()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !parent.ends_with(std::path::MAIN_SEPARATOR) {
        parent.push(std::path::MAIN_SEPARATOR);
    }
    Ok(ScanEntry { parent, file })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_recursive_collects_nested_files() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.cpp"), b"a").unwrap();
        fs::write(tmp.path().join("sub/b.cpp"), b"b").unwrap();
        fs::write(tmp.path().join("sub/c.txt"), b"c").unwrap();

        let scanner = Scanner::new(true, true, ExtensionPolicy::white_only(["cpp".to_string()]));
        let mut files = scanner.scan(tmp.path()).unwrap();
        files.sort_by(|a, b| a.file.cmp(&b.file));

        assert_eq!(files.len(), 2);
        assert!(files.iter().all(|f| f.file.ends_with(".cpp")));
        assert!(files[0].parent.ends_with(std::path::MAIN_SEPARATOR));
    }

    #[test]
    fn non_recursive_ignores_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join("sub")).unwrap();
        fs::write(tmp.path().join("a.jpg"), b"a").unwrap();
        fs::write(tmp.path().join("sub/b.jpg"), b"b").unwrap();

        let scanner = Scanner::new(false, true, ExtensionPolicy::default());
        let files = scanner.scan(tmp.path()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file, "a.jpg");
    }

    #[test]
    fn builtin_blacklist_skips_dotgit_regardless_of_depth() {
        let tmp = tempfile::tempdir().unwrap();
        fs::create_dir_all(tmp.path().join(".git/objects")).unwrap();
        fs::write(tmp.path().join(".git/objects/pack.idx"), b"x").unwrap();
        fs::write(tmp.path().join("keep.jpg"), b"keep").unwrap();

        let scanner = Scanner::new(true, true, ExtensionPolicy::default());
        let files = scanner.scan(tmp.path()).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file, "keep.jpg");
    }

    #[test]
    fn white_list_dominates_black_list() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("demo.jpg"), b"x").unwrap();

        let policy = ExtensionPolicy::new(["jpg".to_string()], ["jpg".to_string()]);
        assert!(policy.accepts("JPG"));
    }

    #[test]
    fn black_list_rejects_when_no_white_list() {
        let policy = ExtensionPolicy::new(Vec::<String>::new(), vec!["jpg".to_string()]);
        assert!(!policy.accepts("jpg"));
        assert!(policy.accepts("png"));
    }

    #[test]
    fn scan_bg_matches_synchronous_scan() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.cpp"), b"a").unwrap();

        let scanner = Scanner::new(true, true, ExtensionPolicy::white_only(["cpp".to_string()]));
        let handle = scanner.scan_bg(tmp.path().to_path_buf());
        let files = block_wait(handle).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].file, "a.cpp");
    }
}
