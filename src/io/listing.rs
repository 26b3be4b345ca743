//! Directory listing and path-pattern matching used for asset discovery

use glob::Pattern;
use std::collections::BTreeSet;
use std::io;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

/// Read-only view of a directory tree
pub trait DirectoryListing {
    /// Immediate children (files and directories) of `dir`
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;

    /// Every entry below `dir`, at any depth, in path order
    fn walk(&self, dir: &Path) -> io::Result<Vec<PathBuf>>;
}

impl<T: DirectoryListing + ?Sized> DirectoryListing for &T {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).list(dir)
    }

    fn walk(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        (**self).walk(dir)
    }
}

/// Listing backed by the local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl DirectoryListing for LocalFs {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn walk(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            entries.push(entry.into_path());
        }
        Ok(entries)
    }
}

/// In-memory directory tree built from a list of file paths
///
/// Parent directories are implied by the files. Useful for dry runs and tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTree {
    files: BTreeSet<PathBuf>,
    dirs: BTreeSet<PathBuf>,
}

impl InMemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_files<I, P>(files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut tree = Self::new();
        for file in files {
            tree.add_file(file);
        }
        tree
    }

    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) {
        let file = file.as_ref().to_path_buf();
        for ancestor in file.ancestors().skip(1) {
            if !self.dirs.insert(ancestor.to_path_buf()) {
                break;
            }
        }
        self.files.insert(file);
    }

    /// Register an empty directory
    pub fn add_dir<P: AsRef<Path>>(&mut self, dir: P) {
        for ancestor in dir.as_ref().ancestors() {
            if !self.dirs.insert(ancestor.to_path_buf()) {
                break;
            }
        }
    }

    fn ensure_dir(&self, dir: &Path) -> io::Result<()> {
        if self.dirs.contains(dir) {
            Ok(())
        } else if self.files.contains(dir) {
            Err(io::Error::new(io::ErrorKind::Other, format!("Not a directory: {}", dir.display())))
        } else {
            Err(io::Error::new(io::ErrorKind::NotFound, format!("No such directory: {}", dir.display())))
        }
    }

    fn entries(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter().chain(self.dirs.iter())
    }
}

impl DirectoryListing for InMemoryTree {
    fn list(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.ensure_dir(dir)?;
        let children: BTreeSet<PathBuf> = self
            .entries()
            .filter(|p| p.parent() == Some(dir))
            .cloned()
            .collect();
        Ok(children.into_iter().collect())
    }

    fn walk(&self, dir: &Path) -> io::Result<Vec<PathBuf>> {
        self.ensure_dir(dir)?;
        let descendants: BTreeSet<PathBuf> = self
            .entries()
            .filter(|p| p.as_path() != dir && p.starts_with(dir))
            .cloned()
            .collect();
        Ok(descendants.into_iter().collect())
    }
}

/// Path pattern made of `/`-separated glob segments
///
/// A `**` segment spans zero or more directories; other segments are matched
/// against a single path component, so `*` never crosses a separator.
#[derive(Debug, Clone)]
pub struct PathPattern {
    segments: Vec<Segment>,
}

#[derive(Debug, Clone)]
enum Segment {
    AnyDirs,
    Name(Pattern),
}

impl PathPattern {
    pub fn new(pattern: &str) -> Result<Self, glob::PatternError> {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s {
                "**" => Ok(Segment::AnyDirs),
                _ => Pattern::new(s).map(Segment::Name),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { segments })
    }

    /// Pattern for a recursive search: matches at any depth below the root
    pub fn recursive(pattern: &str) -> Result<Self, glob::PatternError> {
        Self::new(&format!("**/{}", pattern))
    }

    /// Match a path relative to the scanned root
    pub fn matches(&self, relative: &Path) -> bool {
        let parts: Vec<String> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
                _ => None,
            })
            .collect();
        match_segments(&self.segments, &parts)
    }
}

fn match_segments(segments: &[Segment], parts: &[String]) -> bool {
    match segments.split_first() {
        None => parts.is_empty(),
        Some((Segment::AnyDirs, rest)) => (0..=parts.len()).any(|skip| match_segments(rest, &parts[skip..])),
        Some((Segment::Name(pattern), rest)) => match parts.split_first() {
            Some((part, remaining)) => pattern.matches(part) && match_segments(rest, remaining),
            None => false,
        },
    }
}

/// Entries directly under `root` whose name matches `pattern`
pub fn glob_dir<L: DirectoryListing + ?Sized>(
    listing: &L,
    root: &Path,
    pattern: &PathPattern,
) -> io::Result<Vec<PathBuf>> {
    Ok(listing
        .list(root)?
        .into_iter()
        .filter(|p| p.strip_prefix(root).map(|rel| pattern.matches(rel)).unwrap_or(false))
        .collect())
}

/// Entries at any depth below `root` matching `pattern` (relative to `root`)
pub fn glob_tree<L: DirectoryListing + ?Sized>(
    listing: &L,
    root: &Path,
    pattern: &PathPattern,
) -> io::Result<Vec<PathBuf>> {
    Ok(listing
        .walk(root)?
        .into_iter()
        .filter(|p| p.strip_prefix(root).map(|rel| pattern.matches(rel)).unwrap_or(false))
        .collect())
}
