//! Call-site capture.

use std::panic::Location;
use std::path::{Path, PathBuf};

use crate::error::{Result, SourceError};

/// The source file and line a secret literal was supplied from.
///
/// Lines are 1-based, as reported by the compiler. Use
/// [`CallerContext::line_index`] for the 0-based index the locator expects.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallerContext {
    file: PathBuf,
    line: usize,
}

impl CallerContext {
    /// Create a context for an explicit location.
    pub fn new(file: impl Into<PathBuf>, line: usize) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// Capture the caller's location.
    ///
    /// Library entry points that also carry `#[track_caller]` forward their
    /// own caller, so the captured frame is the first one outside the library.
    #[track_caller]
    pub fn here() -> Self {
        let location = Location::caller();
        Self::new(location.file(), location.line() as usize)
    }

    /// Source file path as captured.
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// 1-based line number.
    pub fn line(&self) -> usize {
        self.line
    }

    /// 0-based line index.
    pub fn line_index(&self) -> usize {
        self.line.saturating_sub(1)
    }

    /// Resolve a relative file path against the working directory or the
    /// nearest ancestor that holds it.
    ///
    /// `Location::file` is relative to the directory the compiler ran in,
    /// which is the workspace root for workspace members, while the process
    /// may run from a member directory.
    pub fn absolute(&self) -> Result<Self> {
        if self.file.is_absolute() {
            return Ok(self.clone());
        }
        let cwd = std::env::current_dir()?;
        Ok(Self::new(resolve_from(&cwd, &self.file), self.line))
    }
}

/// Join `file` onto the first of `start` and its ancestors where it exists,
/// falling back to `start` itself.
fn resolve_from(start: &Path, file: &Path) -> PathBuf {
    start
        .ancestors()
        .map(|dir| dir.join(file))
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| start.join(file))
}

impl std::fmt::Display for CallerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)
    }
}

/// Return the innermost frame whose file is not under `library_root`.
///
/// `frames` are ordered innermost first.
///
/// # Errors
///
/// Returns `SourceError::NoExternalCaller` if every frame lives inside the
/// library.
pub fn first_external_caller<'a, I>(frames: I, library_root: &Path) -> Result<&'a CallerContext>
where
    I: IntoIterator<Item = &'a CallerContext>,
{
    frames
        .into_iter()
        .find(|frame| !frame.file.starts_with(library_root))
        .ok_or_else(|| SourceError::NoExternalCaller(library_root.to_path_buf()).into())
}
