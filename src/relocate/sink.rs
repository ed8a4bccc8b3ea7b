//! Where rewritten units go.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use super::Edit;

/// Receives the final text of every modified unit. `finish` is called once,
/// after a run that succeeded.
pub trait Sink {
    fn accept(&mut self, path: &Path, text: &str) -> io::Result<()>;

    /// Called for every replaced reference before its unit is accepted.
    fn edit(&mut self, _edit: &Edit) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Holds everything until `finish`, then replaces each file atomically.
/// A failed run leaves the disk untouched.
#[derive(Debug, Default)]
pub struct BufferedSink {
    pending: Vec<(PathBuf, String)>,
}

impl BufferedSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Sink for BufferedSink {
    fn accept(&mut self, path: &Path, text: &str) -> io::Result<()> {
        self.pending.push((path.to_path_buf(), text.to_string()));
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        for (path, text) in self.pending.drain(..) {
            let dir = path.parent().unwrap_or(Path::new("."));
            let mut tmp = NamedTempFile::new_in(dir)?;
            tmp.write_all(text.as_bytes())?;
            // The replacement takes over the mode of the file it replaces.
            if let Ok(meta) = fs::metadata(&path) {
                tmp.as_file().set_permissions(meta.permissions())?;
            }
            tmp.persist(&path).map_err(|e| e.error)?;
            debug!(path = %path.display(), "written");
        }
        Ok(())
    }
}

/// Prints each edit and each unit as it completes.
pub struct PrintSink<W: Write> {
    out: W,
}

impl<W: Write> PrintSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Sink for PrintSink<W> {
    fn accept(&mut self, path: &Path, text: &str) -> io::Result<()> {
        writeln!(self.out, "file: {}", path.display())?;
        writeln!(self.out, "{text}")
    }

    fn edit(&mut self, edit: &Edit) -> io::Result<()> {
        writeln!(self.out, "{edit}")
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Collects results in memory, keyed by path.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub files: BTreeMap<PathBuf, String>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<&str> {
        self.files.get(path.as_ref()).map(String::as_str)
    }
}

impl Sink for MemorySink {
    fn accept(&mut self, path: &Path, text: &str) -> io::Result<()> {
        if self.files.contains_key(path) {
            return Err(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("'{}' was produced twice", path.display()),
            ));
        }
        self.files.insert(path.to_path_buf(), text.to_string());
        Ok(())
    }
}
