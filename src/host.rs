//! The interpreter's only contact with the outside world.
//!
//! Printing, reading a line and asking whether a named resource exists all go
//! through [`Host`], so the core never touches stdout or the file system
//! directly. [`StdHost`] is the console implementation; [`MemoryHost`] keeps
//! everything in memory for embedding and tests.

use std::cell::RefCell;
use std::collections::{HashSet, VecDeque};
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::rc::Rc;

use log::info;

use crate::error::{ManiError, Result};

/// Effects the interpreter may perform, all synchronous and in program order.
pub trait Host {
    /// Write `text` followed by a newline.
    fn print(&mut self, text: &str) -> io::Result<()>;

    /// Read one line without its terminator; `None` at end of input.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Does a resource with this name exist?
    fn resource_exists(&self, name: &str) -> bool;
}

/// Console host: stdout, stdin and the local file system.
#[derive(Debug, Default)]
pub struct StdHost;

impl Host for StdHost {
    fn print(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        writeln!(out, "{}", text)?;
        out.flush()
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();

        if io::stdin().lock().read_line(&mut line)? == 0 {
            return Ok(None);
        }

        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }

    fn resource_exists(&self, name: &str) -> bool {
        Path::new(name).exists()
    }
}

/// In‑memory host. Cloning shares the same output buffer, so a caller can
/// keep a handle and inspect what a script printed.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    output: Rc<RefCell<Vec<String>>>,
    input: Rc<RefCell<VecDeque<String>>>,
    resources: Rc<RefCell<HashSet<String>>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue lines for `input()` to return.
    pub fn with_input<I, S>(self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.input
            .borrow_mut()
            .extend(lines.into_iter().map(Into::into));
        self
    }

    /// Make `file_exists(name)` report `true`.
    pub fn with_resource<S: Into<String>>(self, name: S) -> Self {
        self.resources.borrow_mut().insert(name.into());
        self
    }

    /// Every printed line so far.
    pub fn lines(&self) -> Vec<String> {
        self.output.borrow().clone()
    }
}

impl Host for MemoryHost {
    fn print(&mut self, text: &str) -> io::Result<()> {
        self.output.borrow_mut().push(text.to_string());
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<Option<String>> {
        Ok(self.input.borrow_mut().pop_front())
    }

    fn resource_exists(&self, name: &str) -> bool {
        self.resources.borrow().contains(name)
    }
}

/// A script read from disk: its text and the base name used in error
/// messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Script {
    pub source: String,
    pub file_name: String,
}

/// Mani scripts must carry the `.mni` extension.
pub const SCRIPT_EXTENSION: &str = "mni";

/// Load a `.mni` script, decoding it as UTF‑8.
pub fn load_script(path: &Path) -> Result<Script> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
        return Err(ManiError::Script(format!(
            "Mani scripts must end with '.{}'.",
            SCRIPT_EXTENSION
        )));
    }

    read_source(path)
}

/// Read any file as UTF‑8 source, whatever its extension.
pub fn read_source(path: &Path) -> Result<Script> {
    info!("Reading source: {:?}", path);

    let file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            ManiError::Script(format!("{}: File not Found", path.display()))
        }
        _ => ManiError::Io(e),
    })?;

    let mut buf = Vec::new();
    let bytes = BufReader::new(file).read_to_end(&mut buf)?;

    info!("Read {} bytes from {:?}", bytes, path);

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    Ok(Script {
        source: String::from_utf8(buf)?,
        file_name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    fn temp_file(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("mani-{}-{}", std::process::id(), name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn read_source_accepts_any_extension() {
        let path = temp_file("expr.txt", "1 + 2");

        let script = read_source(&path).unwrap();
        assert_eq!(script.source, "1 + 2");
        assert_eq!(script.file_name, path.file_name().unwrap().to_string_lossy());

        let err = load_script(&path).unwrap_err();
        assert_eq!(err.to_string(), "Mani scripts must end with '.mni'.");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn load_script_reads_mni_files() {
        let path = temp_file("main.mni", "print 1;");

        assert_eq!(load_script(&path).unwrap().source, "print 1;");

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn missing_file_is_a_script_error() {
        let path = std::env::temp_dir().join("mani-does-not-exist.mni");

        assert!(matches!(load_script(&path), Err(ManiError::Script(msg)) if msg.ends_with("File not Found")));
    }
}
