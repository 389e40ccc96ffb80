//! The `stic` front end: command line, source path and file loading.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use clap::Parser as ClapParser;

use crate::Runtime;
use crate::config::{DriverOptions, RuntimeConfig};
use crate::error::Error;

#[derive(ClapParser, Debug)]
#[command(name = "stic", author, version, about = "Run Redline Smalltalk source files", long_about = None)]
pub struct Cli {
    /// Source files to load, in order
    #[arg(required = false, help = "The .st files to run")]
    pub files: Vec<PathBuf>,

    /// Roots searched for relative source files
    #[arg(short = 's', long = "sourcepath", value_name = "PATHS", help = "Source roots, separated like PATH")]
    pub sourcepath: Option<OsString>,

    #[arg(short, long, help = "Log compilation and message sends")]
    pub verbose: bool,

    #[arg(long, help = "Log a disassembly of everything compiled")]
    pub dump_bytecode: bool,
}

impl Cli {
    pub fn into_options(self) -> DriverOptions {
        let search_roots = self
            .sourcepath
            .map(|paths| std::env::split_paths(&paths).collect())
            .unwrap_or_default();
        DriverOptions {
            files: self.files,
            search_roots,
            verbose: self.verbose,
            dump_bytecode: self.dump_bytecode,
        }
    }
}

/// Ordered source roots; the working directory is always the last one.
#[derive(Debug, Clone)]
pub struct SourcePath {
    roots: Vec<PathBuf>,
}

impl SourcePath {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let mut roots = roots;
        match std::env::current_dir() {
            Ok(cwd) => roots.push(cwd),
            Err(err) => log::warn!("working directory unavailable: {err}"),
        }
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// The first existing `root/file`. Absolute paths are taken as given.
    pub fn resolve(&self, file: &Path) -> Result<PathBuf, Error> {
        if file.is_absolute() {
            return if file.is_file() {
                Ok(file.to_path_buf())
            } else {
                Err(Error::SourceNotFound { file: file.to_path_buf() })
            };
        }
        self.roots
            .iter()
            .map(|root| root.join(file))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::SourceNotFound { file: file.to_path_buf() })
    }
}

/// Load every file in `options`. Answers `None`, without building a
/// runtime, when there is nothing to load.
pub fn run(options: &DriverOptions) -> Result<Option<Runtime>, Error> {
    run_with_config(options, options.runtime_config())
}

pub fn run_with_config(options: &DriverOptions, config: RuntimeConfig) -> Result<Option<Runtime>, Error> {
    if options.files.is_empty() {
        return Ok(None);
    }

    let source_path = SourcePath::new(options.search_roots.clone());
    let paths = options
        .files
        .iter()
        .map(|file| source_path.resolve(file))
        .collect::<Result<Vec<_>, _>>()?;

    let runtime = Runtime::with_config(config)?;
    for path in &paths {
        let source = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.clone(),
            source,
        })?;
        log::info!("loading {}", path.display());
        runtime.load_source(&source)?;
    }
    Ok(Some(runtime))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sourcepath_is_split_like_path() {
        let joined = std::env::join_paths(["lib", "vendor/st"]).unwrap();
        let cli = Cli::parse_from([
            OsString::from("stic"),
            OsString::from("--sourcepath"),
            joined,
            OsString::from("-v"),
            OsString::from("main.st"),
        ]);
        let options = cli.into_options();
        assert_eq!(options.search_roots, vec![PathBuf::from("lib"), PathBuf::from("vendor/st")]);
        assert_eq!(options.files, vec![PathBuf::from("main.st")]);
        assert!(options.verbose);
        assert!(!options.dump_bytecode);
    }

    #[test]
    fn working_directory_comes_last() {
        let path = SourcePath::new(vec![PathBuf::from("lib")]);
        assert_eq!(path.roots().len(), 2);
        assert_eq!(path.roots()[0], PathBuf::from("lib"));
    }

    #[test]
    fn nothing_to_run_builds_nothing() {
        assert!(run(&DriverOptions::default()).unwrap().is_none());
    }
}
