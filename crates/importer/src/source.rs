//! Input sources for class files: directory trees, archives, in-memory
//! buffers, plus the auxiliary classpath used to enrich stubs.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use archgraph_class_file::{ClassDeclaration, ClassFileError, ClassReader};
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::{ImportError, ImportFailure, Result};

const CLASS_FILE_EXTENSION: &str = "class";

/// Upper bound on the buffer capacity trusted from an archive entry's
/// declared size; the declaration is attacker-controlled header data, so
/// larger entries grow the buffer by actually producing bytes.
const MAX_ENTRY_PREALLOCATION: u64 = 1 << 20;

fn entry_capacity(declared_size: u64) -> usize {
    declared_size.min(MAX_ENTRY_PREALLOCATION) as usize
}

/// Where class files for a run come from.
#[derive(Debug, Clone)]
pub enum ClassFileSource {
    /// Recursively import every `*.class` file under a directory
    Directory(PathBuf),
    /// Import every `*.class` entry of a JAR/ZIP archive
    Archive(PathBuf),
    /// Import from an in-memory buffer; `name` is used in failure reports
    Buffer { name: String, bytes: Vec<u8> },
}

/// One class file's bytes together with where they came from.
#[derive(Debug)]
pub(crate) struct LocatedClassFile {
    pub location: String,
    pub bytes: Vec<u8>,
}

/// Expand all sources into concrete class-file payloads.
///
/// A missing source path or a structurally broken archive is fatal; a single
/// unreadable file inside a directory only produces a per-file failure.
pub(crate) fn enumerate(
    sources: &[ClassFileSource],
) -> Result<(Vec<LocatedClassFile>, Vec<ImportFailure>)> {
    let mut located = Vec::new();
    let mut failures = Vec::new();

    for source in sources {
        match source {
            ClassFileSource::Directory(path) => {
                enumerate_directory(path, &mut located, &mut failures)?
            }
            ClassFileSource::Archive(path) => enumerate_archive(path, &mut located)?,
            ClassFileSource::Buffer { name, bytes } => located.push(LocatedClassFile {
                location: name.clone(),
                bytes: bytes.clone(),
            }),
        }
    }

    log::info!("found {} class file(s) across {} source(s)", located.len(), sources.len());
    Ok((located, failures))
}

fn enumerate_directory(
    path: &Path,
    located: &mut Vec<LocatedClassFile>,
    failures: &mut Vec<ImportFailure>,
) -> Result<()> {
    if !path.is_dir() {
        return Err(ImportError::SourceNotFound(path.to_path_buf()));
    }

    for entry in WalkDir::new(path).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                log::warn!("failed to read directory entry: {error}");
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_class_file(entry.path()) {
            continue;
        }

        let location = entry.path().display().to_string();
        match fs::read(entry.path()) {
            Ok(bytes) => located.push(LocatedClassFile { location, bytes }),
            Err(error) => failures.push(ImportFailure {
                location,
                error: ClassFileError::Io(error),
            }),
        }
    }
    Ok(())
}

fn enumerate_archive(path: &Path, located: &mut Vec<LocatedClassFile>) -> Result<()> {
    if !path.is_file() {
        return Err(ImportError::SourceNotFound(path.to_path_buf()));
    }

    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file).map_err(|source| ImportError::Archive {
        path: path.to_path_buf(),
        source,
    })?;

    for index in 0..archive.len() {
        let mut entry = archive.by_index(index).map_err(|source| ImportError::Archive {
            path: path.to_path_buf(),
            source,
        })?;
        if !entry.name().ends_with(".class") {
            continue;
        }

        let mut bytes = Vec::with_capacity(entry_capacity(entry.size()));
        entry.read_to_end(&mut bytes)?;
        located.push(LocatedClassFile {
            location: format!("{}!{}", path.display(), entry.name()),
            bytes,
        });
    }
    Ok(())
}

fn is_class_file(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .map(|extension| extension == CLASS_FILE_EXTENSION)
        .unwrap_or(false)
}

/// Classpath-like locations consulted only to enrich stub descriptors with
/// declaration metadata; never triggers a full import.
#[derive(Debug, Default)]
pub(crate) struct AuxiliaryClasspath {
    directories: Vec<PathBuf>,
    archives: Vec<PathBuf>,
}

impl AuxiliaryClasspath {
    /// Split locations into directories and archives. Nonexistent locations
    /// are fatal, same as primary sources.
    pub fn new(locations: &[PathBuf]) -> Result<Self> {
        let mut classpath = Self::default();
        for location in locations {
            if location.is_dir() {
                classpath.directories.push(location.clone());
            } else if location.is_file() {
                classpath.archives.push(location.clone());
            } else {
                return Err(ImportError::SourceNotFound(location.clone()));
            }
        }
        Ok(classpath)
    }

    /// Best-effort lookup of a class declaration by dotted name. Any failure
    /// along the way is skipped; a miss just leaves the stub bare.
    pub fn find_declaration(&self, class_name: &str) -> Option<ClassDeclaration> {
        let relative = format!("{}.class", class_name.replace('.', "/"));

        for directory in &self.directories {
            let candidate = directory.join(&relative);
            if !candidate.is_file() {
                continue;
            }
            match fs::read(&candidate).map_err(ClassFileError::Io).and_then(|bytes| {
                ClassReader::read_declaration(&bytes)
            }) {
                Ok(declaration) => return Some(declaration),
                Err(error) => {
                    log::debug!("skipping stub enrichment from {}: {error}", candidate.display());
                }
            }
        }

        for archive_path in &self.archives {
            match read_declaration_from_archive(archive_path, &relative) {
                Ok(Some(declaration)) => return Some(declaration),
                Ok(None) => {}
                Err(error) => {
                    log::debug!(
                        "skipping stub enrichment from {}: {error}",
                        archive_path.display()
                    );
                }
            }
        }

        None
    }
}

fn read_declaration_from_archive(
    path: &Path,
    entry_name: &str,
) -> std::result::Result<Option<ClassDeclaration>, Box<dyn std::error::Error>> {
    let file = fs::File::open(path)?;
    let mut archive = ZipArchive::new(file)?;
    let mut entry = match archive.by_name(entry_name) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(error) => return Err(error.into()),
    };

    let mut bytes = Vec::with_capacity(entry_capacity(entry.size()));
    entry.read_to_end(&mut bytes)?;
    Ok(Some(ClassReader::read_declaration(&bytes)?))
}
