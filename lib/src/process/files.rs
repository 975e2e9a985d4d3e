use super::class_file::{is_class_file, update_model, ClassFileProcessor};
use crate::model::Model;
use crate::ProcessError;
use log::{debug, warn};
use std::collections::HashSet;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

const ZIP_MAGIC: [u8; 4] = *b"PK\x03\x04";
const EMPTY_ZIP_MAGIC: [u8; 4] = *b"PK\x05\x06";

/// An input and where its transformed version is written
///
/// Both sides may be directories, in which case every file under the input maps to the same
/// relative path under the output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FilePair {
    pub input: PathBuf,
    pub output: PathBuf,
}

impl FilePair {
    pub fn new(input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> FilePair {
        FilePair {
            input: input.into(),
            output: output.into(),
        }
    }

    /// Transform a file and write it back where it was
    pub fn in_place(path: impl Into<PathBuf>) -> FilePair {
        let path = path.into();
        FilePair::new(path.clone(), path)
    }

    /// Pairs of regular files, expanding directories recursively
    ///
    /// Inputs that don't exist expand to nothing.
    pub fn expand(&self) -> io::Result<Vec<FilePair>> {
        if self.input.is_file() {
            return Ok(vec![self.clone()]);
        }
        let mut pairs = vec![];
        if self.input.is_dir() {
            for name in sorted_entries(&self.input)? {
                let pair = FilePair::new(self.input.join(&name), self.output.join(&name));
                pairs.extend(pair.expand()?);
            }
        }
        Ok(pairs)
    }

    fn is_in_place(&self) -> bool {
        if self.input == self.output {
            return true;
        }
        match (self.input.canonicalize(), self.output.canonicalize()) {
            (Ok(input), Ok(output)) => input == output,
            _ => false,
        }
    }
}

fn sorted_entries(directory: &Path) -> io::Result<Vec<std::ffi::OsString>> {
    let mut names = fs::read_dir(directory)?
        .map(|entry| entry.map(|entry| entry.file_name()))
        .collect::<io::Result<Vec<_>>>()?;
    names.sort();
    Ok(names)
}

fn is_zip(path: &Path) -> io::Result<bool> {
    let mut magic = [0; 4];
    match File::open(path)?.read_exact(&mut magic) {
        Ok(()) => Ok(magic == ZIP_MAGIC || magic == EMPTY_ZIP_MAGIC),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(err) => Err(err),
    }
}

fn display_path(path: &Path) -> String {
    match path.canonicalize() {
        Ok(canonical) => canonical.display().to_string(),
        Err(_) => path.display().to_string(),
    }
}

/// Visit every entry of an archive, skipping entries whose name was already seen
fn for_each_zip_entry(
    path: &Path,
    mut consume: impl FnMut(&str, bool, Vec<u8>) -> Result<(), ProcessError>,
) -> Result<(), ProcessError> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let mut seen: HashSet<String> = HashSet::new();

    for index in 0..archive.len() {
        let (name, is_dir, bytes) = {
            let mut entry = archive.by_index(index)?;
            let name = entry.name().to_owned();
            if seen.contains(&name) {
                debug!("Skipping duplicate entry '{}' in {}", name, path.display());
                continue;
            }
            let mut bytes = vec![];
            entry.read_to_end(&mut bytes)?;
            (name, entry.is_dir(), bytes)
        };
        seen.insert(name.clone());

        consume(&name, is_dir, bytes)
            .map_err(|err| err.context(format!("Failed to process zip '{}'", display_path(path))))?;
    }
    Ok(())
}

/// Register every class found under a path (a class file, a jar, or a directory of either)
///
/// Classes that don't parse are skipped here. Inputs among them fail again, and get reported,
/// when they are transformed.
pub fn populate_model(model: &mut Model, path: &Path) -> Result<(), ProcessError> {
    if path.is_dir() {
        for name in sorted_entries(path)? {
            populate_model(model, &path.join(name))?;
        }
    } else if path.is_file() {
        if is_zip(path)? {
            for_each_zip_entry(path, |name, is_dir, bytes| {
                if !is_dir && is_class_file(name, &bytes) {
                    if let Err(err) = update_model(model, &bytes) {
                        warn!("Skipping '{}' in '{}': {}", name, path.display(), err);
                    }
                }
                Ok(())
            })?;
        } else {
            let bytes = fs::read(path)?;
            if is_class_file(&path.to_string_lossy(), &bytes) {
                if let Err(err) = update_model(model, &bytes) {
                    warn!("Skipping '{}': {}", path.display(), err);
                }
            }
        }
    }
    Ok(())
}

/// Transform one regular file: a class, an archive, or anything else (copied)
pub fn process_file(pair: &FilePair, processor: &ClassFileProcessor) -> Result<(), ProcessError> {
    if let Some(parent) = pair.output.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            fs::create_dir_all(parent).map_err(|source| ProcessError::CreateDirectory {
                directory: parent.to_owned(),
                source,
            })?;
        }
    }
    if !pair.input.is_file() {
        return Ok(());
    }

    if is_zip(&pair.input)? {
        return process_zip(pair, processor);
    }

    let bytes = fs::read(&pair.input)?;
    let name = display_path(&pair.input);
    if is_class_file(&name, &bytes) {
        let transformed = processor
            .process(&bytes)
            .map_err(|err| err.context(format!("Failed to transform file '{}'", name)))?;
        fs::write(&pair.output, transformed)?;
    } else if !pair.is_in_place() {
        fs::write(&pair.output, bytes)?;
    }
    Ok(())
}

/// Rewrite an archive next to its output, then move it into place
///
/// A failed archive leaves no output behind (and an archive transformed in place is left as it
/// was).
fn process_zip(pair: &FilePair, processor: &ClassFileProcessor) -> Result<(), ProcessError> {
    let mut temporary_name = pair.output.file_name().unwrap_or_default().to_os_string();
    temporary_name.push(".tmp");
    let temporary = pair.output.with_file_name(temporary_name);
    match write_zip(&pair.input, &temporary, processor) {
        Ok(()) => {
            fs::rename(&temporary, &pair.output)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&temporary);
            Err(err)
        }
    }
}

fn write_zip(
    input: &Path,
    output: &Path,
    processor: &ClassFileProcessor,
) -> Result<(), ProcessError> {
    let mut writer = ZipWriter::new(File::create(output)?);
    let options = SimpleFileOptions::default();

    for_each_zip_entry(input, |name, is_dir, bytes| {
        write_entry(&mut writer, options, name, is_dir, bytes, processor)
            .map_err(|err| err.context(format!("Failed to process zip entry '{}'", name)))
    })?;

    writer.finish()?;
    Ok(())
}

fn write_entry(
    writer: &mut ZipWriter<File>,
    options: SimpleFileOptions,
    name: &str,
    is_dir: bool,
    bytes: Vec<u8>,
    processor: &ClassFileProcessor,
) -> Result<(), ProcessError> {
    if is_dir {
        writer.add_directory(name, options)?;
        return Ok(());
    }

    writer.start_file(name, options)?;
    let bytes = if is_class_file(name, &bytes) {
        processor
            .process(&bytes)
            .map_err(|err| err.context(format!("Failed to transform file '{}'", name)))?
    } else {
        bytes
    };
    writer.write_all(&bytes)?;
    Ok(())
}
