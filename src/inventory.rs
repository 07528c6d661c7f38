use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::fs::File;

use bio::io::fasta;
use camino::{Utf8Path, Utf8PathBuf};
use gb_io::reader::SeqReader;
use tracing::{debug, warn};

use crate::error::SeqpackError;
use crate::identity::{accession_to_uri, remap_prefix, IGEM_SOURCE_PREFIX, NCBI_PREFIX};
use crate::import::{genbank_locus, genbank_versioned_accession, FileType, ImportFile};
use crate::package::{Package, GENBANK_CACHE_FILE, IGEM_FASTA_CACHE_FILE};

/// Every part identity available in a package's cached files, keyed by URI and
/// by each known alias.
#[derive(Debug, Default)]
pub struct PackageInventory {
    files: Vec<ImportFile>,
    locations: BTreeMap<String, usize>,
    aliases: BTreeMap<String, String>,
}

impl PackageInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn files(&self) -> &[ImportFile] {
        &self.files
    }

    pub fn file_for(&self, uri: &str) -> Option<&ImportFile> {
        self.locations.get(uri).map(|index| &self.files[*index])
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &ImportFile)> {
        self.locations
            .iter()
            .map(|(uri, index)| (uri.as_str(), &self.files[*index]))
    }

    pub fn location_uris(&self) -> impl Iterator<Item = &str> {
        self.locations.keys().map(String::as_str)
    }

    pub fn location_count(&self) -> usize {
        self.locations.len()
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn canonical(&self, alias: &str) -> Option<&str> {
        self.aliases.get(alias).map(String::as_str)
    }

    pub fn contains_alias(&self, alias: &str) -> bool {
        self.aliases.contains_key(alias)
    }

    fn add_file(&mut self, file: ImportFile) -> usize {
        if let Some(index) = self.files.iter().position(|f| f == &file) {
            return index;
        }
        self.files.push(file);
        self.files.len() - 1
    }

    pub fn add(&mut self, file_index: usize, uri: String, aliases: &[String]) {
        match self.locations.entry(uri.clone()) {
            Entry::Occupied(entry) => {
                if *entry.get() != file_index {
                    warn!(uri = %uri, "inventory found duplicate of part");
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(file_index);
            }
        }

        let mut keys: BTreeSet<String> = aliases.iter().cloned().collect();
        keys.insert(uri.clone());
        for key in keys {
            match self.aliases.entry(key) {
                Entry::Occupied(entry) => {
                    // first write per alias wins; a conflicting later write is dropped
                    if entry.get() != &uri {
                        warn!(
                            alias = %entry.key(),
                            existing = %entry.get(),
                            dropped = %uri,
                            "inventory found duplicate of part"
                        );
                    }
                }
                Entry::Vacant(entry) => {
                    entry.insert(uri.clone());
                }
            }
        }
    }
}

/// Search a package's FASTA, GenBank, and canonical files for already
/// available parts.
pub fn scan(package: &Package) -> Result<PackageInventory, SeqpackError> {
    let mut inventory = PackageInventory::new();

    for path in files_with_extensions(package.root(), FileType::Fasta)? {
        let is_igem_cache = path.file_name() == Some(IGEM_FASTA_CACHE_FILE);
        let prefix = if is_igem_cache {
            IGEM_SOURCE_PREFIX.to_string()
        } else {
            package.namespace().to_string()
        };
        let file = File::open(path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))?;
        let index = inventory.add_file(ImportFile::with_type(
            path.clone(),
            FileType::Fasta,
            Some(&prefix),
        ));
        for record in fasta::Reader::new(file).records() {
            let record = record.map_err(|err| SeqpackError::FastaParse {
                path: path.clone(),
                message: err.to_string(),
            })?;
            inventory.add(index, accession_to_uri(record.id(), &prefix), &[]);
        }
    }

    for path in files_with_extensions(package.root(), FileType::Genbank)? {
        let is_ncbi_cache = path.file_name() == Some(GENBANK_CACHE_FILE);
        let prefix = if is_ncbi_cache {
            NCBI_PREFIX.to_string()
        } else {
            package.namespace().to_string()
        };
        let file = File::open(path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))?;
        let index = inventory.add_file(ImportFile::with_type(
            path.clone(),
            FileType::Genbank,
            Some(&prefix),
        ));
        for seq in SeqReader::new(file) {
            let seq = seq.map_err(|err| SeqpackError::GenbankParse {
                source_name: path.to_string(),
                message: err.to_string(),
            })?;
            let Some(locus) = genbank_locus(&seq) else {
                debug!(path = %path, "skipping GenBank record without a locus name");
                continue;
            };
            let versioned = genbank_versioned_accession(&seq).unwrap_or_else(|| locus.clone());
            inventory.add(
                index,
                accession_to_uri(&locus, &prefix),
                &[accession_to_uri(&versioned, &prefix)],
            );
        }
    }

    for path in files_with_extensions(package.root(), FileType::Canonical)? {
        let index = inventory.add_file(ImportFile::with_type(path, FileType::Canonical, None));
        let identities: Vec<String> = inventory.files[index]
            .document()?
            .components()
            .map(|component| component.identity.clone())
            .collect();
        for identity in identities {
            let remapped = remap_prefix(&identity);
            inventory.add(index, identity, &[remapped]);
        }
    }

    Ok(inventory)
}

fn files_with_extensions(
    root: &Utf8Path,
    file_type: FileType,
) -> Result<Vec<Utf8PathBuf>, SeqpackError> {
    let mut paths = Vec::new();
    let entries = fs::read_dir(root.as_std_path())
        .map_err(|err| SeqpackError::Filesystem(format!("{root}: {err}")))?;
    for entry in entries {
        let entry = entry.map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Ok(path) = Utf8PathBuf::from_path_buf(path) else {
            continue;
        };
        let name = path.file_name().unwrap_or_default();
        if file_type.extensions().iter().any(|ext| name.ends_with(ext)) {
            paths.push(path);
        }
    }
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;

    use super::*;

    fn import_file(name: &str) -> ImportFile {
        ImportFile::with_type(Utf8PathBuf::from(name), FileType::Fasta, Some("https://example.org"))
    }

    #[test]
    fn first_alias_write_wins() {
        let mut inventory = PackageInventory::new();
        let first = inventory.add_file(import_file("a.fasta"));
        let second = inventory.add_file(import_file("b.fasta"));

        inventory.add(first, "https://example.org/p1".to_string(), &[]);
        inventory.add(second, "https://example.org/p2".to_string(), &["https://example.org/p1".to_string()]);

        assert_eq!(inventory.canonical("https://example.org/p1"), Some("https://example.org/p1"));
        assert_eq!(inventory.canonical("https://example.org/p2"), Some("https://example.org/p2"));
        assert_eq!(
            inventory.file_for("https://example.org/p1").unwrap().path().as_str(),
            "a.fasta"
        );
    }

    #[test]
    fn alias_map_is_closed_over_locations() {
        let mut inventory = PackageInventory::new();
        let index = inventory.add_file(import_file("a.fasta"));
        inventory.add(
            index,
            "https://example.org/p1".to_string(),
            &["https://example.org/alias1".to_string(), "https://example.org/alias2".to_string()],
        );
        inventory.add(index, "https://example.org/p2".to_string(), &[]);

        for uri in inventory.aliases().values() {
            assert!(inventory.file_for(uri).is_some());
        }
    }

    #[test]
    fn files_are_deduplicated_by_path() {
        let mut inventory = PackageInventory::new();
        let first = inventory.add_file(import_file("a.fasta"));
        let second = inventory.add_file(import_file("a.fasta"));
        assert_eq!(first, second);
        assert_eq!(inventory.files().len(), 1);
    }
}
