use std::cell::OnceCell;
use std::fmt;
use std::fs;
use std::fs::File;
use std::str::FromStr;

use bio::io::fasta;
use camino::{Utf8Path, Utf8PathBuf};
use gb_io::reader::SeqReader;
use gb_io::seq::Seq;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::document::{parent_namespace, Component, Document, Sequence, TopLevel};
use crate::error::SeqpackError;
use crate::identity::string_to_display_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Fasta,
    Genbank,
    LegacyStructured,
    Canonical,
}

impl FileType {
    pub fn extensions(self) -> &'static [&'static str] {
        match self {
            FileType::Fasta => &[".fasta", ".fa"],
            FileType::Genbank => &[".gb", ".genbank"],
            FileType::LegacyStructured => &[".json"],
            FileType::Canonical => &[".nt"],
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileType::Fasta => write!(f, "FASTA"),
            FileType::Genbank => write!(f, "GenBank"),
            FileType::LegacyStructured => write!(f, "Legacy"),
            FileType::Canonical => write!(f, "Canonical"),
        }
    }
}

impl FromStr for FileType {
    type Err = SeqpackError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "FASTA" => Ok(FileType::Fasta),
            "GenBank" => Ok(FileType::Genbank),
            "Legacy" => Ok(FileType::LegacyStructured),
            "Canonical" => Ok(FileType::Canonical),
            other => Err(SeqpackError::UnknownFileType(other.to_string())),
        }
    }
}

/// One cached file in the package parts inventory, with its contents realized
/// into the canonical document form at most once per process.
#[derive(Debug)]
pub struct ImportFile {
    path: Utf8PathBuf,
    file_type: FileType,
    namespace: Option<String>,
    doc: OnceCell<Document>,
}

impl PartialEq for ImportFile {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for ImportFile {}

impl ImportFile {
    pub fn new(
        path: Utf8PathBuf,
        file_type: &str,
        namespace: Option<&str>,
    ) -> Result<Self, SeqpackError> {
        Ok(Self::with_type(path, file_type.parse()?, namespace))
    }

    pub fn with_type(path: Utf8PathBuf, file_type: FileType, namespace: Option<&str>) -> Self {
        Self {
            path,
            file_type,
            namespace: namespace.map(|ns| ns.trim_end_matches('/').to_string()),
            doc: OnceCell::new(),
        }
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    pub fn file_type(&self) -> FileType {
        self.file_type
    }

    pub fn is_loaded(&self) -> bool {
        self.doc.get().is_some()
    }

    pub fn document(&self) -> Result<&Document, SeqpackError> {
        if let Some(doc) = self.doc.get() {
            return Ok(doc);
        }
        let doc = self.load()?;
        Ok(self.doc.get_or_init(|| doc))
    }

    fn load(&self) -> Result<Document, SeqpackError> {
        match self.file_type {
            FileType::Fasta => self.load_fasta(),
            FileType::Genbank => self.load_genbank(),
            FileType::LegacyStructured => {
                warn!(path = %self.path, "should not be importing directly from a legacy structured file");
                let records = read_legacy_records(&self.path)?;
                Ok(convert_legacy_records(&records))
            }
            FileType::Canonical => Document::read(&self.path),
        }
    }

    fn minting_namespace(&self) -> Result<&str, SeqpackError> {
        self.namespace.as_deref().ok_or_else(|| SeqpackError::DocumentParse {
            path: self.path.clone(),
            message: format!("{} files need a namespace to mint identities", self.file_type),
        })
    }

    fn load_fasta(&self) -> Result<Document, SeqpackError> {
        let namespace = self.minting_namespace()?;
        let file = File::open(self.path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{}: {err}", self.path)))?;
        let reader = fasta::Reader::new(file);
        let mut doc = Document::new();
        for record in reader.records() {
            let record = record.map_err(|err| SeqpackError::FastaParse {
                path: self.path.clone(),
                message: err.to_string(),
            })?;
            let identity = format!("{namespace}/{}", string_to_display_id(record.id()));
            let mut sequence = Sequence::dna(
                format!("{identity}_sequence"),
                namespace,
                String::from_utf8_lossy(record.seq()).to_string(),
            );
            sequence.name = Some(record.id().to_string());
            sequence.description = record.desc().map(str::to_string);
            let mut part = Component::dna(identity, namespace);
            part.sequences.push(sequence.identity.clone());
            doc.add(TopLevel::Sequence(sequence));
            doc.add(TopLevel::Component(part));
        }
        Ok(doc)
    }

    // GenBank goes through the legacy intermediate form on its way to canonical
    fn load_genbank(&self) -> Result<Document, SeqpackError> {
        let namespace = self.minting_namespace()?;
        let file = File::open(self.path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{}: {err}", self.path)))?;
        let mut records = Vec::new();
        for seq in SeqReader::new(file) {
            let seq = seq.map_err(|err| SeqpackError::GenbankParse {
                source_name: self.path.to_string(),
                message: err.to_string(),
            })?;
            records.push(legacy_record_from_genbank(&seq, namespace));
        }
        Ok(convert_legacy_records(&records))
    }
}

/// Intermediate structured record, as held in the legacy cache and returned by
/// structured-repository pulls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyRecord {
    pub identity: String,
    pub display_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub elements: Option<String>,
}

pub fn legacy_record_from_genbank(seq: &Seq, namespace: &str) -> LegacyRecord {
    let locus = genbank_locus(seq).unwrap_or_else(|| "unnamed".to_string());
    let display_id = string_to_display_id(&locus);
    LegacyRecord {
        identity: format!("{namespace}/{display_id}"),
        display_id,
        name: Some(locus),
        description: seq.definition.clone(),
        elements: (!seq.seq.is_empty()).then(|| String::from_utf8_lossy(&seq.seq).to_string()),
    }
}

pub fn genbank_locus(seq: &Seq) -> Option<String> {
    seq.name.clone().or_else(|| seq.accession.clone())
}

pub fn genbank_versioned_accession(seq: &Seq) -> Option<String> {
    seq.version
        .clone()
        .or_else(|| seq.accession.clone())
        .or_else(|| seq.name.clone())
}

pub fn convert_legacy_records(records: &[LegacyRecord]) -> Document {
    let mut doc = Document::new();
    for record in records {
        if doc.contains(&record.identity) {
            continue;
        }
        let namespace = parent_namespace(&record.identity);
        let mut part = Component::dna(record.identity.clone(), namespace.clone());
        part.display_id = record.display_id.clone();
        part.name = record.name.clone();
        part.description = record.description.clone();
        if let Some(elements) = &record.elements {
            let mut sequence =
                Sequence::dna(format!("{}_sequence", record.identity), namespace, elements.clone());
            sequence.name = record.name.clone();
            part.sequences.push(sequence.identity.clone());
            doc.add(TopLevel::Sequence(sequence));
        }
        doc.add(TopLevel::Component(part));
    }
    doc
}

pub fn read_legacy_records(path: &Utf8Path) -> Result<Vec<LegacyRecord>, SeqpackError> {
    if !path.as_std_path().exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))?;
    serde_json::from_str(&content).map_err(|err| SeqpackError::LegacyCacheParse {
        path: path.to_owned(),
        message: err.to_string(),
    })
}

pub fn write_legacy_records(path: &Utf8Path, records: &[LegacyRecord]) -> Result<(), SeqpackError> {
    let content = serde_json::to_vec_pretty(records)
        .map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
    crate::package::Package::write_bytes_atomic(path, &content)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;

    #[test]
    fn unknown_file_type_tag_is_rejected_at_construction() {
        let err = ImportFile::new(Utf8PathBuf::from("parts.sbol"), "SBOL1", None).unwrap_err();
        assert_matches!(err, SeqpackError::UnknownFileType(_));
    }

    #[test]
    fn fasta_load_mints_identities_and_caches() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("parts.fasta")).unwrap();
        let file = File::create(path.as_std_path()).unwrap();
        let mut writer = fasta::Writer::new(file);
        writer.write("J23101", Some("constitutive promoter"), b"tttacagctagctcagtcctaggtattatgctagc").unwrap();
        writer.flush().unwrap();
        drop(writer);

        let import = ImportFile::with_type(path, FileType::Fasta, Some("https://example.org/pkg/"));
        assert!(!import.is_loaded());
        let doc = import.document().unwrap();
        assert!(doc.contains("https://example.org/pkg/J23101"));
        assert!(doc.contains("https://example.org/pkg/J23101_sequence"));
        let part = doc.find_component("https://example.org/pkg/J23101").unwrap();
        assert_eq!(part.sequences, vec!["https://example.org/pkg/J23101_sequence"]);
        assert!(import.is_loaded());
        // second access reuses the realized document
        let again = import.document().unwrap();
        assert_eq!(again.objects().len(), doc.objects().len());
    }

    #[test]
    fn genbank_load_goes_through_the_legacy_form() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("records.gb")).unwrap();
        let mut seq = Seq::empty();
        seq.name = Some("AB000100".to_string());
        seq.accession = Some("AB000100".to_string());
        seq.version = Some("AB000100.1".to_string());
        seq.definition = Some("example record".to_string());
        seq.seq = b"atgcatgc".to_vec();
        let mut out = File::create(path.as_std_path()).unwrap();
        seq.write(&mut out).unwrap();
        drop(out);

        let import = ImportFile::with_type(
            path,
            FileType::Genbank,
            Some("https://www.ncbi.nlm.nih.gov/nuccore"),
        );
        let doc = import.document().unwrap();
        let part = doc
            .find_component("https://www.ncbi.nlm.nih.gov/nuccore/AB000100")
            .unwrap();
        assert_eq!(part.description.as_deref(), Some("example record"));
        assert_eq!(part.sequences.len(), 1);
    }

    #[test]
    fn legacy_conversion_links_sequences() {
        let records = vec![
            LegacyRecord {
                identity: "http://parts.igem.org/K808000".to_string(),
                display_id: "K808000".to_string(),
                name: Some("BBa_K808000".to_string()),
                description: None,
                elements: Some("atgc".to_string()),
            },
            LegacyRecord {
                identity: "http://parts.igem.org/K808001".to_string(),
                display_id: "K808001".to_string(),
                name: None,
                description: None,
                elements: None,
            },
        ];
        let doc = convert_legacy_records(&records);
        let with_seq = doc.find_component("http://parts.igem.org/K808000").unwrap();
        assert_eq!(with_seq.sequences, vec!["http://parts.igem.org/K808000_sequence"]);
        let without = doc.find_component("http://parts.igem.org/K808001").unwrap();
        assert!(without.sequences.is_empty());
        assert_eq!(doc.objects().len(), 3);
    }

    #[test]
    fn legacy_cache_roundtrip() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("cache.json")).unwrap();
        assert!(read_legacy_records(&path).unwrap().is_empty());

        let records = vec![LegacyRecord {
            identity: "http://parts.igem.org/K808000".to_string(),
            display_id: "K808000".to_string(),
            name: None,
            description: None,
            elements: Some("atgc".to_string()),
        }];
        write_legacy_records(&path, &records).unwrap();
        assert_eq!(read_legacy_records(&path).unwrap(), records);
    }
}
