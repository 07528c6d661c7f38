use std::cell::RefCell;
use std::fs::File;
use std::rc::Rc;

use assert_matches::assert_matches;
use bio::io::fasta;
use camino::Utf8PathBuf;
use gb_io::seq::Seq;

use seqpack::config::DEFAULT_NAMESPACE;
use seqpack::document::{Collection, Component, Document, Sequence, TopLevel};
use seqpack::error::SeqpackError;
use seqpack::genbank::{EntrezClient, GenbankRetriever};
use seqpack::identity::{IGEM_SOURCE_PREFIX, NCBI_PREFIX};
use seqpack::package::Package;
use seqpack::reconcile::{import_missing_parts, BASIC_PARTS_COLLECTION};
use seqpack::retrieve::{PartRetriever, SourceRouter};

struct RecordingRetriever {
    calls: Rc<RefCell<Vec<Vec<String>>>>,
    reply: Vec<String>,
}

impl PartRetriever for RecordingRetriever {
    fn retrieve(&self, uris: &[String], _package: &Package) -> Result<Vec<String>, SeqpackError> {
        self.calls.borrow_mut().push(uris.to_vec());
        Ok(self.reply.clone())
    }
}

fn test_package(temp: &tempfile::TempDir) -> Package {
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    Package::new(root, DEFAULT_NAMESPACE)
}

fn write_spec(package: &Package, doc: &Document) {
    package.ensure_export_dir().unwrap();
    std::fs::write(
        package.specification_path().as_std_path(),
        doc.to_sorted_ntriples(),
    )
    .unwrap();
}

fn basic_parts_spec(package: &Package, members: &[&str]) -> Document {
    let namespace = package.namespace().to_string();
    let mut doc = Document::new();
    doc.add(TopLevel::Collection(Collection {
        identity: format!("{namespace}/{BASIC_PARTS_COLLECTION}"),
        display_id: BASIC_PARTS_COLLECTION.to_string(),
        namespace: namespace.clone(),
        name: None,
        members: members.iter().map(|member| member.to_string()).collect(),
    }));
    doc
}

#[test]
fn satisfied_packages_perform_no_network_calls() {
    let temp = tempfile::tempdir().unwrap();
    let package = test_package(&temp);
    let namespace = package.namespace().to_string();

    // P1 has no attached sequence but is available in a cached FASTA file
    let p1 = format!("{namespace}/J23101");
    // P2 carries its own sequence data in the specification
    let p2 = format!("{namespace}/J23119");
    let mut spec = basic_parts_spec(&package, &[&p1, &p2]);
    spec.add(TopLevel::Component(Component::dna(p1.clone(), namespace.as_str())));
    let mut with_sequence = Component::dna(p2.clone(), namespace.as_str());
    with_sequence.sequences.push(format!("{p2}_sequence"));
    spec.add(TopLevel::Component(with_sequence));
    spec.add(TopLevel::Sequence(Sequence::dna(
        format!("{p2}_sequence"),
        namespace.as_str(),
        "ttgacagctagctcagtcctaggtataatgctagc",
    )));
    write_spec(&package, &spec);

    let file = File::create(package.root().join("cached.fasta").as_std_path()).unwrap();
    let mut writer = fasta::Writer::new(file);
    writer.write("J23101", None, b"ttgacagctagctcag").unwrap();
    writer.flush().unwrap();
    drop(writer);

    let calls = Rc::new(RefCell::new(Vec::new()));
    let router = SourceRouter::new(vec![(
        NCBI_PREFIX.to_string(),
        Box::new(RecordingRetriever {
            calls: Rc::clone(&calls),
            reply: Vec::new(),
        }) as Box<dyn PartRetriever>,
    )]);

    let report = import_missing_parts(&package, &router).unwrap();

    assert_eq!(report.required, 2);
    assert_eq!(report.with_sequence, 1);
    assert_eq!(report.found_in_inventory, 1);
    assert!(report.missing.is_empty());
    assert!(report.retrieved.is_empty());
    assert!(report.still_missing.is_empty());
    assert!(calls.borrow().is_empty(), "no network activity expected");
}

#[test]
fn missing_set_excludes_parts_satisfied_by_sequence_or_alias() {
    let temp = tempfile::tempdir().unwrap();
    let package = test_package(&temp);
    let namespace = package.namespace().to_string();

    // A carries sequence data, B resolves through an alias, C is missing
    let a = format!("{namespace}/partA");
    let b = format!("{IGEM_SOURCE_PREFIX}K823005");
    let c = format!("{NCBI_PREFIX}AB000100_1");
    let mut spec = basic_parts_spec(&package, &[&a, &b, &c]);
    let mut part_a = Component::dna(a.clone(), namespace.as_str());
    part_a.sequences.push(format!("{a}_sequence"));
    spec.add(TopLevel::Component(part_a));
    spec.add(TopLevel::Sequence(Sequence::dna(
        format!("{a}_sequence"),
        namespace.as_str(),
        "atgc",
    )));
    spec.add(TopLevel::Component(Component::dna(
        b.clone(),
        IGEM_SOURCE_PREFIX.trim_end_matches('/'),
    )));
    spec.add(TopLevel::Component(Component::dna(
        c.clone(),
        NCBI_PREFIX.trim_end_matches('/'),
    )));
    write_spec(&package, &spec);

    // a canonical cache provides B under its mirror identity
    let mirror_identity = "https://synbiohub.org/public/igem/BBa_K823005";
    let mut cache = Document::new();
    cache.add(TopLevel::Component(Component::dna(
        mirror_identity,
        "https://synbiohub.org/public/igem",
    )));
    std::fs::write(
        package.root().join("igem_imports.nt").as_std_path(),
        cache.to_sorted_ntriples(),
    )
    .unwrap();

    let calls = Rc::new(RefCell::new(Vec::new()));
    let router = SourceRouter::new(vec![(
        NCBI_PREFIX.to_string(),
        Box::new(RecordingRetriever {
            calls: Rc::clone(&calls),
            reply: vec![c.clone()],
        }) as Box<dyn PartRetriever>,
    )]);

    let report = import_missing_parts(&package, &router).unwrap();

    assert_eq!(report.missing, vec![c.clone()]);
    assert_eq!(calls.borrow().as_slice(), &[vec![c.clone()]]);
    assert_eq!(report.retrieved, vec![c]);
    assert!(report.still_missing.is_empty());
}

struct FixedEntrez {
    text: String,
}

impl EntrezClient for FixedEntrez {
    fn efetch_nucleotide(&self, _accessions: &[String]) -> Result<String, SeqpackError> {
        Ok(self.text.clone())
    }
}

#[test]
fn partial_genbank_batches_are_reported_as_still_missing() {
    let temp = tempfile::tempdir().unwrap();
    let package = test_package(&temp);

    let ab1 = format!("{NCBI_PREFIX}AB1_1");
    let ab2 = format!("{NCBI_PREFIX}AB2_1");
    let mut spec = basic_parts_spec(&package, &[&ab1, &ab2]);
    spec.add(TopLevel::Component(Component::dna(
        ab1.clone(),
        NCBI_PREFIX.trim_end_matches('/'),
    )));
    spec.add(TopLevel::Component(Component::dna(
        ab2.clone(),
        NCBI_PREFIX.trim_end_matches('/'),
    )));
    write_spec(&package, &spec);

    // NCBI only returns the first record of the batch
    let mut seq = Seq::empty();
    seq.name = Some("AB1".to_string());
    seq.accession = Some("AB1".to_string());
    seq.version = Some("AB1.1".to_string());
    seq.seq = b"atgcatgc".to_vec();
    let mut text = Vec::new();
    seq.write(&mut text).unwrap();

    let router = SourceRouter::new(vec![(
        NCBI_PREFIX.to_string(),
        Box::new(GenbankRetriever::new(FixedEntrez {
            text: String::from_utf8(text).unwrap(),
        })) as Box<dyn PartRetriever>,
    )]);

    let report = import_missing_parts(&package, &router).unwrap();

    assert_eq!(report.retrieved, vec![ab1]);
    assert_eq!(report.still_missing, vec![ab2]);
    assert!(package.genbank_cache_path().as_std_path().exists());
}

#[test]
fn missing_specification_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let package = test_package(&temp);
    let router = SourceRouter::new(Vec::new());

    let err = import_missing_parts(&package, &router).unwrap_err();
    assert_matches!(err, SeqpackError::SpecificationMissing(_));
}

#[test]
fn specification_without_basic_parts_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let package = test_package(&temp);
    write_spec(&package, &Document::new());
    let router = SourceRouter::new(Vec::new());

    let err = import_missing_parts(&package, &router).unwrap_err();
    assert_matches!(err, SeqpackError::CollectionMissing(_));
}
