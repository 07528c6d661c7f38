use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::info;

use crate::document::{rewrite_object_references, sorted_ntriples, Document};
use crate::error::SeqpackError;
use crate::inventory;
use crate::package::Package;

#[derive(Debug, Clone, Serialize)]
pub struct CollationSummary {
    pub output_path: String,
    pub objects: usize,
    pub replaced: usize,
    pub rewritten: usize,
}

/// Unify the package specification with every cached file into one complete
/// document and write it out.
pub fn collate_package(package: &Package) -> Result<CollationSummary, SeqpackError> {
    info!(package = %package.root(), "collating materials for package");
    let spec_path = package.specification_path();
    if !spec_path.as_std_path().exists() {
        return Err(SeqpackError::SpecificationMissing(spec_path));
    }
    let mut doc = Document::read(&spec_path)?;

    let inventory = inventory::scan(package)?;

    // specification objects superseded by imported files
    let to_remove: Vec<String> = doc
        .objects()
        .iter()
        .map(|object| object.identity().to_string())
        .filter(|identity| inventory.contains_alias(identity))
        .collect();
    info!(count = to_remove.len(), "removing objects to be replaced by imports");
    let removal: BTreeSet<String> = to_remove.iter().cloned().collect();
    doc.remove_identities(&removal);

    for file in inventory.files() {
        let import_doc = file.document()?;
        info!(
            count = import_doc.objects().len(),
            path = %file.path(),
            "importing objects from file"
        );
        for object in import_doc.objects() {
            // identity-based dedup; the first copy wins
            if doc.contains(object.identity()) {
                continue;
            }
            doc.add(object.clone());
        }
    }

    let plan: BTreeMap<String, String> = to_remove
        .iter()
        .filter_map(|identity| {
            inventory
                .canonical(identity)
                .filter(|alias| *alias != identity)
                .map(|alias| (identity.clone(), alias.to_string()))
        })
        .collect();
    info!(count = plan.len(), "rewriting removed objects to their aliases");

    let mut statements = doc.to_statements();
    rewrite_object_references(&mut statements, &plan);
    let serialized = sorted_ntriples(&statements);

    package.ensure_export_dir()?;
    let target = package.collated_path();
    info!(path = %target, "writing collated document");
    Package::write_bytes_atomic(&target, serialized.as_bytes())?;

    Ok(CollationSummary {
        output_path: target.to_string(),
        objects: doc.objects().len(),
        replaced: to_remove.len(),
        rewritten: plan.len(),
    })
}
