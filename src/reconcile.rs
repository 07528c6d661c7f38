use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::document::{Document, TopLevel};
use crate::error::SeqpackError;
use crate::inventory;
use crate::package::Package;
use crate::retrieve::SourceRouter;

pub const BASIC_PARTS_COLLECTION: &str = "BasicParts";

#[derive(Debug, Clone, Serialize)]
pub struct ImportReport {
    pub required: usize,
    pub with_sequence: usize,
    pub found_in_inventory: usize,
    pub missing: Vec<String>,
    pub unused: Vec<String>,
    pub retrieved: Vec<String>,
    pub still_missing: Vec<String>,
    pub completed_at: String,
}

/// Compare the package specification against the inventory and attempt to
/// import every missing part.
pub fn import_missing_parts(
    package: &Package,
    router: &SourceRouter,
) -> Result<ImportReport, SeqpackError> {
    let spec_path = package.specification_path();
    if !spec_path.as_std_path().exists() {
        return Err(SeqpackError::SpecificationMissing(spec_path));
    }
    let spec = Document::read(&spec_path)?;
    let required: Vec<String> = match spec.find_by_display_id(BASIC_PARTS_COLLECTION) {
        Some(TopLevel::Collection(collection)) => collection.members.clone(),
        _ => return Err(SeqpackError::CollectionMissing(BASIC_PARTS_COLLECTION.to_string())),
    };
    info!(count = required.len(), "package specification lists parts");

    let inventory = inventory::scan(package)?;
    info!(
        count = inventory.location_count(),
        "found parts cached in package design files"
    );

    // a part already carrying sequence data is satisfied regardless of the
    // inventory
    let with_sequence: BTreeSet<&String> = required
        .iter()
        .filter(|member| {
            spec.find_component(member.as_str())
                .is_some_and(|component| !component.sequences.is_empty())
        })
        .collect();
    let found: BTreeSet<&String> = required
        .iter()
        .filter(|member| inventory.contains_alias(member.as_str()))
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|member| {
            !with_sequence.contains(*member) && !inventory.contains_alias(member.as_str())
        })
        .cloned()
        .collect::<BTreeSet<String>>()
        .into_iter()
        .collect();

    let used: BTreeSet<&str> = found
        .iter()
        .filter_map(|member| inventory.canonical(member.as_str()))
        .collect();
    let unused: Vec<String> = inventory
        .location_uris()
        .filter(|uri| !used.contains(uri))
        .map(str::to_string)
        .collect();

    info!(
        with_sequence = with_sequence.len(),
        found = found.len(),
        missing = missing.len(),
        "compared specification against inventory"
    );
    if !unused.is_empty() {
        info!(
            count = unused.len(),
            parts = %unused.join(" "),
            "parts in directory are not used in package"
        );
    }

    let mut report = ImportReport {
        required: required.len(),
        with_sequence: with_sequence.len(),
        found_in_inventory: found.len(),
        missing: missing.clone(),
        unused,
        retrieved: Vec::new(),
        still_missing: Vec::new(),
        completed_at: chrono::Utc::now().to_rfc3339(),
    };

    if missing.is_empty() {
        info!("no missing sequences");
        return Ok(report);
    }

    info!("attempting to download missing parts");
    let retrieved = router.retrieve(&missing, package)?;
    let retrieved_set: BTreeSet<&String> = retrieved.iter().collect();
    let still_missing: Vec<String> = missing
        .iter()
        .filter(|uri| !retrieved_set.contains(uri))
        .cloned()
        .collect();
    info!(
        retrieved = retrieved.len(),
        missing = missing.len(),
        "finished retrieval of missing sequences"
    );
    if !still_missing.is_empty() {
        warn!(parts = %still_missing.join(" "), "still missing after retrieval");
    }

    report.retrieved = retrieved;
    report.still_missing = still_missing;
    report.completed_at = chrono::Utc::now().to_rfc3339();
    Ok(report)
}
