use std::collections::BTreeMap;
use std::io::{self, Write};

use serde::Serialize;

use crate::collate::CollationSummary;
use crate::inventory::PackageInventory;
use crate::reconcile::ImportReport;

#[derive(Debug, Clone, Serialize)]
pub struct InventoryListing {
    pub parts: Vec<InventoryEntry>,
    pub aliases: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InventoryEntry {
    pub uri: String,
    pub file: String,
    pub file_type: String,
}

impl InventoryListing {
    pub fn from_inventory(inventory: &PackageInventory) -> Self {
        Self {
            parts: inventory
                .entries()
                .map(|(uri, file)| InventoryEntry {
                    uri: uri.to_string(),
                    file: file.path().to_string(),
                    file_type: file.file_type().to_string(),
                })
                .collect(),
            aliases: inventory.aliases().clone(),
        }
    }
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_report(result: &ImportReport) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_collation(result: &CollationSummary) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_inventory(result: &InventoryListing) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}
