use std::fs;
use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::SeqpackError;
use crate::identity::string_to_display_id;

pub const EXPORT_DIRECTORY: &str = "views";
pub const SPECIFICATION_FILE: &str = "package_specification.nt";
pub const COLLATED_FILE: &str = "package.nt";

pub const GENBANK_CACHE_FILE: &str = "GenBank_imports.gb";
pub const IGEM_LEGACY_CACHE_FILE: &str = "iGEM_structured_imports.json";
pub const IGEM_FASTA_CACHE_FILE: &str = "iGEM_raw_imports.fasta";

#[derive(Debug, Clone)]
pub struct Package {
    root: Utf8PathBuf,
    namespace: String,
}

impl Package {
    pub fn new(root: Utf8PathBuf, base_namespace: &str) -> Self {
        let name = root.file_name().unwrap_or("package");
        let namespace = format!(
            "{}/{}",
            base_namespace.trim_end_matches('/'),
            string_to_display_id(name)
        );
        Self { root, namespace }
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn export_dir(&self) -> Utf8PathBuf {
        self.root.join(EXPORT_DIRECTORY)
    }

    pub fn specification_path(&self) -> Utf8PathBuf {
        self.export_dir().join(SPECIFICATION_FILE)
    }

    pub fn collated_path(&self) -> Utf8PathBuf {
        self.export_dir().join(COLLATED_FILE)
    }

    pub fn genbank_cache_path(&self) -> Utf8PathBuf {
        self.root.join(GENBANK_CACHE_FILE)
    }

    pub fn igem_fasta_cache_path(&self) -> Utf8PathBuf {
        self.root.join(IGEM_FASTA_CACHE_FILE)
    }

    pub fn igem_legacy_cache_path(&self) -> Utf8PathBuf {
        self.root.join(IGEM_LEGACY_CACHE_FILE)
    }

    pub fn ensure_export_dir(&self) -> Result<(), SeqpackError> {
        fs::create_dir_all(self.export_dir().as_std_path())
            .map_err(|err| SeqpackError::Filesystem(err.to_string()))
    }

    pub fn write_bytes_atomic(path: &Utf8Path, content: &[u8]) -> Result<(), SeqpackError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("tmp");
        fs::write(tmp_path.as_std_path(), content)
            .map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
        Ok(())
    }

    pub fn append_bytes(path: &Utf8Path, content: &[u8]) -> Result<(), SeqpackError> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_std_path())
            .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))?;
        file.write_all(content)
            .map_err(|err| SeqpackError::Filesystem(format!("{path}: {err}")))
    }
}
