use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum SeqpackError {
    #[error("unknown file type: \"{0}\"")]
    UnknownFileType(String),

    #[error("package specification not found at {0}")]
    SpecificationMissing(Utf8PathBuf),

    #[error("collection not found in package specification: {0}")]
    CollectionMissing(String),

    #[error("failed to parse {path}: {message}")]
    DocumentParse { path: Utf8PathBuf, message: String },

    #[error("failed to parse FASTA file {path}: {message}")]
    FastaParse { path: Utf8PathBuf, message: String },

    #[error("failed to parse GenBank records from {source_name}: {message}")]
    GenbankParse {
        source_name: String,
        message: String,
    },

    #[error("failed to parse structured cache {path}: {message}")]
    LegacyCacheParse { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("NCBI request failed: {0}")]
    NcbiHttp(String),

    #[error("NCBI returned status {status}: {message}")]
    NcbiStatus { status: u16, message: String },

    #[error("iGEM registry request failed: {0}")]
    RegistryHttp(String),

    #[error("SynBioHub request failed: {0}")]
    SynbiohubHttp(String),

    #[error("SynBioHub returned status {status}: {message}")]
    SynbiohubStatus { status: u16, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
