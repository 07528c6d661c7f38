use std::io::Cursor;
use std::time::Duration;

use gb_io::reader::SeqReader;
use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::error::SeqpackError;
use crate::identity::{accession_to_uri, uri_to_accession, NCBI_PREFIX};
use crate::import::genbank_versioned_accession;
use crate::package::Package;
use crate::retrieve::PartRetriever;

const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

pub trait EntrezClient {
    fn efetch_nucleotide(&self, accessions: &[String]) -> Result<String, SeqpackError>;
}

#[derive(Clone)]
pub struct EntrezHttpClient {
    client: Client,
    email: String,
}

impl EntrezHttpClient {
    pub fn new(email: &str) -> Result<Self, SeqpackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("seqpack/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SeqpackError::NcbiHttp(err.to_string()))?;
        Ok(Self {
            client,
            email: email.to_string(),
        })
    }
}

impl EntrezClient for EntrezHttpClient {
    fn efetch_nucleotide(&self, accessions: &[String]) -> Result<String, SeqpackError> {
        let id = accessions.join(",");
        let response = self
            .client
            .get(format!("{EUTILS_BASE}/efetch.fcgi"))
            .query(&[
                ("db", "nucleotide"),
                ("rettype", "gb"),
                ("retmode", "text"),
                ("id", id.as_str()),
                ("tool", "seqpack"),
                ("email", self.email.as_str()),
            ])
            .send()
            .map_err(|err| SeqpackError::NcbiHttp(err.to_string()))?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "NCBI request failed".to_string());
            return Err(SeqpackError::NcbiStatus { status, message });
        }
        response
            .text()
            .map_err(|err| SeqpackError::NcbiHttp(err.to_string()))
    }
}

pub struct GenbankRetriever<C: EntrezClient> {
    client: C,
}

impl<C: EntrezClient> GenbankRetriever<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: EntrezClient> PartRetriever for GenbankRetriever<C> {
    fn retrieve(&self, uris: &[String], package: &Package) -> Result<Vec<String>, SeqpackError> {
        // everything but the accession is stripped for the batched lookup
        let accessions: Vec<String> = uris
            .iter()
            .map(|uri| uri_to_accession(uri, NCBI_PREFIX))
            .collect();
        info!(
            count = uris.len(),
            ids = %accessions.join(","),
            "attempting to retrieve parts from NCBI"
        );
        let text = match self.client.efetch_nucleotide(&accessions) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "NCBI retrieval failed");
                return Ok(Vec::new());
            }
        };

        let mut retrieved = Vec::new();
        let mut flat_file = Vec::new();
        for seq in SeqReader::new(Cursor::new(text.into_bytes())) {
            let seq = seq.map_err(|err| SeqpackError::GenbankParse {
                source_name: "NCBI efetch response".to_string(),
                message: err.to_string(),
            })?;
            seq.write(&mut flat_file)
                .map_err(|err| SeqpackError::Filesystem(err.to_string()))?;
            if let Some(accession) = genbank_versioned_accession(&seq) {
                retrieved.push(accession_to_uri(&accession, NCBI_PREFIX));
            }
        }

        if !retrieved.is_empty() {
            let cache_file = package.genbank_cache_path();
            info!(
                count = retrieved.len(),
                cache = %cache_file,
                "retrieved records from NCBI; appending to cache"
            );
            Package::append_bytes(&cache_file, &flat_file)?;
        }
        Ok(retrieved)
    }
}
