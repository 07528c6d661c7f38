use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::error::SeqpackError;
use crate::identity::{
    igem_mirror_url, igem_sequence_url, remap_prefix, unambiguous_dna_sequence, uri_to_accession,
    IGEM_SOURCE_PREFIX,
};
use crate::import::{read_legacy_records, write_legacy_records};
use crate::package::Package;
use crate::retrieve::PartRetriever;
use crate::synbiohub::{merge_records, PullError, SbhHttpClient, SynbiohubClient};

pub trait RegistryClient {
    fn fetch_part_sequence(&self, accession: &str) -> Result<String, SeqpackError>;
}

#[derive(Clone)]
pub struct RegistryHttpClient {
    client: Client,
}

impl RegistryHttpClient {
    pub fn new(timeout: Duration) -> Result<Self, SeqpackError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("seqpack/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SeqpackError::RegistryHttp(err.to_string()))?;
        Ok(Self { client })
    }
}

impl RegistryClient for RegistryHttpClient {
    fn fetch_part_sequence(&self, accession: &str) -> Result<String, SeqpackError> {
        let response = self
            .client
            .get(igem_sequence_url(accession))
            .send()
            .map_err(|err| SeqpackError::RegistryHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(SeqpackError::RegistryHttp(format!(
                "registry returned status {}",
                response.status().as_u16()
            )));
        }
        let text = response
            .text()
            .map_err(|err| SeqpackError::RegistryHttp(err.to_string()))?;
        Ok(text.trim().to_string())
    }
}

/// Retrieves iGEM parts from the SynBioHub mirror when possible, direct from
/// the Registry when not.
pub struct IgemRetriever<S: SynbiohubClient, R: RegistryClient> {
    mirror: S,
    registry: R,
}

impl IgemRetriever<SbhHttpClient, RegistryHttpClient> {
    pub fn with_default_clients(config: &ResolvedConfig) -> Result<Self, SeqpackError> {
        Ok(Self::new(
            SbhHttpClient::new("https://synbiohub.org")?,
            RegistryHttpClient::new(config.registry_timeout)?,
        ))
    }
}

impl<S: SynbiohubClient, R: RegistryClient> IgemRetriever<S, R> {
    pub fn new(mirror: S, registry: R) -> Self {
        Self { mirror, registry }
    }
}

impl<S: SynbiohubClient, R: RegistryClient> PartRetriever for IgemRetriever<S, R> {
    fn retrieve(&self, uris: &[String], package: &Package) -> Result<Vec<String>, SeqpackError> {
        let legacy_cache = package.igem_legacy_cache_path();
        // read any current material to avoid overwriting it
        let mut records = read_legacy_records(&legacy_cache)?;

        info!(count = uris.len(), "attempting to retrieve parts from iGEM");
        let mut retrieved = Vec::new();
        let mut retrieved_fasta = String::new();
        let mut structured_count = 0usize;
        let mut fasta_count = 0usize;
        // one part at a time: a single missing accession fails a batched
        // lookup against the mirror
        for uri in uris {
            let accession = uri_to_accession(&remap_prefix(uri), IGEM_SOURCE_PREFIX);
            let mirror_url = igem_mirror_url(&accession);
            info!(url = %mirror_url, "attempting to retrieve iGEM record from SynBioHub mirror");
            match self.mirror.pull(&mirror_url) {
                Ok(pulled) => {
                    merge_records(&mut records, pulled);
                    retrieved.push(uri.clone());
                    structured_count += 1;
                    info!("successfully retrieved from SynBioHub mirror");
                }
                Err(PullError::NotFound) => {
                    let fallback_url = igem_sequence_url(&accession);
                    info!(
                        url = %fallback_url,
                        "mirror retrieval failed; attempting raw sequence from iGEM Registry"
                    );
                    match self.registry.fetch_part_sequence(&accession) {
                        Ok(captured) => {
                            if unambiguous_dna_sequence(&captured) {
                                retrieved_fasta.push_str(&format!("> {accession}\n{captured}\n"));
                                retrieved.push(uri.clone());
                                fasta_count += 1;
                                info!("successfully retrieved from iGEM Registry");
                            } else {
                                warn!(
                                    accession = %accession,
                                    captured = %captured,
                                    "retrieved text is not a DNA sequence"
                                );
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "could not retrieve from iGEM Registry");
                        }
                    }
                }
                // not a "not found" error: fail upward
                Err(PullError::Other(err)) => return Err(err),
            }
        }

        if structured_count > 0 {
            info!(
                count = structured_count,
                cache = %legacy_cache,
                "writing iGEM structured records"
            );
            write_legacy_records(&legacy_cache, &records)?;
        }
        if fasta_count > 0 {
            let fasta_cache = package.igem_fasta_cache_path();
            info!(
                count = fasta_count,
                cache = %fasta_cache,
                "appending iGEM raw sequences"
            );
            Package::append_bytes(&fasta_cache, retrieved_fasta.as_bytes())?;
        }
        Ok(retrieved)
    }
}
