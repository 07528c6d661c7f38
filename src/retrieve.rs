use tracing::debug;

use crate::config::ResolvedConfig;
use crate::error::SeqpackError;
use crate::genbank::{EntrezHttpClient, GenbankRetriever};
use crate::identity::{
    IGEM_MIRROR_PREFIX, IGEM_SOURCE_PREFIX, NCBI_PREFIX, SYNBIOHUB_HOST_PREFIX,
};
use crate::igem::IgemRetriever;
use crate::package::Package;
use crate::synbiohub::{SbhHttpFactory, SynbiohubRetriever};

pub trait PartRetriever {
    fn retrieve(&self, uris: &[String], package: &Package) -> Result<Vec<String>, SeqpackError>;
}

/// Routes missing-part URIs to retrieval sources by prefix. The table is
/// ordered; the first matching prefix claims a URI.
pub struct SourceRouter {
    routes: Vec<(String, Box<dyn PartRetriever>)>,
}

impl SourceRouter {
    pub fn new(routes: Vec<(String, Box<dyn PartRetriever>)>) -> Self {
        Self { routes }
    }

    pub fn with_default_sources(config: &ResolvedConfig) -> Result<Self, SeqpackError> {
        Ok(Self::new(vec![
            (
                NCBI_PREFIX.to_string(),
                Box::new(GenbankRetriever::new(EntrezHttpClient::new(&config.ncbi_email)?)),
            ),
            (
                IGEM_MIRROR_PREFIX.to_string(),
                Box::new(IgemRetriever::with_default_clients(config)?),
            ),
            (
                IGEM_SOURCE_PREFIX.to_string(),
                Box::new(IgemRetriever::with_default_clients(config)?),
            ),
            (
                SYNBIOHUB_HOST_PREFIX.to_string(),
                Box::new(SynbiohubRetriever::new(SbhHttpFactory)),
            ),
        ]))
    }

    pub fn retrieve(
        &self,
        uris: &[String],
        package: &Package,
    ) -> Result<Vec<String>, SeqpackError> {
        let mut remaining: Vec<String> = uris.to_vec();
        let mut collected = Vec::new();
        for (prefix, retriever) in &self.routes {
            let (matches, rest): (Vec<String>, Vec<String>) = remaining
                .into_iter()
                .partition(|uri| uri.starts_with(prefix.as_str()));
            remaining = rest;
            if matches.is_empty() {
                continue;
            }
            collected.extend(retriever.retrieve(&matches, package)?);
        }
        for uri in &remaining {
            debug!(uri = %uri, "no retrieval source matches URI");
        }
        Ok(collected)
    }
}
