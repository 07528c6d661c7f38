use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use tracing::info;

use crate::error::SeqpackError;
use crate::import::{read_legacy_records, write_legacy_records, LegacyRecord};
use crate::package::Package;
use crate::retrieve::PartRetriever;

/// Outcome of a structured-repository pull. Not-found is expected and drives
/// fallback or skipping; anything else aborts the retrieval run.
#[derive(Debug)]
pub enum PullError {
    NotFound,
    Other(SeqpackError),
}

pub trait SynbiohubClient {
    fn pull(&self, url: &str) -> Result<Vec<LegacyRecord>, PullError>;
}

pub trait SynbiohubClientFactory {
    type Client: SynbiohubClient;

    fn client_for(&self, server: &str) -> Result<Self::Client, SeqpackError>;
}

#[derive(Clone)]
pub struct SbhHttpClient {
    client: Client,
    server: String,
}

impl SbhHttpClient {
    pub fn new(server: &str) -> Result<Self, SeqpackError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(format!("seqpack/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| SeqpackError::SynbiohubHttp(err.to_string()))?;
        Ok(Self {
            client,
            server: server.to_string(),
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl SynbiohubClient for SbhHttpClient {
    fn pull(&self, url: &str) -> Result<Vec<LegacyRecord>, PullError> {
        let response = self
            .client
            .get(format!("{url}/sbol"))
            .header(ACCEPT, "application/json")
            .send()
            .map_err(|err| PullError::Other(SeqpackError::SynbiohubHttp(err.to_string())))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(PullError::NotFound);
        }
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .unwrap_or_else(|_| "SynBioHub request failed".to_string());
            return Err(PullError::Other(SeqpackError::SynbiohubStatus {
                status,
                message,
            }));
        }
        response
            .json::<Vec<LegacyRecord>>()
            .map_err(|err| PullError::Other(SeqpackError::SynbiohubHttp(err.to_string())))
    }
}

pub struct SbhHttpFactory;

impl SynbiohubClientFactory for SbhHttpFactory {
    type Client = SbhHttpClient;

    fn client_for(&self, server: &str) -> Result<Self::Client, SeqpackError> {
        SbhHttpClient::new(server)
    }
}

/// Pulls parts from arbitrary SynBioHub hosts, one record at a time.
pub struct SynbiohubRetriever<F: SynbiohubClientFactory> {
    factory: F,
}

impl<F: SynbiohubClientFactory> SynbiohubRetriever<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F: SynbiohubClientFactory> PartRetriever for SynbiohubRetriever<F> {
    fn retrieve(&self, uris: &[String], package: &Package) -> Result<Vec<String>, SeqpackError> {
        let cache_file = package.igem_legacy_cache_path();
        // read any current material to avoid overwriting it
        let mut records = read_legacy_records(&cache_file)?;

        info!(count = uris.len(), "attempting to retrieve parts from SynBioHub");
        let mut clients: BTreeMap<String, F::Client> = BTreeMap::new();
        let mut retrieved = Vec::new();
        // one ID at a time: a single missing record fails a batched pull
        for url in uris {
            let server = server_of(url);
            if !clients.contains_key(&server) {
                clients.insert(server.clone(), self.factory.client_for(&server)?);
            }
            let client = &clients[&server];
            info!(server = %server, url = %url, "attempting to retrieve record from SynBioHub");
            match client.pull(url) {
                Ok(pulled) => {
                    merge_records(&mut records, pulled);
                    retrieved.push(url.clone());
                }
                Err(PullError::NotFound) => {
                    info!(url = %url, "SynBioHub retrieval failed");
                }
                Err(PullError::Other(err)) => return Err(err),
            }
        }

        if !retrieved.is_empty() {
            info!(
                count = retrieved.len(),
                cache = %cache_file,
                "writing retrieved SynBioHub records"
            );
            write_legacy_records(&cache_file, &records)?;
        }
        Ok(retrieved)
    }
}

pub fn server_of(url: &str) -> String {
    match url.find("://") {
        Some(idx) => {
            let host_start = idx + 3;
            let end = url[host_start..]
                .find('/')
                .map(|offset| host_start + offset)
                .unwrap_or(url.len());
            url[..end].to_string()
        }
        None => url.to_string(),
    }
}

pub fn merge_records(records: &mut Vec<LegacyRecord>, pulled: Vec<LegacyRecord>) {
    for record in pulled {
        if records.iter().any(|existing| existing.identity == record.identity) {
            continue;
        }
        records.push(record);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use assert_matches::assert_matches;
    use camino::Utf8PathBuf;

    use super::*;
    use crate::config::DEFAULT_NAMESPACE;

    fn record(identity: &str) -> LegacyRecord {
        LegacyRecord {
            identity: identity.to_string(),
            display_id: identity.rsplit('/').next().unwrap().to_string(),
            name: None,
            description: None,
            elements: Some("atgc".to_string()),
        }
    }

    enum Reply {
        Found(Vec<LegacyRecord>),
        NotFound,
        Broken,
    }

    struct ScriptedClient {
        replies: RefCell<Vec<(String, Reply)>>,
    }

    impl SynbiohubClient for ScriptedClient {
        fn pull(&self, url: &str) -> Result<Vec<LegacyRecord>, PullError> {
            let mut replies = self.replies.borrow_mut();
            let index = replies
                .iter()
                .position(|(scripted, _)| scripted == url)
                .unwrap_or_else(|| panic!("unexpected pull of {url}"));
            match replies.remove(index).1 {
                Reply::Found(records) => Ok(records),
                Reply::NotFound => Err(PullError::NotFound),
                Reply::Broken => Err(PullError::Other(SeqpackError::SynbiohubStatus {
                    status: 500,
                    message: "boom".to_string(),
                })),
            }
        }
    }

    struct ScriptedFactory {
        replies: RefCell<Vec<(String, Reply)>>,
        servers: Rc<RefCell<Vec<String>>>,
    }

    impl SynbiohubClientFactory for ScriptedFactory {
        type Client = ScriptedClient;

        fn client_for(&self, server: &str) -> Result<Self::Client, SeqpackError> {
            self.servers.borrow_mut().push(server.to_string());
            Ok(ScriptedClient {
                replies: RefCell::new(self.replies.borrow_mut().drain(..).collect()),
            })
        }
    }

    #[test]
    fn server_extraction() {
        assert_eq!(
            server_of("https://synbiohub.org/public/igem/BBa_K808000"),
            "https://synbiohub.org"
        );
        assert_eq!(
            server_of("https://synbiohub.example.org"),
            "https://synbiohub.example.org"
        );
    }

    #[test]
    fn merge_skips_existing_identities() {
        let mut records = vec![record("https://synbiohub.org/a")];
        merge_records(
            &mut records,
            vec![record("https://synbiohub.org/a"), record("https://synbiohub.org/b")],
        );
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn not_found_is_skipped_and_the_rest_is_kept() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let package = Package::new(root, DEFAULT_NAMESPACE);

        let found = "https://synbiohub.org/design/p1".to_string();
        let missing = "https://synbiohub.org/design/p2".to_string();
        let servers = Rc::new(RefCell::new(Vec::new()));
        let factory = ScriptedFactory {
            replies: RefCell::new(vec![
                (found.clone(), Reply::Found(vec![record(&found)])),
                (missing.clone(), Reply::NotFound),
            ]),
            servers: Rc::clone(&servers),
        };
        let retriever = SynbiohubRetriever::new(factory);

        let retrieved = retriever
            .retrieve(&[found.clone(), missing], &package)
            .unwrap();
        assert_eq!(retrieved, vec![found]);

        // one client instantiated for the single distinct host
        assert_eq!(servers.borrow().as_slice(), &["https://synbiohub.org".to_string()]);
        let cached = read_legacy_records(&package.igem_legacy_cache_path()).unwrap();
        assert_eq!(cached.len(), 1);
    }

    #[test]
    fn unexpected_errors_propagate() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let package = Package::new(root, DEFAULT_NAMESPACE);

        let url = "https://synbiohub.org/design/p1".to_string();
        let factory = ScriptedFactory {
            replies: RefCell::new(vec![(url.clone(), Reply::Broken)]),
            servers: Rc::new(RefCell::new(Vec::new())),
        };
        let retriever = SynbiohubRetriever::new(factory);

        let err = retriever.retrieve(&[url], &package).unwrap_err();
        assert_matches!(err, SeqpackError::SynbiohubStatus { status: 500, .. });
        assert!(!package.igem_legacy_cache_path().as_std_path().exists());
    }
}
