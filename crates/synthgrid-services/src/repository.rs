//! Patch repository client: paginated listing of a user's saved patches

use std::time::Duration;

use serde::{Deserialize, Serialize};
use synthgrid_core::PatchSummary;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_PAGE_SIZE: u32 = 12;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Request failed: {0}")]
    Http(String),
    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// One page of results in the server's paginated list shape
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatchPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    #[serde(default)]
    pub results: Vec<PatchSummary>,
}

impl PatchPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }

    /// Fill in display names the server left out
    fn normalized(mut self) -> Self {
        for patch in &mut self.results {
            if patch.display_name.is_empty() {
                patch.display_name = patch.name.clone();
            }
        }
        self
    }
}

pub trait PatchRepository {
    /// Fetch a 1-based page of patches
    fn fetch_page(&self, page: u32) -> Result<PatchPage, RepositoryError>;
}

/// Fetch a page, turning failure into an empty list plus a message for the user
pub fn fetch_or_empty(repo: &dyn PatchRepository, page: u32) -> (Vec<PatchSummary>, Option<String>) {
    match repo.fetch_page(page) {
        Ok(page) => (page.results, None),
        Err(e) => {
            warn!(page, "Patch fetch failed: {e}");
            (Vec::new(), Some(format!("Could not load patches: {e}")))
        }
    }
}

/// Repository served over HTTP at `{base_url}/api/patches/saved-by/{username}/`
pub struct HttpPatchRepository {
    agent: ureq::Agent,
    base_url: String,
    username: String,
    page_size: u32,
}

impl HttpPatchRepository {
    pub fn new(base_url: impl Into<String>, username: impl Into<String>, page_size: u32) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build();
        Self {
            agent,
            base_url: base_url.into(),
            username: username.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn page_url(&self, page: u32) -> String {
        format!(
            "{}/api/patches/saved-by/{}/?page={}&page_size={}",
            self.base_url.trim_end_matches('/'),
            self.username,
            page.max(1),
            self.page_size
        )
    }
}

impl PatchRepository for HttpPatchRepository {
    fn fetch_page(&self, page: u32) -> Result<PatchPage, RepositoryError> {
        let url = self.page_url(page);
        debug!(%url, "Fetching patches");
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|e| RepositoryError::Http(e.to_string()))?;
        let page: PatchPage = response
            .into_json()
            .map_err(|e| RepositoryError::Decode(e.to_string()))?;
        Ok(page.normalized())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl PatchRepository for Failing {
        fn fetch_page(&self, _page: u32) -> Result<PatchPage, RepositoryError> {
            Err(RepositoryError::Http("connection refused".into()))
        }
    }

    struct Fixed(PatchPage);

    impl PatchRepository for Fixed {
        fn fetch_page(&self, _page: u32) -> Result<PatchPage, RepositoryError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_page_url() {
        let repo = HttpPatchRepository::new("http://localhost:8000/", "ana", DEFAULT_PAGE_SIZE);
        assert_eq!(
            repo.page_url(0),
            "http://localhost:8000/api/patches/saved-by/ana/?page=1&page_size=12"
        );
    }

    #[test]
    fn test_decode_server_page() {
        let json = r#"{
            "count": 13,
            "next": "http://localhost:8000/api/patches/saved-by/ana/?page=2",
            "previous": null,
            "results": [
                {"id": 5, "name": "Wobble", "description": "", "synth_type": "fm",
                 "note": "A3", "duration": "4n", "parameters": {"cutoff": 800}}
            ]
        }"#;
        let page: PatchPage = serde_json::from_str(json).unwrap();
        let page = page.normalized();
        assert!(page.has_next());
        let patch = &page.results[0];
        assert_eq!(patch.display_name, "Wobble");
        assert_eq!(patch.note, "A3");
        assert_eq!(patch.parameters["cutoff"], 800);
    }

    #[test]
    fn test_fetch_or_empty_surfaces_error() {
        let (patches, message) = fetch_or_empty(&Failing, 1);
        assert!(patches.is_empty());
        assert!(message.unwrap().contains("connection refused"));
    }

    #[test]
    fn test_fetch_or_empty_passes_results() {
        let page = PatchPage {
            count: 1,
            results: vec![PatchSummary::new(1, "Pluck")],
            ..Default::default()
        };
        let (patches, message) = fetch_or_empty(&Fixed(page), 1);
        assert_eq!(patches.len(), 1);
        assert!(message.is_none());
    }
}
