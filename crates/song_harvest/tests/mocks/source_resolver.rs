use std::sync::{Arc, Mutex};

use song_harvest::{
    types::MediaId,
    yt::{search::extract_media_id, SourceResolver},
    ResolveError,
};

#[derive(Clone)]
pub struct MockSourceResolver {
    pub page: String,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_with: Option<String>,
}

impl MockSourceResolver {
    pub fn from_fixture() -> Self {
        Self {
            page: include_str!("../fixtures/search_results.html").to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: None,
        }
    }

    /// Every query comes back with a page that has no video results
    pub fn failing(msg: &str) -> Self {
        Self {
            page: String::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            fail_with: Some(msg.to_string()),
        }
    }
}

impl SourceResolver for MockSourceResolver {
    const SEARCH_URL: &'static str = "https://youtube.com/mock/results";

    async fn resolve(&self, query: &str) -> Result<MediaId, ResolveError> {
        self.calls.lock().unwrap().push(query.to_string());
        if query.is_empty() {
            return Err(ResolveError::EmptyQuery);
        }
        if self.fail_with.is_some() {
            return Err(ResolveError::NoMatch);
        }
        extract_media_id(&self.page).ok_or(ResolveError::NoMatch)
    }
}
