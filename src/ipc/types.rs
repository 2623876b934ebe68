use crate::cache::LookupCache;
use crate::ingest::Subject;
use crate::setup::Setup;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub setup: Setup,
    pub subjects: LookupCache<String, Subject>,
    /// Teacher id -> initials.
    pub teachers: LookupCache<String, String>,
}

impl AppState {
    pub fn new(setup: Setup) -> Self {
        Self {
            setup,
            subjects: LookupCache::new(),
            teachers: LookupCache::new(),
        }
    }
}
