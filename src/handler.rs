use std::sync::Arc;

use crate::host::{Host, Uploads};

#[derive(Clone)]
pub struct AppState {
    pub host: Host,
    pub uploads: Arc<Uploads>,
}

impl AppState {
    pub fn new(host: Host, uploads: Uploads) -> Self {
        Self {
            host,
            uploads: Arc::new(uploads),
        }
    }
}
