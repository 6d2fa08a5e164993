//! List parameters sourced from the current URL.
//!
//! Navigation is the only writer; lists subscribe and recompute when the
//! decoded parameters actually change.

use msel_core::list_params::ListParams;
use reqwest::Url;
use tokio::sync::watch;

pub struct UrlState {
    tx: watch::Sender<ListParams>,
}

impl Default for UrlState {
    fn default() -> Self {
        Self::new(ListParams::default())
    }
}

impl UrlState {
    pub fn new(params: ListParams) -> Self {
        let (tx, _rx) = watch::channel(params);
        Self { tx }
    }

    pub fn from_url(url: &Url) -> Self {
        Self::new(ListParams::from_pairs(url.query_pairs()))
    }

    /// Decode `url` and publish its parameters. Returns whether they
    /// differ from the current ones; subscribers are only woken if so.
    pub fn navigate(&self, url: &Url) -> bool {
        let params = ListParams::from_pairs(url.query_pairs());
        let changed = self.tx.send_if_modified(|current| {
            if *current == params {
                return false;
            }
            *current = params;
            true
        });
        if changed {
            tracing::debug!(%url, "List parameters changed");
        }
        changed
    }

    pub fn subscribe(&self) -> watch::Receiver<ListParams> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> ListParams {
        self.tx.borrow().clone()
    }
}
