//! A filtered, sorted, paged view of one store, recomputed whenever either
//! the store or the list parameters change.

use msel_core::entity::Listable;
use msel_core::list_params::{ListParams, Page};
use tokio::sync::watch;
use tokio_stream::Stream;

use crate::query::EntityQuery;
use crate::store::EntityState;

pub struct EntityList<T> {
    entities: watch::Receiver<EntityState<T>>,
    params: watch::Receiver<ListParams>,
}

impl<T: Listable> EntityList<T> {
    /// Combine `query` with a stream of list parameters (usually fed from
    /// the current URL).
    pub fn new(query: &EntityQuery<T>, params: watch::Receiver<ListParams>) -> Self {
        Self {
            entities: query.receiver(),
            params,
        }
    }

    pub fn params(&self) -> ListParams {
        self.params.borrow().clone()
    }

    /// The page for the current store contents and parameters.
    pub fn current(&self) -> Page<T> {
        let params = self.params.borrow().clone();
        let state = self.entities.borrow();
        params.apply(state.iter())
    }

    /// Wait until the store or the parameters change and return the new
    /// page. `None` once either source is gone.
    pub async fn next_page(&mut self) -> Option<Page<T>> {
        let alive = tokio::select! {
            changed = self.entities.changed() => changed.is_ok(),
            changed = self.params.changed() => changed.is_ok(),
        };
        if !alive {
            return None;
        }
        self.entities.borrow_and_update();
        self.params.borrow_and_update();
        Some(self.current())
    }

    /// The current page followed by one page per change.
    pub fn into_stream(self) -> impl Stream<Item = Page<T>> + Send + 'static {
        let first = self.current();
        futures::stream::unfold((Some(first), self), |(pending, mut list)| async move {
            match pending {
                Some(page) => Some((page, (None, list))),
                None => list.next_page().await.map(|page| (page, (None, list))),
            }
        })
    }
}
