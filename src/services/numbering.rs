use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    consts::{field, store_const::MEETME_TABLE},
    errors::Result,
    store::{Filter, ListQuery, RecordStore, Sort},
};

/// Hands out human-facing meetme request numbers.
///
/// The highest number already in the store is read once; after that numbers
/// come from an in-process counter, so concurrent creators never see the same
/// value. A number handed out for a create that later fails is skipped, never
/// reused.
#[derive(Debug, Default)]
pub struct RequestNumbers {
    last: Mutex<Option<u64>>,
}

impl RequestNumbers {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn next(&self, store: &dyn RecordStore) -> Result<u64> {
        let mut last = self.last.lock().await;
        let current = match *last {
            Some(n) => n,
            None => {
                let seeded = highest_assigned(store).await?;
                debug!("Request numbers seeded at {seeded}");
                seeded
            }
        };
        let next = current + 1;
        *last = Some(next);
        Ok(next)
    }
}

/// `0` when nothing has been numbered yet.
async fn highest_assigned(store: &dyn RecordStore) -> Result<u64> {
    let query = ListQuery::new(Filter::All)
        .sort(Sort::desc(field::REQUEST_ID))
        .page(1, 1);
    let page = store.get_list(MEETME_TABLE, &query).await?;
    Ok(page
        .items
        .first()
        .and_then(|r| r.fields.get(field::REQUEST_ID))
        .and_then(serde_json::Value::as_u64)
        .unwrap_or(0))
}
