use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{ListQuery, Page, Record, RecordStore, StoreError, StoreResult, take_record_id};
use crate::utils::time::time_now;

/// In-process store. Collections keep insertion order, which breaks ties
/// between records created within the same microsecond.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Record> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|rows| rows.iter().find(|r| r.id == id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn get_list(&self, collection: &str, query: &ListQuery) -> StoreResult<Page<Record>> {
        let guard = self.collections.read().await;
        let mut rows: Vec<Record> = guard
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|r| query.filter.matches(r))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(guard);

        if let Some(sort) = &query.sort {
            rows.sort_by(|a, b| sort.compare(a, b));
        }

        let total = rows.len() as u64;
        let (_, per_page) = query.normalized();
        let items = rows
            .into_iter()
            .skip(query.offset())
            .take(per_page as usize)
            .collect();
        Ok(Page::new(items, query, total))
    }

    async fn create(&self, collection: &str, mut fields: Map<String, Value>) -> StoreResult<Record> {
        let id = take_record_id(&mut fields);
        let mut guard = self.collections.write().await;
        let rows = guard.entry(collection.to_string()).or_default();
        if rows.iter().any(|r| r.id == id) {
            return Err(StoreError::Backend(format!(
                "record {collection}:{id} already exists"
            )));
        }
        let now = time_now();
        let record = Record {
            id,
            created: now.clone(),
            updated: now,
            fields,
        };
        rows.push(record.clone());
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Record> {
        let mut guard = self.collections.write().await;
        let record = guard
            .get_mut(collection)
            .and_then(|rows| rows.iter_mut().find(|r| r.id == id))
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        record.fields.extend(fields);
        record.updated = time_now();
        Ok(record.clone())
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        let mut guard = self.collections.write().await;
        let rows = guard
            .get_mut(collection)
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(StoreError::not_found(collection, id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::{
        fields,
        store::{Filter, Sort},
    };

    #[tokio::test]
    async fn create_get_update_delete() {
        let store = MemoryStore::new();
        let created = store
            .create("users", fields! {"email" => "a@b.c", "isAdmin" => false})
            .await
            .unwrap();
        assert_eq!(created.created, created.updated);

        let fetched = store.get_one("users", &created.id).await.unwrap();
        assert_eq!(fetched, created);

        let updated = store
            .update("users", &created.id, fields! {"isAdmin" => true})
            .await
            .unwrap();
        assert_eq!(updated.fields["isAdmin"], json!(true));
        assert_eq!(updated.fields["email"], json!("a@b.c"));
        assert!(updated.updated >= created.updated);

        store.delete("users", &created.id).await.unwrap();
        assert!(matches!(
            store.get_one("users", &created.id).await,
            Err(StoreError::NotFound { .. })
        ));
        assert!(matches!(
            store.delete("users", &created.id).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn update_of_missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .update("meetmes", "nope", fields! {"status" => "approved"})
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[tokio::test]
    async fn list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for n in 1..=5 {
            let owner = if n % 2 == 0 { "even" } else { "odd" };
            store
                .create("meetmes", fields! {"requestId" => n, "user" => owner})
                .await
                .unwrap();
        }

        let query = ListQuery::new(Filter::eq("user", "odd"))
            .sort(Sort::desc("requestId"))
            .page(1, 2);
        let page = store.get_list("meetmes", &query).await.unwrap();
        assert_eq!(page.total_items, 3);
        assert_eq!(page.total_pages, 2);
        let numbers: Vec<_> = page.items.iter().map(|r| r.fields["requestId"].clone()).collect();
        assert_eq!(numbers, [json!(5), json!(3)]);

        let page = store.get_list("meetmes", &query.clone().page(2, 2)).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].fields["requestId"], json!(1));

        let empty = store
            .get_list("unknown", &ListQuery::new(Filter::All))
            .await
            .unwrap();
        assert!(empty.items.is_empty());
        assert_eq!(empty.total_pages, 0);
    }
}
