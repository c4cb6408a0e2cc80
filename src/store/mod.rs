//! Generic record store consumed by the desk.
//!
//! Every collection holds JSON records addressed by an opaque string id. The
//! contract is deliberately small (`get_one`, `get_list`, `create`, `update`,
//! `delete`) so the same domain code runs against SurrealDB in production and
//! against [`memory::MemoryStore`] in tests.

use std::cmp::Ordering;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{
    consts::{field, store_const::MAX_PER_PAGE},
    utils::record_id::generate_record_id,
};

pub mod memory;
pub mod retry;
pub mod surreal;

pub type StoreResult<T> = core::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record `{id}` not found in `{collection}`")]
    NotFound { collection: String, id: String },

    #[error("store call timed out")]
    Timeout,

    #[error("store call aborted: {0}")]
    Aborted(String),

    #[error("store backend error: {0}")]
    Backend(String),

    #[error("record decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store authentication failed: {0}")]
    Auth(String),
}

impl StoreError {
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }

    /// Failures worth a second attempt on an idempotent read.
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Aborted(_))
    }
}

/// A stored record: store-assigned metadata plus free-form fields.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Record {
    pub id: String,
    pub created: String,
    pub updated: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Field lookup that also resolves the metadata columns.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            field::ID => Some(Value::String(self.id.clone())),
            field::CREATED => Some(Value::String(self.created.clone())),
            field::UPDATED => Some(Value::String(self.updated.clone())),
            _ => self.fields.get(name).cloned(),
        }
    }

    pub fn decode<T: DeserializeOwned>(&self) -> StoreResult<T> {
        Ok(serde_json::from_value(serde_json::to_value(self)?)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    All,
    Eq(String, Value),
    In(String, Vec<Value>),
    And(Vec<Filter>),
}

impl Filter {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Filter::Eq(field.to_string(), value.into())
    }

    pub fn any_of<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In(field.to_string(), values.into_iter().map(Into::into).collect())
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq(name, value) => record.get(name).as_ref() == Some(value),
            Filter::In(name, values) => record
                .get(name)
                .is_some_and(|found| values.contains(&found)),
            Filter::And(filters) => filters.iter().all(|f| f.matches(record)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub descending: bool,
}

impl Sort {
    pub fn asc(field: &str) -> Self {
        Sort {
            field: field.to_string(),
            descending: false,
        }
    }

    pub fn desc(field: &str) -> Self {
        Sort {
            field: field.to_string(),
            descending: true,
        }
    }

    pub fn compare(&self, a: &Record, b: &Record) -> Ordering {
        let ord = compare_values(a.get(&self.field).as_ref(), b.get(&self.field).as_ref());
        if self.descending { ord.reverse() } else { ord }
    }
}

/// Missing and null sort first; numbers and strings compare naturally.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(x), Some(y)) => x.to_string().cmp(&y.to_string()),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    pub sort: Option<Sort>,
    pub page: u32,
    pub per_page: u32,
}

impl ListQuery {
    pub fn new(filter: Filter) -> Self {
        ListQuery {
            filter,
            sort: None,
            page: 1,
            per_page: 30,
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn page(mut self, page: u32, per_page: u32) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }

    /// 1-based page and a page size clamped to the store limit.
    pub fn normalized(&self) -> (u32, u32) {
        (self.page.max(1), self.per_page.clamp(1, MAX_PER_PAGE))
    }

    pub fn offset(&self) -> usize {
        let (page, per_page) = self.normalized();
        (page as usize - 1) * per_page as usize
    }
}

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, query: &ListQuery, total_items: u64) -> Self {
        let (page, per_page) = query.normalized();
        Page {
            items,
            page,
            per_page,
            total_items,
            total_pages: total_items.div_ceil(u64::from(per_page)),
        }
    }

    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            items: self.items.into_iter().map(f).collect::<Result<_, _>>()?,
            page: self.page,
            per_page: self.per_page,
            total_items: self.total_items,
            total_pages: self.total_pages,
        })
    }
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Record>;

    async fn get_list(&self, collection: &str, query: &ListQuery) -> StoreResult<Page<Record>>;

    async fn create(&self, collection: &str, fields: Map<String, Value>) -> StoreResult<Record>;

    /// Merges `fields` into the record and bumps `updated`.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Record>;

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()>;
}

/// Removes a caller-chosen `id` from `fields`, or draws a fresh one.
pub fn take_record_id(fields: &mut Map<String, Value>) -> String {
    match fields.remove(field::ID) {
        Some(Value::String(id)) if !id.is_empty() => id,
        _ => generate_record_id(),
    }
}

/// Builds a field map from `(name, value)` pairs.
#[macro_export]
macro_rules! fields {
    ($($name:expr => $value:expr),* $(,)?) => {{
        let mut map = ::serde_json::Map::new();
        $( map.insert(($name).to_string(), ::serde_json::json!($value)); )*
        map
    }};
}
