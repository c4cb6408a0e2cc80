use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use futures::FutureExt;
use serde::Deserialize;
use serde_json::{Map, Value};
use surrealdb::{
    Surreal,
    engine::remote::ws::{Client, Ws},
    opt::auth::Root,
};
use tracing::{info, warn};

use super::{Filter, ListQuery, Page, Record, RecordStore, StoreError, StoreResult, take_record_id};
use crate::{
    config::StoreConfig,
    consts::field,
    utils::{single_flight::SingleFlight, time::time_now},
};

impl From<surrealdb::Error> for StoreError {
    fn from(error: surrealdb::Error) -> Self {
        match error {
            // the request may never have been served
            surrealdb::Error::Api(e) if is_connection_error(&e) => StoreError::Aborted(e.to_string()),
            surrealdb::Error::Api(e) => StoreError::Backend(e.to_string()),
            surrealdb::Error::Db(e) => StoreError::Backend(e.to_string()),
            #[allow(unreachable_patterns)]
            other => StoreError::Backend(other.to_string()),
        }
    }
}

fn is_connection_error(error: &surrealdb::error::Api) -> bool {
    use surrealdb::error::Api;
    matches!(
        error,
        Api::Ws(_) | Api::Http(_) | Api::ConnectionUninitialised
    )
}

#[derive(Clone)]
struct Credentials {
    username: String,
    password: String,
}

/// SurrealDB-backed store over WebSocket.
///
/// Records are stored with their own key as the SurrealDB record id and read
/// back with `record::id(id)`, so callers only ever see plain string ids.
pub struct SurrealStore {
    sdb: Surreal<Client>,
    credentials: Credentials,
    signed_in: Arc<AtomicBool>,
    signin: SingleFlight<Result<(), String>>,
}

#[derive(Deserialize)]
struct CountRow {
    total: u64,
}

impl SurrealStore {
    /// Connects and selects the namespace. A failed sign-in is logged and
    /// retried on the first store call rather than aborting startup.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let sdb = Surreal::new::<Ws>(config.url.as_str()).await?;
        let store = SurrealStore {
            sdb,
            credentials: Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
            },
            signed_in: Arc::new(AtomicBool::new(false)),
            signin: SingleFlight::new(),
        };

        if let Err(e) = store.ensure_signed_in().await {
            warn!("Store sign-in failed on startup, will retry on first request: {e}");
        }
        store
            .sdb
            .use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;
        info!("Connected to SurrealDB at {}", config.url);
        Ok(store)
    }

    async fn ensure_signed_in(&self) -> StoreResult<()> {
        if self.signed_in.load(Ordering::Acquire) {
            return Ok(());
        }
        let sdb = self.sdb.clone();
        let credentials = self.credentials.clone();
        let signed_in = self.signed_in.clone();
        self.signin
            .run(move || {
                async move {
                    sdb.signin(Root {
                        username: &credentials.username,
                        password: &credentials.password,
                    })
                    .await
                    .map_err(|e| e.to_string())?;
                    signed_in.store(true, Ordering::Release);
                    Ok(())
                }
                .boxed()
            })
            .await
            .map_err(StoreError::Auth)
    }

    async fn select(&self, collection: &str, id: &str) -> StoreResult<Option<Record>> {
        let rows: Vec<Value> = self
            .sdb
            .query("SELECT *, record::id(id) AS id FROM type::thing($table, $key);")
            .bind(("table", collection.to_string()))
            .bind(("key", id.to_string()))
            .await?
            .take(0)?;
        rows.into_iter()
            .next()
            .map(serde_json::from_value)
            .transpose()
            .map_err(StoreError::from)
    }
}

/// Renders a filter as a SurrealQL condition, collecting bound parameters.
fn where_clause(filter: &Filter, params: &mut Vec<(String, Value)>) -> StoreResult<String> {
    Ok(match filter {
        Filter::All => "true".to_string(),
        Filter::Eq(name, value) => {
            let column = column(name)?;
            let param = bind(params, value.clone());
            format!("{column} = ${param}")
        }
        Filter::In(name, values) => {
            let column = column(name)?;
            let param = bind(params, Value::Array(values.clone()));
            format!("{column} IN ${param}")
        }
        Filter::And(filters) if filters.is_empty() => "true".to_string(),
        Filter::And(filters) => {
            let parts = filters
                .iter()
                .map(|f| where_clause(f, params))
                .collect::<StoreResult<Vec<_>>>()?;
            format!("({})", parts.join(" AND "))
        }
    })
}

fn bind(params: &mut Vec<(String, Value)>, value: Value) -> String {
    let name = format!("p{}", params.len());
    params.push((name.clone(), value));
    name
}

/// Field names are interpolated into queries, so only plain identifiers pass.
fn column(name: &str) -> StoreResult<String> {
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(StoreError::Backend(format!("invalid field name `{name}`")));
    }
    Ok(if name == field::ID {
        "record::id(id)".to_string()
    } else {
        name.to_string()
    })
}

#[async_trait]
impl RecordStore for SurrealStore {
    async fn get_one(&self, collection: &str, id: &str) -> StoreResult<Record> {
        self.ensure_signed_in().await?;
        self.select(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn get_list(&self, collection: &str, query: &ListQuery) -> StoreResult<Page<Record>> {
        self.ensure_signed_in().await?;

        let mut params = Vec::new();
        let condition = where_clause(&query.filter, &mut params)?;
        let order = match &query.sort {
            Some(sort) => format!(
                " ORDER BY {} {}",
                column(&sort.field)?,
                if sort.descending { "DESC" } else { "ASC" }
            ),
            None => " ORDER BY created ASC".to_string(),
        };
        let (_, per_page) = query.normalized();

        let mut request = self
            .sdb
            .query(format!(
                "SELECT *, record::id(id) AS id FROM type::table($table) WHERE {condition}{order} LIMIT $limit START $start;"
            ))
            .query(format!(
                "SELECT count() AS total FROM type::table($table) WHERE {condition} GROUP ALL;"
            ))
            .bind(("table", collection.to_string()))
            .bind(("limit", per_page))
            .bind(("start", query.offset() as u64));
        for (name, value) in params {
            request = request.bind((name, value));
        }

        let mut response = request.await?;
        let rows: Vec<Value> = response.take(0)?;
        let count: Option<CountRow> = response.take(1)?;

        let items = rows
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<Record>, _>>()?;
        Ok(Page::new(items, query, count.map_or(0, |c| c.total)))
    }

    async fn create(&self, collection: &str, mut fields: Map<String, Value>) -> StoreResult<Record> {
        self.ensure_signed_in().await?;

        let now = time_now();
        let record = Record {
            id: take_record_id(&mut fields),
            created: now.clone(),
            updated: now,
            fields,
        };
        let mut content = serde_json::to_value(&record)?;
        if let Some(map) = content.as_object_mut() {
            map.remove(field::ID);
        }

        self.sdb
            .query("CREATE type::thing($table, $key) CONTENT $content RETURN NONE;")
            .bind(("table", collection.to_string()))
            .bind(("key", record.id.clone()))
            .bind(("content", content))
            .await?
            .check()?;
        Ok(record)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> StoreResult<Record> {
        self.ensure_signed_in().await?;

        let mut record = self
            .select(collection, id)
            .await?
            .ok_or_else(|| StoreError::not_found(collection, id))?;
        record.fields.extend(fields.clone());
        record.updated = time_now();

        let mut patch = fields;
        patch.insert(field::UPDATED.to_string(), Value::String(record.updated.clone()));

        self.sdb
            .query("UPDATE type::thing($table, $key) MERGE $patch RETURN NONE;")
            .bind(("table", collection.to_string()))
            .bind(("key", id.to_string()))
            .bind(("patch", Value::Object(patch)))
            .await?
            .check()?;
        Ok(record)
    }

    async fn delete(&self, collection: &str, id: &str) -> StoreResult<()> {
        self.ensure_signed_in().await?;

        if self.select(collection, id).await?.is_none() {
            return Err(StoreError::not_found(collection, id));
        }
        self.sdb
            .query("DELETE type::thing($table, $key);")
            .bind(("table", collection.to_string()))
            .bind(("key", id.to_string()))
            .await?
            .check()?;
        Ok(())
    }
}
