use crate::Error;
use crate::db::entities::key_values;
use anyhow::Context as _;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, Set};
use serde_json::Value;

/// String-keyed JSON value storage.
///
/// There is no compare-and-swap: a read followed by a write from two
/// concurrent callers can lose one of the updates.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    async fn put(&self, key: &str, value: Value) -> Result<(), Error>;

    async fn get_or(&self, key: &str, default: Value) -> Result<Value, Error> {
        Ok(self.get(key).await?.unwrap_or(default))
    }
}

pub struct DbKeyValueStore {
    db: DatabaseConnection,
}

impl DbKeyValueStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl KeyValueStore for DbKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        let row = key_values::Entity::find_by_id(key.to_string())
            .one(&self.db)
            .await?;

        match row {
            Some(row) => {
                let value = serde_json::from_str(&row.value)
                    .with_context(|| format!("Stored value for {key} is not valid JSON"))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), Error> {
        let model = key_values::ActiveModel {
            key: Set(key.to_string()),
            value: Set(value.to_string()),
            updated_at: Set(Utc::now().naive_utc()),
        };

        key_values::Entity::insert(model)
            .on_conflict(
                OnConflict::column(key_values::Column::Key)
                    .update_columns([key_values::Column::Value, key_values::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        Ok(())
    }
}

/// Process-local store. Contents are lost on exit.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: DashMap<String, Value>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, Error> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), Error> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }
}
