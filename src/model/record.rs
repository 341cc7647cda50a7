use serde::Serialize;
use serde::de::DeserializeOwned;

/// Error raised when a record payload fails its declared field constraints
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {kind}: {source}")]
    Field {
        kind: &'static str,
        source: serde_json::Error,
    },
    #[error("invalid {kind}: {reason}")]
    Constraint { kind: &'static str, reason: String },
    #[error("unknown task state code: {0}")]
    UnknownStateCode(i64),
    #[error("unknown task state: {0}")]
    UnknownStateLabel(String),
}

/// Error type for in-memory registry mutations
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{kind} {id} does not exist; nothing to update")]
    StaleUpdate { kind: &'static str, id: i64 },
}

/// A record with a stable integer identity, stored in a registry collection
/// and persisted as one flat JSON object.
pub trait Record: Clone + Serialize + DeserializeOwned {
    /// Short lowercase name, used in file names (`task-3.json`) and messages
    const KIND: &'static str;

    fn id(&self) -> i64;

    /// Serialize to a JSON object
    fn to_json(&self) -> serde_json::Value {
        // Records are plain structs with string keys; this cannot fail
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }

    /// Parse a JSON object, applying legacy defaults and validating fields
    fn from_json(value: serde_json::Value) -> Result<Self, ValidationError> {
        serde_json::from_value(value).map_err(|e| ValidationError::Field {
            kind: Self::KIND,
            source: e,
        })
    }

    /// Name of the per-record detail file, e.g. `task-3.json`
    fn detail_file_name(id: i64) -> String {
        format!("{}-{}.json", Self::KIND, id)
    }
}

/// Parse every element of a collection payload. One bad record fails the
/// whole collection.
pub fn records_from_json<R: Record>(values: Vec<serde_json::Value>) -> Result<Vec<R>, ValidationError> {
    values.into_iter().map(R::from_json).collect()
}

/// Pull the record array stored under `key` out of a collection payload
/// and parse each entry
pub fn records_under_key<R: Record>(
    mut value: serde_json::Value,
    key: &'static str,
) -> Result<Vec<R>, ValidationError> {
    match value.get_mut(key).map(serde_json::Value::take) {
        Some(serde_json::Value::Array(items)) => records_from_json(items),
        _ => Err(ValidationError::Constraint {
            kind: key,
            reason: format!("expected a \"{}\" array", key),
        }),
    }
}

/// Current time as an ISO-8601 timestamp, as stored in `created_at`/`updated_at`
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

/// Next free id over a set of records: 0 when empty, otherwise max + 1.
///
/// Only safe while a single writer owns the collection snapshot.
pub fn next_id<'a, R: Record + 'a>(records: impl IntoIterator<Item = &'a R>) -> i64 {
    records
        .into_iter()
        .map(|r| r.id())
        .max()
        .map_or(0, |max| max + 1)
}

/// Linear scan for the first record with the given id
pub fn find_by_id<R: Record>(records: &[R], id: i64) -> Option<&R> {
    records.iter().find(|r| r.id() == id)
}

/// Replace the record carrying `replacement`'s id wholesale.
pub fn replace_by_id<R: Record>(records: &mut [R], replacement: R) -> Result<(), RegistryError> {
    let slot = records
        .iter_mut()
        .find(|r| r.id() == replacement.id())
        .ok_or(RegistryError::StaleUpdate {
            kind: R::KIND,
            id: replacement.id(),
        })?;
    *slot = replacement;
    Ok(())
}

/// Remove the record with the given id, returning it.
pub fn remove_by_id<R: Record>(records: &mut Vec<R>, id: i64) -> Result<R, RegistryError> {
    let idx = records
        .iter()
        .position(|r| r.id() == id)
        .ok_or(RegistryError::StaleUpdate { kind: R::KIND, id })?;
    Ok(records.remove(idx))
}

/// Deserialize `null` as the type's default (legacy payloads wrote `null`
/// where newer ones write an empty string).
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + serde::Deserialize<'de>,
{
    use serde::Deserialize;
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Format a selection option as `<id>-<name>`
pub fn selection_label(id: i64, name: &str) -> String {
    format!("{}-{}", id, name)
}

/// Parse the id back out of a `<id>-<name>` selection option.
/// The empty option means "nothing selected".
pub fn parse_selection(option: &str) -> Option<i64> {
    if option.is_empty() {
        return None;
    }
    let (id, _name) = option.split_once('-')?;
    id.parse().ok()
}
