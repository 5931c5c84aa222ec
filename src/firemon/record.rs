//! JSON-to-object binding for API resources.
//!
//! A [`Record`] keeps three views of one server object: the untouched
//! config returned by the server, the live fields the caller reads and
//! mutates, and a snapshot of those fields taken at construction. How each
//! top-level key is interpreted is declared per resource type in a static
//! [`Schema`]; nested mappings become nested records unless the schema
//! marks the field as free-form JSON.
//!
//! `save()` sends the full current state, minus the type's read-only
//! fields, and only when it differs from the snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use log::debug;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::firemon::request::Request;
use crate::firemon::session::{Context, Params};

/// How a field's value is interpreted.
#[derive(Debug)]
pub enum FieldKind {
    /// Mappings (and list entries with an `id`) become records of this type.
    Nested(&'static Schema),
    /// Kept as plain JSON, never wrapped.
    Json,
    /// A list whose order carries no meaning for change detection.
    Unordered,
}

/// Which application URL a resource lives under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlScope {
    App,
    Domain,
}

/// Path appended to the endpoint URL to address one record.
#[derive(Debug, Clone, Copy)]
pub enum UrlKey {
    Id,
    /// Values of these fields joined by `/`.
    Fields(&'static [&'static str]),
}

/// Static description of one resource type.
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    /// Endpoint path below the scope URL.
    pub path: Option<&'static str>,
    pub scope: UrlScope,
    pub url_key: UrlKey,
    pub fields: &'static [(&'static str, FieldKind)],
    /// Server-managed fields never sent back.
    pub read_only: &'static [&'static str],
    /// Relationship fields restored from the server copy on save unless
    /// the caller changed them.
    pub protected: &'static [&'static str],
    /// Preference order for the value used when this record is embedded
    /// in a parent.
    pub return_fields: &'static [&'static str],
    /// Field shown by `Display`, before falling back to the id.
    pub label: &'static str,
    pub writable: bool,
}

impl Schema {
    pub const GENERIC: Schema = Schema {
        name: "record",
        path: None,
        scope: UrlScope::App,
        url_key: UrlKey::Id,
        fields: &[],
        read_only: &[],
        protected: &[],
        return_fields: &["id", "value"],
        label: "name",
        writable: true,
    };

    pub fn field_kind(&self, key: &str) -> Option<&FieldKind> {
        self.fields.iter().find(|(k, _)| *k == key).map(|(_, kind)| kind)
    }

    pub fn is_read_only(&self, key: &str) -> bool {
        self.read_only.contains(&key)
    }

    /// Collection URL for this type in `ctx`.
    pub fn endpoint_url(&self, ctx: &Context) -> Option<String> {
        let path = self.path?;
        let scope_url = match self.scope {
            UrlScope::App => ctx.app_url.as_str(),
            UrlScope::Domain => ctx.domain_url.as_deref().unwrap_or(&ctx.app_url),
        };
        Some(format!("{scope_url}/{path}"))
    }
}

/// Schema for records without a declared type.
pub static RECORD: Schema = Schema::GENERIC;

/// One interpreted field.
#[derive(Debug, Clone)]
pub enum FieldValue {
    Scalar(Value),
    Record(Box<Record>),
    Json(Map<String, Value>),
    List(Vec<Item>),
}

/// Entry of a list field.
#[derive(Debug, Clone)]
pub enum Item {
    Record(Record),
    Raw(Value),
}

impl FieldValue {
    /// Form sent to the server: nested records shrink to their
    /// identifying value.
    pub fn to_wire(&self) -> Value {
        match self {
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Record(r) => r.serialize_nested(),
            FieldValue::Json(m) => Value::Object(m.clone()),
            FieldValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Item::Record(r) => r.serialize_nested(),
                        Item::Raw(v) => v.clone(),
                    })
                    .collect(),
            ),
        }
    }

    /// Full-depth JSON.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Scalar(v) => v.clone(),
            FieldValue::Record(r) => Value::Object(r.to_json()),
            FieldValue::Json(m) => Value::Object(m.clone()),
            FieldValue::List(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Item::Record(r) => Value::Object(r.to_json()),
                        Item::Raw(v) => v.clone(),
                    })
                    .collect(),
            ),
        }
    }
}

fn interpret(schema: &'static Schema, ctx: &Context, key: &str, value: Value) -> FieldValue {
    let kind = schema.field_kind(key);
    let nested = match kind {
        Some(FieldKind::Nested(s)) => *s,
        _ => &RECORD,
    };
    match value {
        Value::Object(map) if matches!(kind, Some(FieldKind::Json)) => FieldValue::Json(map),
        Value::Object(map) => FieldValue::Record(Box::new(Record::new(map, nested, ctx.clone()))),
        Value::Array(items) if !matches!(kind, Some(FieldKind::Json)) => FieldValue::List(
            items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) if map.contains_key("id") => {
                        Item::Record(Record::new(map, nested, ctx.clone()))
                    }
                    other => Item::Raw(other),
                })
                .collect(),
        ),
        other => FieldValue::Scalar(other),
    }
}

/// Path segment for a scalar.
fn segment(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// A server object bound to its resource type.
#[derive(Clone)]
pub struct Record {
    schema: &'static Schema,
    ctx: Context,
    config: Map<String, Value>,
    fields: Vec<(String, FieldValue)>,
    snapshot: Vec<(String, FieldValue)>,
    /// Last value the server holds for each protected field.
    persisted: Map<String, Value>,
    url: Option<String>,
}

impl Record {
    pub fn new(config: Map<String, Value>, schema: &'static Schema, ctx: Context) -> Self {
        let fields: Vec<(String, FieldValue)> = config
            .iter()
            .map(|(k, v)| (k.clone(), interpret(schema, &ctx, k, v.clone())))
            .collect();

        let url = schema.endpoint_url(&ctx).and_then(|ep_url| {
            let key = match schema.url_key {
                UrlKey::Id => config.get("id").and_then(segment),
                UrlKey::Fields(names) => names
                    .iter()
                    .map(|name| config.get(*name).and_then(segment))
                    .collect::<Option<Vec<_>>>()
                    .map(|parts| parts.join("/")),
            }?;
            Some(format!("{ep_url}/{key}"))
        });

        let persisted = schema
            .protected
            .iter()
            .filter_map(|f| config.get(*f).map(|v| (f.to_string(), v.clone())))
            .collect();

        Self {
            schema,
            ctx,
            config,
            persisted,
            snapshot: fields.clone(),
            fields,
            url,
        }
    }

    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    /// URL addressing this record, when it has one.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Untouched copy of the server config.
    pub fn dump(&self) -> Map<String, Value> {
        self.config.clone()
    }

    /// Deserialize the server config into a typed view.
    pub fn to_typed<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(self.dump()))?)
    }

    pub fn id(&self) -> Option<&Value> {
        match self.get("id") {
            Some(FieldValue::Scalar(v)) if !v.is_null() => Some(v),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut FieldValue> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn scalar(&self, key: &str) -> Option<&Value> {
        match self.get(key) {
            Some(FieldValue::Scalar(v)) => Some(v),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.scalar(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.scalar(key).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.scalar(key).and_then(Value::as_bool)
    }

    pub fn nested(&self, key: &str) -> Option<&Record> {
        match self.get(key) {
            Some(FieldValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn nested_mut(&mut self, key: &str) -> Option<&mut Record> {
        match self.get_mut(key) {
            Some(FieldValue::Record(r)) => Some(r),
            _ => None,
        }
    }

    pub fn list(&self, key: &str) -> Option<&[Item]> {
        match self.get(key) {
            Some(FieldValue::List(items)) => Some(items),
            _ => None,
        }
    }

    pub fn json_field(&self, key: &str) -> Option<&Map<String, Value>> {
        match self.get(key) {
            Some(FieldValue::Json(m)) => Some(m),
            _ => None,
        }
    }

    /// Set a field, interpreting `value` the way construction would.
    ///
    /// Fields that did not exist at construction always show up in
    /// [`diff`](Self::diff).
    pub fn set_attribute(&mut self, key: &str, value: impl Into<Value>) {
        let field = interpret(self.schema, &self.ctx, key, value.into());
        match self.get_mut(key) {
            Some(slot) => *slot = field,
            None => self.fields.push((key.to_string(), field)),
        }
    }

    /// Drop a field from both live state and snapshot.
    pub fn unset_attribute(&mut self, key: &str) -> Option<FieldValue> {
        self.snapshot.retain(|(k, _)| k != key);
        let idx = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(idx).1)
    }

    /// Current state as sent to the server.
    pub fn serialize(&self) -> Map<String, Value> {
        self.wire(&self.fields)
    }

    /// Construction-time state as it would have been sent.
    pub fn serialize_initial(&self) -> Map<String, Value> {
        self.wire(&self.snapshot)
    }

    /// Value used when this record is embedded in a parent.
    pub fn serialize_nested(&self) -> Value {
        self.schema
            .return_fields
            .iter()
            .filter_map(|f| self.scalar(f))
            .find(|v| !v.is_null() && v.as_str() != Some(""))
            .cloned()
            .unwrap_or_else(|| Value::String(self.to_string()))
    }

    fn wire(&self, fields: &[(String, FieldValue)]) -> Map<String, Value> {
        fields
            .iter()
            .filter(|(k, _)| !self.schema.is_read_only(k))
            .map(|(k, v)| (k.clone(), v.to_wire()))
            .collect()
    }

    /// Full-depth JSON of the current state.
    pub fn to_json(&self) -> Map<String, Value> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.to_json()))
            .collect()
    }

    /// Names of writable fields whose current value differs from the
    /// snapshot.
    pub fn diff(&self) -> BTreeSet<String> {
        let current = self.serialize();
        let initial = self.serialize_initial();

        let mut changed = BTreeSet::new();
        for key in current.keys().chain(initial.keys()) {
            let same = match (current.get(key), initial.get(key)) {
                (Some(a), Some(b)) => self.same_value(key, a, b),
                _ => false,
            };
            if !same {
                changed.insert(key.clone());
            }
        }
        changed
    }

    fn same_value(&self, key: &str, a: &Value, b: &Value) -> bool {
        match (self.schema.field_kind(key), a, b) {
            (Some(FieldKind::Unordered), Value::Array(x), Value::Array(y)) => {
                let mut x: Vec<String> = x.iter().map(Value::to_string).collect();
                let mut y: Vec<String> = y.iter().map(Value::to_string).collect();
                x.sort();
                y.sort();
                x == y
            }
            _ => a == b,
        }
    }

    /// Body for a full-object PUT.
    pub fn save_payload(&self, diff: &BTreeSet<String>) -> Map<String, Value> {
        let mut payload = self.serialize();
        if let Some(id) = self.config.get("id") {
            payload.insert("id".to_string(), id.clone());
        }
        for field in self.schema.protected {
            if diff.contains(*field) {
                continue;
            }
            if let Some(stored) = self.persisted.get(*field) {
                payload.insert(field.to_string(), stored.clone());
            }
        }
        payload
    }

    fn ensure_writable(&self, operation: &'static str) -> Result<()> {
        if self.schema.writable {
            Ok(())
        } else {
            Err(Error::unsupported(self.schema.name, operation))
        }
    }

    fn address(&self, operation: &str) -> Result<&str> {
        if self.id().is_none() {
            return Err(Error::usage(format!(
                "{} '{}' has no id; nothing to {operation} on the server",
                self.schema.name, self
            )));
        }
        self.url.as_deref().ok_or_else(|| {
            Error::usage(format!(
                "{} '{}' has no endpoint url to {operation}",
                self.schema.name, self
            ))
        })
    }

    /// Push local changes. Returns false, without a network call, when
    /// nothing changed.
    pub async fn save(&mut self) -> Result<bool> {
        self.save_with(Vec::new()).await
    }

    /// [`save`](Self::save) with extra query parameters.
    pub async fn save_with(&mut self, params: Params) -> Result<bool> {
        self.save_at("", params).await
    }

    /// Save by PUT to `key` below this record's URL.
    pub async fn save_at(&mut self, key: &str, params: Params) -> Result<bool> {
        self.ensure_writable("save")?;
        let url = self.address("save")?.to_string();

        let diff = self.diff();
        if diff.is_empty() {
            debug!("{}: nothing to save", url);
            return Ok(false);
        }
        debug!("{}: changed fields {:?}", url, diff);

        let payload = self.save_payload(&diff);
        Request::new(&self.ctx.session, &url)
            .key(key)
            .filters(params)
            .put_json(&Value::Object(payload.clone()))
            .await?;

        for field in self.schema.protected {
            if let Some(sent) = payload.get(*field) {
                self.persisted.insert(field.to_string(), sent.clone());
            }
        }
        self.snapshot = self.fields.clone();
        Ok(true)
    }

    /// Apply every key of `data`, then [`save`](Self::save).
    pub async fn update(&mut self, data: Map<String, Value>) -> Result<bool> {
        self.ensure_writable("update")?;
        for (key, value) in data {
            self.set_attribute(&key, value);
        }
        self.save().await
    }

    pub async fn delete(&self) -> Result<bool> {
        self.delete_with(Vec::new()).await
    }

    pub async fn delete_with(&self, params: Params) -> Result<bool> {
        self.ensure_writable("delete")?;
        let url = self.address("delete")?;
        Request::new(&self.ctx.session, url)
            .filters(params)
            .delete()
            .await
    }

    /// Request below this record's URL.
    pub fn request(&self, key: &str) -> Result<Request> {
        let url = self.address("address")?;
        Ok(Request::new(&self.ctx.session, url).key(key))
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = self.get_str(self.schema.label).filter(|l| !l.is_empty()) {
            return f.write_str(label);
        }
        match self.id().and_then(segment) {
            Some(id) => f.write_str(&id),
            None => f.write_str("__unknown__"),
        }
    }
}

impl fmt::Debug for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("type", &self.schema.name)
            .field("fields", &self.fields)
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name == other.schema.name && self.id() == other.id()
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name.hash(state);
        self.id().map(Value::to_string).hash(state);
    }
}

/// A typed wrapper around [`Record`] that endpoints can produce.
pub trait Resource: Sized {
    fn schema() -> &'static Schema;
    fn from_record(record: Record) -> Self;
    fn record(&self) -> &Record;
}

impl Resource for Record {
    fn schema() -> &'static Schema {
        &RECORD
    }

    fn from_record(record: Record) -> Self {
        record
    }

    fn record(&self) -> &Record {
        self
    }
}

/// Declare a newtype resource over [`Record`] bound to a schema.
macro_rules! resource {
    ($(#[$meta:meta])* $name:ident, $schema:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub struct $name(pub $crate::firemon::record::Record);

        impl $crate::firemon::record::Resource for $name {
            fn schema() -> &'static $crate::firemon::record::Schema {
                &$schema
            }

            fn from_record(record: $crate::firemon::record::Record) -> Self {
                Self(record)
            }

            fn record(&self) -> &$crate::firemon::record::Record {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = $crate::firemon::record::Record;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl std::ops::DerefMut for $name {
            fn deref_mut(&mut self) -> &mut Self::Target {
                &mut self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

pub(crate) use resource;
