//! Settings rows, migration records and the backup document

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use time::{Date, OffsetDateTime};

/// Row identifier
///
/// Older exports carry numeric ids, newer ones object-id strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Text(String),
    Number(i64),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

/// One row of the settings table, live or from a backup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RecordId>,

    pub key: String,

    /// Raw stored value; settings values are always strings or null
    #[serde(default)]
    pub value: Option<String>,

    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, with = "timestamp")]
    pub created_at: Option<OffsetDateTime>,

    #[serde(default)]
    pub created_by: Option<RecordId>,

    #[serde(default, with = "timestamp")]
    pub updated_at: Option<OffsetDateTime>,

    #[serde(default)]
    pub updated_by: Option<RecordId>,
}

impl SettingRecord {
    /// Create a bare row with only key and value set
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: None,
            key: key.into(),
            value: Some(value.into()),
            kind: String::new(),
            created_at: None,
            created_by: None,
            updated_at: None,
            updated_by: None,
        }
    }

    #[must_use]
    pub fn id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    #[must_use]
    pub fn kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    #[must_use]
    pub fn created(mut self, at: OffsetDateTime, by: impl Into<RecordId>) -> Self {
        self.created_at = Some(at);
        self.created_by = Some(by.into());
        self
    }

    #[must_use]
    pub fn updated(mut self, at: OffsetDateTime, by: impl Into<RecordId>) -> Self {
        self.updated_at = Some(at);
        self.updated_by = Some(by.into());
        self
    }

    /// Read a row from raw JSON, keeping whatever is usable
    ///
    /// Returns `None` when there is no string `key`. A non-string `value`
    /// reads as null, and audit fields that do not parse read as absent.
    pub fn from_json(raw: &Value) -> Option<Self> {
        let row = raw.as_object()?;
        let key = row.get("key")?.as_str()?.to_string();

        Some(Self {
            id: field(row, "id"),
            key,
            value: row.get("value").and_then(Value::as_str).map(str::to_string),
            kind: row
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            created_at: row.get("created_at").and_then(timestamp::from_json),
            created_by: field(row, "created_by"),
            updated_at: row.get("updated_at").and_then(timestamp::from_json),
            updated_by: field(row, "updated_by"),
        })
    }

    /// Exact string comparison against the stored value
    ///
    /// `null` never matches.
    #[must_use]
    pub fn value_is(&self, expected: &str) -> bool {
        self.value.as_deref() == Some(expected)
    }
}

fn field<'a, T: Deserialize<'a>>(row: &'a Map<String, Value>, name: &str) -> Option<T> {
    row.get(name).and_then(|v| T::deserialize(v).ok())
}

/// One applied migration as recorded inside a backup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationRecord {
    #[serde(default)]
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl MigrationRecord {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            name: None,
        }
    }

    /// Read a history entry from raw JSON; `None` without a string `version`
    pub fn from_json(raw: &Value) -> Option<Self> {
        let entry = raw.as_object()?;
        Some(Self {
            version: entry.get("version")?.as_str()?.to_string(),
            name: entry.get("name").and_then(Value::as_str).map(str::to_string),
        })
    }
}

/// Contents of a backup export that the repair cares about
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BackupDocument {
    pub settings: Vec<SettingRecord>,
    pub migrations: Vec<MigrationRecord>,
}

/// A dated backup file found in the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupFile {
    pub filename: String,
    pub date: Date,
    /// Full path, `filename` joined onto the directory it was found in
    pub path: PathBuf,
}

/// Timestamps as written by the settings table
///
/// Accepts RFC 3339, the SQL `YYYY-MM-DD HH:MM:SS[.fff]` form (taken as UTC)
/// and epoch milliseconds; always writes RFC 3339.
pub(crate) mod timestamp {
    use serde::{Deserialize, Deserializer, Serializer, de, ser};
    use serde_json::Value;
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;
    use time::{OffsetDateTime, PrimitiveDateTime};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Millis(i64),
    }

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => {
                let formatted = ts.format(&Rfc3339).map_err(<S::Error as ser::Error>::custom)?;
                serializer.serialize_some(&formatted)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        let raw: Option<Raw> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(Raw::Text(s)) => parse(&s)
                .map(Some)
                .map_err(<D::Error as de::Error>::custom),
            Some(Raw::Millis(ms)) => from_millis(ms).map(Some).ok_or_else(|| {
                <D::Error as de::Error>::custom(format!("timestamp {ms} out of range"))
            }),
        }
    }

    /// Lenient read of a raw JSON timestamp; anything unusable is `None`
    pub fn from_json(raw: &Value) -> Option<OffsetDateTime> {
        match raw {
            Value::String(s) => parse(s).ok(),
            Value::Number(n) => n.as_i64().and_then(from_millis),
            _ => None,
        }
    }

    pub fn parse(raw: &str) -> Result<OffsetDateTime, String> {
        if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
            return Ok(ts);
        }
        let sql = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
        let sql_fraction =
            format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
        PrimitiveDateTime::parse(raw, sql)
            .or_else(|_| PrimitiveDateTime::parse(raw, sql_fraction))
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|e| format!("unrecognized timestamp '{raw}': {e}"))
    }

    fn from_millis(ms: i64) -> Option<OffsetDateTime> {
        OffsetDateTime::from_unix_timestamp_nanos(i128::from(ms) * 1_000_000).ok()
    }
}
