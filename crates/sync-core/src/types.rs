//! Core type definitions shared across the workspace

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Category of backed-up artifact
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Bucket {
    /// Tensorboard run logs
    TensorboardLogs,

    /// Serialized dataframes
    Dataframes,

    /// Model checkpoint files
    ModelCheckpoints,
}

impl Bucket {
    /// Every bucket, in layout order
    pub const ALL: [Bucket; 3] = [
        Bucket::TensorboardLogs,
        Bucket::Dataframes,
        Bucket::ModelCheckpoints,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::TensorboardLogs => "tensorboard-logs",
            Bucket::Dataframes => "dataframes",
            Bucket::ModelCheckpoints => "model-checkpoints",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tensorboard-logs" | "tensorboard" | "runs" => Ok(Bucket::TensorboardLogs),
            "dataframes" => Ok(Bucket::Dataframes),
            "model-checkpoints" | "models" | "models_states" => Ok(Bucket::ModelCheckpoints),
            other => Err(Error::InvalidConfig {
                message: format!("unknown bucket: {}", other),
            }),
        }
    }
}

/// Push-notification provider
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationService {
    #[default]
    Pushover,
}

impl FromStr for NotificationService {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pushover" => Ok(NotificationService::Pushover),
            other => Err(Error::InvalidConfig {
                message: format!("unsupported notification service: {}", other),
            }),
        }
    }
}

const PUSHOVER_CREDENTIALS_HELP: &str = "Pushover notifications require two params: app_token and user_token. \
user_token (also called USER_KEY or GROUP_KEY) is your Pushover User Key, shown on your dashboard. \
app_token (also called API_TOKEN) is your application's API Token; you can create one for free.";

/// Notification service plus its credential fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Which provider to talk to
    pub service: NotificationService,

    /// Credential fields, keyed by name
    pub params: HashMap<String, String>,
}

impl NotificationConfig {
    /// Build and validate a notification config
    ///
    /// # Errors
    /// Returns `Error::Authentication` if a required credential is missing or empty
    pub fn new(service: NotificationService, params: HashMap<String, String>) -> Result<Self> {
        let config = Self { service, params };
        config.validate()?;
        Ok(config)
    }

    /// Convenience constructor for Pushover credentials
    pub fn pushover(app_token: impl Into<String>, user_token: impl Into<String>) -> Result<Self> {
        let params = HashMap::from([
            ("app_token".to_string(), app_token.into()),
            ("user_token".to_string(), user_token.into()),
        ]);
        Self::new(NotificationService::Pushover, params)
    }

    /// Check that every credential the service needs is present
    pub fn validate(&self) -> Result<()> {
        match self.service {
            NotificationService::Pushover => {
                let complete = ["app_token", "user_token"]
                    .iter()
                    .all(|key| self.param(key).is_some());
                if complete {
                    Ok(())
                } else {
                    Err(Error::Authentication {
                        message: PUSHOVER_CREDENTIALS_HELP.to_string(),
                    })
                }
            }
        }
    }

    /// Look up a non-empty credential field
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }
}

/// Label prefixed to a notification message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum NotificationKind {
    #[default]
    Done,
    Error,
    Info,
    Custom(String),
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotificationKind::Done => f.write_str("DONE"),
            NotificationKind::Error => f.write_str("ERROR"),
            NotificationKind::Info => f.write_str("INFO"),
            NotificationKind::Custom(label) => f.write_str(label),
        }
    }
}

impl FromStr for NotificationKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s.to_ascii_uppercase().as_str() {
            "DONE" => NotificationKind::Done,
            "ERROR" => NotificationKind::Error,
            "INFO" => NotificationKind::Info,
            _ => NotificationKind::Custom(s.to_string()),
        })
    }
}

/// A single dataframe value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Bool(v) => write!(f, "{}", v),
            Cell::Int(v) => write!(f, "{}", v),
            Cell::Float(v) => write!(f, "{}", v),
            Cell::Text(v) => f.write_str(v),
        }
    }
}

impl From<i64> for Cell {
    fn from(v: i64) -> Self {
        Cell::Int(v)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<bool> for Cell {
    fn from(v: bool) -> Self {
        Cell::Bool(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

/// Column-labelled table of cells
///
/// Every row holds exactly one cell per column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl DataFrame {
    /// Create an empty frame with the given column names
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row
    ///
    /// # Errors
    /// Returns `Error::InvalidFrame` if the row width differs from the column count
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::InvalidFrame {
                message: format!(
                    "row has {} cells, frame has {} columns",
                    row.len(),
                    self.columns.len()
                ),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Check the row-width invariant, e.g. after deserialization
    pub fn validate(&self) -> Result<()> {
        match self.rows.iter().position(|r| r.len() != self.columns.len()) {
            Some(idx) => Err(Error::InvalidFrame {
                message: format!("row {} does not match {} columns", idx, self.columns.len()),
            }),
            None => Ok(()),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Outcome of a copy operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncReport {
    /// Number of files written to the destination
    pub files: u64,

    /// Total bytes written
    pub bytes: u64,

    /// When the copy finished
    pub completed_at: DateTime<Utc>,
}

impl SyncReport {
    pub fn new(files: u64, bytes: u64) -> Self {
        Self {
            files,
            bytes,
            completed_at: Utc::now(),
        }
    }
}
