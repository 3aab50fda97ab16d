use serde::{Deserialize, Serialize};

use crate::alarm::AlarmChange;
use crate::controller::TableSnapshot;
use crate::response::InvocationInfo;

/// A report pushed by the provider to its observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "report", content = "data")]
pub enum Report {
    /// Periodic table state.
    Metrics(TableSnapshot),
    /// Alarms whose presence changed since the previous report.
    Alert(Vec<AlarmChange>),
    /// A command has been invoked.
    OperationInvoked(InvocationInfo),
}

impl Report {
    /// Returns the report name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Metrics(_) => "Metrics",
            Self::Alert(_) => "Alert",
            Self::OperationInvoked(_) => "OperationInvoked",
        }
    }

    /// Encodes a report as a single line of JSON, newline included.
    ///
    /// # Errors
    ///
    /// Returns an error when the report cannot be serialized.
    pub fn to_line(&self) -> serde_json::Result<Vec<u8>> {
        let mut line = serde_json::to_vec(self)?;
        line.push(b'\n');
        Ok(line)
    }

    /// Decodes a report from a line of JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when the line is not a valid report.
    pub fn from_line(line: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(line.trim_ascii())
    }
}
