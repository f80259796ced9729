//! View-model records and service response shapes

use crate::errors::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const METRIC_NAME: &str = "Active Survey(s)";
pub const METRIC_LOADING: &str = "Loading...";
pub const OFFLINE: &str = "Offline";
pub const ONLINE: &str = "Online";
pub const LOADING: &str = "Loading";

/// Deployment the widget talks to, as supplied by the host console
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct Context {
    #[serde(rename = "ServiceUrl")]
    pub service_url: String,
    pub identifier: String,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum StyleType {
    Loading,
    Enabled,
    Offline,
}

impl fmt::Display for StyleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleType::Loading => write!(f, "Loading"),
            StyleType::Enabled => write!(f, "Enabled"),
            StyleType::Offline => write!(f, "Offline"),
        }
    }
}

/// Connectivity badge of the backend service
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TackableStatus {
    pub label: String,
    #[serde(rename = "styleType")]
    pub style_type: StyleType,
}

impl TackableStatus {
    pub fn loading() -> Self {
        Self {
            label: LOADING.to_string(),
            style_type: StyleType::Loading,
        }
    }

    pub fn online() -> Self {
        Self {
            label: ONLINE.to_string(),
            style_type: StyleType::Enabled,
        }
    }

    pub fn offline() -> Self {
        Self {
            label: OFFLINE.to_string(),
            style_type: StyleType::Offline,
        }
    }

    /// Map the reported service status onto a badge; only the exact string `online` counts
    pub fn from_service_status(status: &str) -> Self {
        if status == "online" {
            Self::online()
        } else {
            Self::offline()
        }
    }

    pub fn is_loading(&self) -> bool {
        self.style_type == StyleType::Loading
    }
}

impl Default for TackableStatus {
    fn default() -> Self {
        Self::loading()
    }
}

/// Either a placeholder/fallback text or a count
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum MeasureValue {
    Count(usize),
    Text(String),
}

impl fmt::Display for MeasureValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasureValue::Count(n) => write!(f, "{}", n),
            MeasureValue::Text(text) => write!(f, "{}", text),
        }
    }
}

/// A single named metric
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TackableMeasure {
    pub name: String,
    pub value: MeasureValue,
}

impl TackableMeasure {
    pub fn loading() -> Self {
        Self {
            name: METRIC_NAME.to_string(),
            value: MeasureValue::Text(METRIC_LOADING.to_string()),
        }
    }

    pub fn count(n: usize) -> Self {
        Self {
            name: METRIC_NAME.to_string(),
            value: MeasureValue::Count(n),
        }
    }

    pub fn offline() -> Self {
        Self {
            name: METRIC_NAME.to_string(),
            value: MeasureValue::Text(OFFLINE.to_string()),
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(&self.value, MeasureValue::Text(text) if text == METRIC_LOADING)
    }
}

impl Default for TackableMeasure {
    fn default() -> Self {
        Self::loading()
    }
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct SurveyMetadataResult {
    metadata_list: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ServiceStatusResult {
    status: String,
}

/// Number of entries in `result.metadata_list` of an `active/survey_metadata` body
pub fn parse_active_survey_count(body: &str) -> Result<usize> {
    let envelope: Envelope<SurveyMetadataResult> = serde_json::from_str(body)?;
    Ok(envelope.result.metadata_list.len())
}

/// `result.status` of a `service/status` body
pub fn parse_service_status(body: &str) -> Result<String> {
    let envelope: Envelope<ServiceStatusResult> = serde_json::from_str(body)?;
    Ok(envelope.result.status)
}
