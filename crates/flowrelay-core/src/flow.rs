//! Flow identifiers and actions sent with every runFlow call.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flow that receives uploaded materials by default.
pub const DEFAULT_FLOW_ID: &str = "z244yolix5cg9meb";
/// Action the default flow runs for materials uploads.
pub const DEFAULT_ACTION: &str = "materials_excel";

/// A named action on a remote flow, offered to operators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowAction {
    pub flow_id: String,
    pub action: String,
    pub name: String,
}

impl FlowAction {
    pub fn new(
        flow_id: impl Into<String>,
        action: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            flow_id: flow_id.into(),
            action: action.into(),
            name: name.into(),
        }
    }

    /// Built-in catalogue.
    pub fn builtin() -> Vec<Self> {
        vec![
            Self::new(DEFAULT_FLOW_ID, "query_order_record", "客户需求记录表"),
            Self::new(DEFAULT_FLOW_ID, "clear_order_record", "清空复测数据"),
        ]
    }

    pub fn params(&self) -> RunFlowParams {
        RunFlowParams::new(&self.flow_id, &self.action)
    }
}

/// Static per-dispatch parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunFlowParams {
    pub flow_id: String,
    pub action: String,
}

impl Default for RunFlowParams {
    fn default() -> Self {
        Self::new(DEFAULT_FLOW_ID, DEFAULT_ACTION)
    }
}

impl RunFlowParams {
    pub fn new(flow_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            flow_id: flow_id.into(),
            action: action.into(),
        }
    }

    /// Fill unset parts from the defaults.
    pub fn or_default(flow_id: Option<String>, action: Option<String>) -> Self {
        Self {
            flow_id: flow_id.unwrap_or_else(|| DEFAULT_FLOW_ID.to_string()),
            action: action.unwrap_or_else(|| DEFAULT_ACTION.to_string()),
        }
    }

    /// Params as the JSON object merged into each batch payload.
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("flowId".into(), Value::String(self.flow_id.clone()));
        map.insert("action".into(), Value::String(self.action.clone()));
        map
    }
}
