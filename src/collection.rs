use serde::Serialize;
use uuid::Uuid;

/// Postman collection (v1 layout) produced by a conversion run.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Collection {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub order: Vec<Uuid>,
    pub folders: Vec<Folder>,
    pub timestamp: i64,
    pub synced: bool,
    pub requests: Vec<Request>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Folder {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub order: Vec<Uuid>,
    pub collection_name: String,
    pub collection_id: Uuid,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: Uuid,
    pub url: String,
    pub name: String,
    pub method: String,
    pub headers: String,
    pub data: String,
    pub data_mode: DataMode,
    pub collection_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tests: Option<String>,
}

#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DataMode {
    #[default]
    Raw,
}

impl Collection {
    pub fn to_json(&self, pretty: bool) -> serde_json::Result<String> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}
