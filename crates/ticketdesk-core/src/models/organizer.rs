use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl Organizer {
    pub fn contact(&self) -> String {
        match (&self.email, &self.phone) {
            (Some(email), Some(phone)) => format!("{} / {}", email, phone),
            (Some(email), None) => email.clone(),
            (None, Some(phone)) => phone.clone(),
            (None, None) => "-".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrganizer {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
