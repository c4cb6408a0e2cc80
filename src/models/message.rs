use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{consts::field, fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorType {
    User,
    Admin,
}

/// One entry in a meetme's thread, stored in `meetme_messages`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetmeMessage {
    pub id: String,
    pub meetme: String,
    pub author_type: AuthorType,
    pub message: String,
    pub created: String,
}

impl MeetmeMessage {
    pub fn new_fields(meetme_id: &str, author: AuthorType, body: &str) -> Map<String, Value> {
        fields! {
            field::MEETME => meetme_id,
            field::AUTHOR_TYPE => author,
            field::MESSAGE => body,
        }
    }
}
