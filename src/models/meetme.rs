use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    consts::{field, meetme_const::SUBJECT_PLACEHOLDER},
    fields,
    models::status::MeetmeStatus,
};

/// A meetme request as persisted in the `meetmes` collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Meetme {
    pub id: String,
    #[serde(rename = "user")]
    pub owner_id: String,
    pub request_id: u64,
    pub name: String,
    pub phone: String,
    /// The initiating complaint, duplicated as the first thread message.
    pub message: String,
    pub status: MeetmeStatus,
    #[serde(default)]
    pub subject: String,
    pub created: String,
    pub updated: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMeetme {
    pub name: String,
    pub phone: String,
    pub message: String,
}

impl NewMeetme {
    pub fn into_fields(
        self,
        owner_id: &str,
        request_id: u64,
        status: MeetmeStatus,
    ) -> Map<String, Value> {
        fields! {
            field::USER => owner_id,
            field::REQUEST_ID => request_id,
            field::NAME => self.name,
            field::PHONE => self.phone,
            field::MESSAGE => self.message,
            field::STATUS => status,
            field::SUBJECT => SUBJECT_PLACEHOLDER,
        }
    }
}

/// Owner-facing shape of a meetme.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MeetmeView {
    pub id: String,
    pub request_id: u64,
    pub name: String,
    pub phone: String,
    pub message: String,
    pub status: MeetmeStatus,
    pub subject: String,
    pub created: String,
    pub updated: String,
}

impl From<Meetme> for MeetmeView {
    fn from(m: Meetme) -> Self {
        MeetmeView {
            id: m.id,
            request_id: m.request_id,
            name: m.name,
            phone: m.phone,
            message: m.message,
            status: m.status,
            subject: m.subject,
            created: m.created,
            updated: m.updated,
        }
    }
}

/// Admin-facing shape: adds the owner and the owner's email.
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdminMeetmeView {
    #[serde(flatten)]
    pub meetme: MeetmeView,
    pub user_id: String,
    pub user_email: String,
}

impl AdminMeetmeView {
    pub fn new(meetme: Meetme, user_email: String) -> Self {
        AdminMeetmeView {
            user_id: meetme.owner_id.clone(),
            meetme: meetme.into(),
            user_email,
        }
    }
}
