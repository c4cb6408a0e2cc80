//! Meetme lifecycle: creation under the one-open-meetme rule, the threaded
//! message exchange, and the status transitions those operations imply.

use std::{collections::HashMap, sync::Arc};

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    consts::{
        field,
        meetme_const::{MESSAGE_LIST_LIMIT, USER_LIST_LIMIT},
        store_const::{MAX_PER_PAGE, MEETME_MESSAGE_TABLE, MEETME_TABLE, USER_TABLE},
    },
    errors::{Error, Result},
    fields,
    models::{
        meetme::{AdminMeetmeView, Meetme, NewMeetme},
        message::{AuthorType, MeetmeMessage},
        permission::{Action, PermissionChecker},
        status::{MeetmeEvent, MeetmeStatus, next_status},
        user::{Principal, User},
    },
    services::numbering::RequestNumbers,
    store::{Filter, ListQuery, Page, RecordStore, StoreError, Sort},
};

pub struct MeetmeService {
    store: Arc<dyn RecordStore>,
    numbers: RequestNumbers,
    /// Serializes check-then-insert per owner.
    owner_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl MeetmeService {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        MeetmeService {
            store,
            numbers: RequestNumbers::new(),
            owner_locks: DashMap::new(),
        }
    }

    pub async fn create_meetme(&self, principal: &Principal, input: NewMeetme) -> Result<Meetme> {
        principal.check_permission(Action::Create, None)?;
        let input = NewMeetme {
            name: required(&input.name),
            phone: required(&input.phone),
            message: required(&input.message),
        };
        if input.name.is_empty() || input.phone.is_empty() || input.message.is_empty() {
            return Err(Error::InvalidInput(
                "Name, phone, and message are required".to_string(),
            ));
        }

        let owner = principal.user_id.as_str();
        // declared before the lock so it runs after the lock is released, even on cancellation
        let _release = OwnerLockRelease {
            locks: &self.owner_locks,
            owner,
        };
        let lock = self.owner_locks.entry(owner.to_string()).or_default().clone();
        let _guard = lock.lock().await;
        self.create_locked(owner, input).await
    }

    async fn create_locked(&self, owner: &str, input: NewMeetme) -> Result<Meetme> {
        if let Some(existing) = self.open_meetme_of(owner).await? {
            info!("User {owner} already has open meetme {}", existing.id);
            return Err(Error::OpenMeetmeExists(existing.id));
        }

        let status = next_status(MeetmeStatus::Pending, MeetmeEvent::Created)
            .map_err(|e| Error::InvalidState(e.to_string()))?;
        let request_id = self.numbers.next(self.store.as_ref()).await?;
        let first_message = input.message.clone();
        let meetme: Meetme = self
            .store
            .create(MEETME_TABLE, input.into_fields(owner, request_id, status))
            .await?
            .decode()?;
        info!("Meetme {} (#{}) created by {owner}", meetme.id, meetme.request_id);

        // not transactional: the meetme stays if its first message cannot be written
        if let Err(e) = self
            .store
            .create(
                MEETME_MESSAGE_TABLE,
                MeetmeMessage::new_fields(&meetme.id, AuthorType::User, &first_message),
            )
            .await
        {
            error!("Meetme {} created without its first message: {e}", meetme.id);
            return Err(e.into());
        }
        Ok(meetme)
    }

    /// The owner's meetme in an open status, if any.
    pub async fn open_meetme_of(&self, owner: &str) -> Result<Option<Meetme>> {
        let query = ListQuery::new(Filter::And(vec![
            Filter::eq(field::USER, owner),
            Filter::any_of(field::STATUS, MeetmeStatus::open_statuses().map(MeetmeStatus::as_str)),
        ]))
        .page(1, 1);
        let page = self.store.get_list(MEETME_TABLE, &query).await?;
        Ok(page.items.first().map(|r| r.decode::<Meetme>()).transpose()?)
    }

    pub async fn get_meetme(&self, principal: &Principal, id: &str) -> Result<Meetme> {
        let meetme = self.load(id).await?;
        principal.check_permission(Action::Read, Some(&meetme))?;
        Ok(meetme)
    }

    /// The caller's own meetmes, newest first.
    pub async fn list_for_owner(&self, principal: &Principal) -> Result<Vec<Meetme>> {
        let query = ListQuery::new(Filter::eq(field::USER, principal.user_id.as_str()))
            .sort(Sort::desc(field::CREATED))
            .page(1, USER_LIST_LIMIT);
        let page = self.store.get_list(MEETME_TABLE, &query).await?;
        Ok(page
            .items
            .iter()
            .map(|r| r.decode::<Meetme>())
            .collect::<core::result::Result<_, _>>()?)
    }

    /// Every meetme, newest first, optionally narrowed to one status.
    pub async fn list_all(
        &self,
        principal: &Principal,
        status: Option<MeetmeStatus>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<AdminMeetmeView>> {
        principal.check_permission(Action::Administer, None)?;

        let filter = match status {
            Some(status) => Filter::eq(field::STATUS, status.as_str()),
            None => Filter::All,
        };
        let query = ListQuery::new(filter)
            .sort(Sort::desc(field::CREATED))
            .page(page, per_page);
        let records = self.store.get_list(MEETME_TABLE, &query).await?;
        let meetmes = records.try_map(|r| r.decode::<Meetme>())?;

        let mut emails: HashMap<String, String> = HashMap::new();
        for meetme in &meetmes.items {
            if !emails.contains_key(&meetme.owner_id) {
                let email = self.owner_email(&meetme.owner_id).await;
                emails.insert(meetme.owner_id.clone(), email);
            }
        }
        meetmes.try_map(|m| {
            let email = emails.get(&m.owner_id).cloned().unwrap_or_default();
            Ok::<_, Error>(AdminMeetmeView::new(m, email))
        })
    }

    /// A meetme with its owner's email, for the admin panel.
    pub async fn admin_view(&self, principal: &Principal, id: &str) -> Result<AdminMeetmeView> {
        principal.check_permission(Action::Administer, None)?;
        let meetme = self.load(id).await?;
        let email = self.owner_email(&meetme.owner_id).await;
        Ok(AdminMeetmeView::new(meetme, email))
    }

    /// Thread of a meetme, oldest first.
    pub async fn list_messages(&self, principal: &Principal, id: &str) -> Result<Vec<MeetmeMessage>> {
        let meetme = self.load(id).await?;
        principal.check_permission(Action::ReadMessages, Some(&meetme))?;
        self.thread(&meetme.id).await
    }

    async fn thread(&self, meetme_id: &str) -> Result<Vec<MeetmeMessage>> {
        let query = ListQuery::new(Filter::eq(field::MEETME, meetme_id))
            .sort(Sort::asc(field::CREATED))
            .page(1, MESSAGE_LIST_LIMIT);
        let page = self.store.get_list(MEETME_MESSAGE_TABLE, &query).await?;
        Ok(page
            .items
            .iter()
            .map(|r| r.decode::<MeetmeMessage>())
            .collect::<core::result::Result<_, _>>()?)
    }

    pub async fn post_user_message(
        &self,
        principal: &Principal,
        id: &str,
        body: &str,
    ) -> Result<MeetmeMessage> {
        let meetme = self.load(id).await?;
        principal.check_permission(Action::PostUserMessage, Some(&meetme))?;
        let next = next_status(meetme.status, MeetmeEvent::UserMessage)
            .map_err(|e| Error::InvalidState(e.to_string()))?;
        let body = message_body(body)?;

        let message = self.append(&meetme, AuthorType::User, &body).await?;
        self.apply_status(&meetme, next).await?;
        Ok(message)
    }

    pub async fn post_admin_message(
        &self,
        principal: &Principal,
        id: &str,
        body: &str,
        explicit: Option<MeetmeStatus>,
    ) -> Result<MeetmeMessage> {
        principal.check_permission(Action::PostAdminMessage, None)?;
        let meetme = self.load(id).await?;
        let next = next_status(meetme.status, MeetmeEvent::AdminMessage { explicit })
            .map_err(|e| Error::InvalidState(e.to_string()))?;
        let body = message_body(body)?;

        let message = self.append(&meetme, AuthorType::Admin, &body).await?;
        self.apply_status(&meetme, next).await?;
        Ok(message)
    }

    pub async fn set_status(
        &self,
        principal: &Principal,
        id: &str,
        status: MeetmeStatus,
    ) -> Result<Meetme> {
        principal.check_permission(Action::SetStatus, None)?;
        let meetme = self.load(id).await?;
        let next = next_status(meetme.status, MeetmeEvent::AdminSetStatus(status))
            .map_err(|e| Error::InvalidState(e.to_string()))?;
        self.apply_status(&meetme, next).await
    }

    /// Administrative cleanup: removes the thread, then the meetme.
    pub async fn delete_meetme(&self, principal: &Principal, id: &str) -> Result<()> {
        principal.check_permission(Action::Delete, None)?;
        let meetme = self.load(id).await?;

        let query = ListQuery::new(Filter::eq(field::MEETME, meetme.id.as_str())).page(1, MAX_PER_PAGE);
        loop {
            let page = self.store.get_list(MEETME_MESSAGE_TABLE, &query).await?;
            if page.items.is_empty() {
                break;
            }
            for message in page.items {
                self.store.delete(MEETME_MESSAGE_TABLE, &message.id).await?;
            }
        }
        self.store.delete(MEETME_TABLE, &meetme.id).await?;
        info!("Meetme {} (#{}) deleted by {}", meetme.id, meetme.request_id, principal.user_id);
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Meetme> {
        match self.store.get_one(MEETME_TABLE, id).await {
            Ok(record) => Ok(record.decode()?),
            Err(StoreError::NotFound { .. }) => Err(Error::MeetmeNotFound),
            Err(e) => Err(e.into()),
        }
    }

    async fn append(&self, meetme: &Meetme, author: AuthorType, body: &str) -> Result<MeetmeMessage> {
        let message: MeetmeMessage = self
            .store
            .create(
                MEETME_MESSAGE_TABLE,
                MeetmeMessage::new_fields(&meetme.id, author, body),
            )
            .await?
            .decode()?;
        info!("{author:?} message {} posted on meetme {}", message.id, meetme.id);
        Ok(message)
    }

    /// Writes `status` only when it differs from the status `meetme` was loaded
    /// with, so a stale unchanged status never overwrites a concurrent change.
    async fn apply_status(&self, meetme: &Meetme, status: MeetmeStatus) -> Result<Meetme> {
        if meetme.status == status {
            return Ok(meetme.clone());
        }
        let updated: Meetme = match self
            .store
            .update(MEETME_TABLE, &meetme.id, fields! { field::STATUS => status })
            .await
        {
            Ok(record) => record.decode()?,
            Err(StoreError::NotFound { .. }) => return Err(Error::MeetmeNotFound),
            Err(e) => return Err(e.into()),
        };
        info!("Meetme {} status {} -> {}", meetme.id, meetme.status, status);
        Ok(updated)
    }

    /// Owner email for admin views; empty when the owner no longer resolves.
    async fn owner_email(&self, owner_id: &str) -> String {
        match self.store.get_one(USER_TABLE, owner_id).await {
            Ok(record) => record.decode::<User>().map(|u| u.email).unwrap_or_default(),
            Err(StoreError::NotFound { .. }) => String::new(),
            Err(e) => {
                warn!("Could not resolve owner {owner_id}: {e}");
                String::new()
            }
        }
    }
}

/// Drops the owner's lock entry once no other caller holds or awaits it.
struct OwnerLockRelease<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    owner: &'a str,
}

impl Drop for OwnerLockRelease<'_> {
    fn drop(&mut self) {
        self.locks
            .remove_if(self.owner, |_, lock| Arc::strong_count(lock) == 1);
    }
}

fn required(value: &str) -> String {
    value.trim().to_string()
}

fn message_body(body: &str) -> Result<String> {
    let body = body.trim();
    if body.is_empty() {
        return Err(Error::InvalidInput("Message is required".to_string()));
    }
    Ok(body.to_string())
}
