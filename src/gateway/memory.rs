use async_trait::async_trait;
use parking_lot::Mutex;

use super::{GatewayError, GatewayResult, RemoteStore};
use crate::config::Limits;
use crate::model::{Contact, ContactDate, ContactDraft, Tag, TagDraft, TagId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum StoreOperation {
    ListContacts,
    CreateContact,
    EditContact,
    DeleteContact,
    ListTags,
    CreateTag,
    EditTag,
    DeleteTag,
}

/// One call received by the store, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListContacts,
    CreateContact(String),
    EditContact(String),
    DeleteContact(String),
    ListTags,
    CreateTag(String),
    EditTag(TagId),
    DeleteTag(TagId),
}

impl StoreCall {
    pub fn operation(&self) -> StoreOperation {
        match self {
            StoreCall::ListContacts => StoreOperation::ListContacts,
            StoreCall::CreateContact(_) => StoreOperation::CreateContact,
            StoreCall::EditContact(_) => StoreOperation::EditContact,
            StoreCall::DeleteContact(_) => StoreOperation::DeleteContact,
            StoreCall::ListTags => StoreOperation::ListTags,
            StoreCall::CreateTag(_) => StoreOperation::CreateTag,
            StoreCall::EditTag(_) => StoreOperation::EditTag,
            StoreCall::DeleteTag(_) => StoreOperation::DeleteTag,
        }
    }

    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::ListContacts | StoreCall::ListTags)
    }
}

#[derive(Debug, Clone)]
struct StoredContact {
    name: String,
    date: ContactDate,
    tag_id: Option<TagId>,
}

#[derive(Debug, Default)]
struct Inner {
    contacts: Vec<StoredContact>,
    tags: Vec<Tag>,
    next_tag_id: TagId,
    calls: Vec<StoreCall>,
    faults: Vec<(StoreOperation, GatewayError)>,
}

impl Inner {
    fn take_fault(&mut self, operation: StoreOperation) -> GatewayResult<()> {
        match self.faults.iter().position(|(op, _)| *op == operation) {
            Some(index) => Err(self.faults.remove(index).1),
            None => Ok(()),
        }
    }

    fn tag_name_taken(&self, name: &str, except: Option<TagId>) -> bool {
        let lowered = name.to_lowercase();
        self.tags
            .iter()
            .any(|tag| Some(tag.id) != except && tag.name.to_lowercase() == lowered)
    }

    fn listed_contacts(&self) -> Vec<Contact> {
        self.contacts
            .iter()
            .map(|stored| Contact {
                name: stored.name.clone(),
                date: stored.date,
                // Joined at list time, so a deleted tag leaves the id dangling
                // without a label.
                tag: stored.tag_id.and_then(|id| {
                    self.tags
                        .iter()
                        .find(|tag| tag.id == id)
                        .map(|tag| tag.name.clone())
                }),
                tag_id: stored.tag_id,
            })
            .collect()
    }
}

/// In-process store that enforces the server's rules: contact and tag
/// ceilings, case-insensitive tag names, NotFound on stale targets and no
/// cascade when a tag is deleted. Every call is journaled.
#[derive(Debug)]
pub struct InMemoryStore {
    max_contacts: usize,
    max_tags: usize,
    inner: Mutex<Inner>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::with_limits(&Limits::default())
    }
}

impl InMemoryStore {
    pub fn with_limits(limits: &Limits) -> Self {
        Self {
            max_contacts: limits.max_contacts,
            max_tags: limits.max_tags,
            inner: Mutex::new(Inner {
                next_tag_id: 1,
                ..Inner::default()
            }),
        }
    }

    /// Inserts a contact without journaling or limit checks.
    pub fn seed_contact(&self, name: &str, date: ContactDate, tag_id: Option<TagId>) {
        self.inner.lock().contacts.push(StoredContact {
            name: name.to_owned(),
            date,
            tag_id,
        });
    }

    /// Inserts a tag without journaling or limit checks and returns its id.
    pub fn seed_tag(&self, name: &str, color: Option<&str>) -> TagId {
        let mut inner = self.inner.lock();
        let id = inner.next_tag_id;
        inner.next_tag_id += 1;
        inner.tags.push(Tag {
            id,
            name: name.to_owned(),
            color: color.map(str::to_owned),
        });
        id
    }

    /// The next call of `operation` fails with `error` instead of applying.
    pub fn fail_next(&self, operation: StoreOperation, error: GatewayError) {
        self.inner.lock().faults.push((operation, error));
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.inner.lock().calls.clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.calls()
            .into_iter()
            .filter(StoreCall::is_mutation)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    pub fn contact_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .contacts
            .iter()
            .map(|contact| contact.name.clone())
            .collect()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.inner
            .lock()
            .tags
            .iter()
            .map(|tag| tag.name.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_contacts(&self) -> GatewayResult<Vec<Contact>> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::ListContacts);
        inner.take_fault(StoreOperation::ListContacts)?;
        Ok(inner.listed_contacts())
    }

    async fn create_contact(&self, draft: &ContactDraft) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::CreateContact(draft.name.clone()));
        inner.take_fault(StoreOperation::CreateContact)?;
        if draft.name.trim().is_empty() {
            return Err(GatewayError::Validation("Invalid input".into()));
        }
        if inner.contacts.len() >= self.max_contacts {
            return Err(GatewayError::CapacityExceeded(format!(
                "Maximum of {} contacts allowed",
                self.max_contacts
            )));
        }
        if inner.contacts.iter().any(|c| c.name == draft.name) {
            return Err(GatewayError::DuplicateName(format!(
                "Contact {:?} already exists",
                draft.name
            )));
        }
        inner.contacts.push(StoredContact {
            name: draft.name.clone(),
            date: draft.date,
            tag_id: draft.tag_id,
        });
        Ok(())
    }

    async fn edit_contact(&self, draft: &ContactDraft) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::EditContact(draft.name.clone()));
        inner.take_fault(StoreOperation::EditContact)?;
        let Some(stored) = inner.contacts.iter_mut().find(|c| c.name == draft.name) else {
            return Err(GatewayError::NotFound("Contact not found".into()));
        };
        stored.date = draft.date;
        stored.tag_id = draft.tag_id;
        Ok(())
    }

    async fn delete_contact(&self, name: &str) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::DeleteContact(name.to_owned()));
        inner.take_fault(StoreOperation::DeleteContact)?;
        let before = inner.contacts.len();
        inner.contacts.retain(|c| c.name != name);
        if inner.contacts.len() == before {
            return Err(GatewayError::NotFound("Contact not found".into()));
        }
        Ok(())
    }

    async fn list_tags(&self) -> GatewayResult<Vec<Tag>> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::ListTags);
        inner.take_fault(StoreOperation::ListTags)?;
        Ok(inner.tags.clone())
    }

    async fn create_tag(&self, draft: &TagDraft) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::CreateTag(draft.name.clone()));
        inner.take_fault(StoreOperation::CreateTag)?;
        if draft.name.trim().is_empty() {
            return Err(GatewayError::Validation("Invalid input".into()));
        }
        if inner.tags.len() >= self.max_tags {
            return Err(GatewayError::CapacityExceeded(format!(
                "Maximum of {} tags allowed",
                self.max_tags
            )));
        }
        if inner.tag_name_taken(&draft.name, None) {
            return Err(GatewayError::DuplicateName(format!(
                "Tag {:?} already exists",
                draft.name
            )));
        }
        let id = inner.next_tag_id;
        inner.next_tag_id += 1;
        inner.tags.push(Tag {
            id,
            name: draft.name.clone(),
            color: Some(draft.color.clone()),
        });
        Ok(())
    }

    async fn edit_tag(&self, id: TagId, draft: &TagDraft) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::EditTag(id));
        inner.take_fault(StoreOperation::EditTag)?;
        if inner.tag_name_taken(&draft.name, Some(id)) {
            return Err(GatewayError::DuplicateName(format!(
                "Tag {:?} already exists",
                draft.name
            )));
        }
        let Some(tag) = inner.tags.iter_mut().find(|tag| tag.id == id) else {
            return Err(GatewayError::NotFound("Tag not found".into()));
        };
        tag.name = draft.name.clone();
        tag.color = Some(draft.color.clone());
        Ok(())
    }

    async fn delete_tag(&self, id: TagId) -> GatewayResult<()> {
        let mut inner = self.inner.lock();
        inner.calls.push(StoreCall::DeleteTag(id));
        inner.take_fault(StoreOperation::DeleteTag)?;
        let before = inner.tags.len();
        inner.tags.retain(|tag| tag.id != id);
        if inner.tags.len() == before {
            return Err(GatewayError::NotFound("Tag not found".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn date(year: i32, month: u8, day: u8) -> ContactDate {
        ContactDate::from_calendar(year, month, day).expect("valid date")
    }

    fn draft(name: &str) -> ContactDraft {
        ContactDraft {
            name: name.into(),
            date: date(2001, 1, 1),
            tag_id: None,
        }
    }

    #[tokio::test]
    async fn contact_ceiling_rejects_the_extra_contact() {
        let store = InMemoryStore::with_limits(&Limits {
            max_contacts: 2,
            max_tags: 10,
        });
        store.create_contact(&draft("a")).await.expect("first");
        store.create_contact(&draft("b")).await.expect("second");
        let err = store.create_contact(&draft("c")).await.unwrap_err();
        assert_matches!(err, GatewayError::CapacityExceeded(ref msg) if msg == "Maximum of 2 contacts allowed");
        assert_eq!(store.contact_names(), vec!["a", "b"]);
    }

    #[tokio::test]
    async fn tag_names_collide_case_insensitively() {
        let store = InMemoryStore::default();
        let id = store.seed_tag("work", None);
        let err = store
            .create_tag(&TagDraft {
                name: "WORK".into(),
                color: "#fff".into(),
            })
            .await
            .unwrap_err();
        assert_matches!(err, GatewayError::DuplicateName(_));
        // Renaming a tag onto its own name in another case is allowed.
        store
            .edit_tag(
                id,
                &TagDraft {
                    name: "Work".into(),
                    color: "#fff".into(),
                },
            )
            .await
            .expect("self rename");
        assert_eq!(store.tag_names(), vec!["Work"]);
    }

    #[tokio::test]
    async fn deleting_a_tag_leaves_contacts_with_a_dangling_id() {
        let store = InMemoryStore::default();
        let id = store.seed_tag("Friends", Some("#4ade80"));
        store.seed_contact("Bob", date(1980, 2, 2), Some(id));
        store.delete_tag(id).await.expect("delete tag");
        let contacts = store.list_contacts().await.expect("list");
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].tag_id, Some(id));
        assert_eq!(contacts[0].tag, None);
    }

    #[tokio::test]
    async fn second_delete_of_same_contact_is_not_found() {
        let store = InMemoryStore::default();
        store.seed_contact("Ann", date(1990, 3, 3), None);
        store.delete_contact("Ann").await.expect("first delete");
        let err = store.delete_contact("Ann").await.unwrap_err();
        assert_matches!(err, GatewayError::NotFound(_));
        assert_eq!(
            store.calls(),
            vec![
                StoreCall::DeleteContact("Ann".into()),
                StoreCall::DeleteContact("Ann".into())
            ]
        );
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = InMemoryStore::default();
        store.fail_next(
            StoreOperation::CreateContact,
            GatewayError::Server("boom".into()),
        );
        assert!(store.create_contact(&draft("x")).await.is_err());
        assert!(store.create_contact(&draft("x")).await.is_ok());
        assert_eq!(store.contact_names(), vec!["x"]);
        let operations: Vec<StoreOperation> =
            store.calls().iter().map(StoreCall::operation).collect();
        assert_eq!(operations, vec![StoreOperation::CreateContact; 2]);
    }
}
