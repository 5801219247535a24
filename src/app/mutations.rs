//! Create, edit and delete against the remote store.
//!
//! Every mutation walks `Idle -> Pending -> (Applied | Failed) -> Idle` in a
//! [`MutationLedger`]. Renames are a two-step saga (delete the old name, then
//! create the new one) whose second-step failure is handled by the configured
//! [`RenameCompensation`].

use std::collections::HashMap;

use crate::app::state::ViewModel;
use crate::config::{AppConfig, RenameCompensation};
use crate::gateway::{ErrorKind, GatewayError, RemoteStore};
use crate::model::{Contact, ContactDate, ContactDraft, Tag, TagDraft, TagId};
use crate::present::tags::find_by_name;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    #[default]
    Idle,
    Pending,
    Applied,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum MutationKind {
    CreateContact,
    EditContact,
    RenameContact,
    DeleteContact,
    CreateTag,
    EditTag,
    DeleteTag,
}

impl MutationKind {
    pub fn touches_tags(self) -> bool {
        matches!(
            self,
            MutationKind::CreateTag | MutationKind::EditTag | MutationKind::DeleteTag
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub kind: MutationKind,
    pub from: Phase,
    pub to: Phase,
}

#[derive(Debug, Default)]
pub struct MutationLedger {
    phases: HashMap<MutationKind, Phase>,
    history: Vec<Transition>,
}

impl MutationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self, kind: MutationKind) -> Phase {
        self.phases.get(&kind).copied().unwrap_or_default()
    }

    pub fn history(&self) -> &[Transition] {
        &self.history
    }

    /// Transitions recorded for one kind, oldest first.
    pub fn history_of(&self, kind: MutationKind) -> Vec<Phase> {
        self.history
            .iter()
            .filter(|transition| transition.kind == kind)
            .map(|transition| transition.to)
            .collect()
    }

    fn move_to(&mut self, kind: MutationKind, to: Phase) {
        let from = self.phase(kind);
        tracing::debug!(%kind, %from, %to, "mutation phase");
        self.phases.insert(kind, to);
        self.history.push(Transition { kind, from, to });
    }

    fn begin(&mut self, kind: MutationKind) {
        self.move_to(kind, Phase::Pending);
    }

    fn settle(&mut self, kind: MutationKind, applied: bool) {
        self.move_to(
            kind,
            if applied {
                Phase::Applied
            } else {
                Phase::Failed
            },
        );
        self.move_to(kind, Phase::Idle);
    }
}

fn describe_rename(from: &str, to: &str, source: &GatewayError, restored: &bool) -> String {
    if *restored {
        format!("Could not rename {from} to {to}: {source}. {from} was restored.")
    } else {
        format!("Could not rename {from} to {to}: {source}. {from} was deleted and {to} was not created.")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    /// Refused before any network call.
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Rejected(#[from] GatewayError),
    /// The old name was deleted but the new one could not be created.
    #[error("{}", describe_rename(.from, .to, .source, .restored))]
    RenameIncomplete {
        from: String,
        to: String,
        source: GatewayError,
        restored: bool,
    },
}

impl MutationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MutationError::Invalid(_) => ErrorKind::Validation,
            MutationError::Rejected(err) => err.kind(),
            MutationError::RenameIncomplete { source, .. } => source.kind(),
        }
    }
}

pub type MutationResult = Result<MutationOutcome, MutationError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MutationOutcome {
    pub kind: MutationKind,
    /// The tag cache is stale. The contact view is always stale after a
    /// mutation.
    pub refresh_tags: bool,
}

impl MutationOutcome {
    fn applied(kind: MutationKind) -> Self {
        Self {
            kind,
            refresh_tags: kind.touches_tags(),
        }
    }
}

/// Contents of the add/edit contact dialog. `date` is free text in either
/// `YYYY-MM-DD` or `MM/DD/YYYY`; blank means the configured default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub date: String,
    pub tag_id: Option<TagId>,
}

impl ContactForm {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            date: contact.date.to_wire(),
            tag_id: contact.tag_id,
        }
    }

    fn to_draft(&self, fallback: ContactDate) -> Result<ContactDraft, MutationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MutationError::Invalid("Name is required.".into()));
        }
        let date = ContactDate::parse_or(&self.date, fallback)
            .map_err(|err| MutationError::Invalid(err.to_string()))?;
        Ok(ContactDraft {
            name: name.to_owned(),
            date,
            tag_id: self.tag_id,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagForm {
    pub name: String,
    pub color: String,
}

impl TagForm {
    pub fn from_tag(tag: &Tag) -> Self {
        Self {
            name: tag.name.clone(),
            color: tag.display_color().to_owned(),
        }
    }

    fn to_draft(&self, default_color: &str) -> Result<TagDraft, MutationError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(MutationError::Invalid("Tag name is required.".into()));
        }
        let color = match self.color.trim() {
            "" => default_color.to_owned(),
            color => color.to_owned(),
        };
        Ok(TagDraft {
            name: name.to_owned(),
            color,
        })
    }
}

/// The only caller of the store's mutating operations.
pub struct MutationOrchestrator<'a> {
    store: &'a dyn RemoteStore,
    config: &'a AppConfig,
    ledger: &'a mut MutationLedger,
}

impl<'a> MutationOrchestrator<'a> {
    pub fn new(
        store: &'a dyn RemoteStore,
        config: &'a AppConfig,
        ledger: &'a mut MutationLedger,
    ) -> Self {
        Self {
            store,
            config,
            ledger,
        }
    }

    fn finish(&mut self, kind: MutationKind, result: Result<(), MutationError>) -> MutationResult {
        self.ledger.settle(kind, result.is_ok());
        match result {
            Ok(()) => {
                tracing::info!(%kind, "mutation applied");
                Ok(MutationOutcome::applied(kind))
            }
            Err(err) => {
                tracing::warn!(%kind, error = %err, "mutation failed");
                Err(err)
            }
        }
    }

    pub async fn create_contact(&mut self, form: &ContactForm) -> MutationResult {
        let kind = MutationKind::CreateContact;
        self.ledger.begin(kind);
        let result = match form.to_draft(self.config.defaults.contact_date) {
            Ok(draft) => self
                .store
                .create_contact(&draft)
                .await
                .map_err(MutationError::from),
            Err(err) => Err(err),
        };
        self.finish(kind, result)
    }

    /// Saves the edit dialog over `original`. A changed name runs the rename
    /// saga; the create is only attempted once the delete has succeeded.
    pub async fn edit_contact(&mut self, original: &Contact, form: &ContactForm) -> MutationResult {
        let mut draft = match form.to_draft(self.config.defaults.contact_date) {
            Ok(draft) => draft,
            Err(err) => {
                self.ledger.begin(MutationKind::EditContact);
                return self.finish(MutationKind::EditContact, Err(err));
            }
        };
        // Stored names may carry whitespace the form would trim away.
        if draft.name == original.name.trim() {
            draft.name = original.name.clone();
            let kind = MutationKind::EditContact;
            self.ledger.begin(kind);
            let result = self
                .store
                .edit_contact(&draft)
                .await
                .map_err(MutationError::from);
            return self.finish(kind, result);
        }

        let kind = MutationKind::RenameContact;
        self.ledger.begin(kind);
        let result = self.rename(original, &draft).await;
        self.finish(kind, result)
    }

    async fn rename(&self, original: &Contact, draft: &ContactDraft) -> Result<(), MutationError> {
        tracing::debug!(from = %original.name, to = %draft.name, "renaming contact");
        self.store.delete_contact(&original.name).await?;
        let Err(source) = self.store.create_contact(draft).await else {
            return Ok(());
        };
        let restored = match self.config.rename.compensation {
            RenameCompensation::NoRollback => false,
            RenameCompensation::RestoreOriginal => {
                match self.store.create_contact(&original.to_draft()).await {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::error!(
                            name = %original.name,
                            error = %err,
                            "could not restore contact after failed rename"
                        );
                        false
                    }
                }
            }
        };
        Err(MutationError::RenameIncomplete {
            from: original.name.clone(),
            to: draft.name.clone(),
            source,
            restored,
        })
    }

    pub async fn delete_contact(&mut self, name: &str) -> MutationResult {
        let kind = MutationKind::DeleteContact;
        self.ledger.begin(kind);
        let result = self
            .store
            .delete_contact(name)
            .await
            .map_err(MutationError::from);
        self.finish(kind, result)
    }

    pub async fn create_tag(&mut self, state: &ViewModel, form: &TagForm) -> MutationResult {
        let kind = MutationKind::CreateTag;
        self.ledger.begin(kind);
        let result = match self.checked_tag_draft(state, form, None) {
            Ok(draft) => self
                .store
                .create_tag(&draft)
                .await
                .map_err(MutationError::from),
            Err(err) => Err(err),
        };
        self.finish(kind, result)
    }

    pub async fn edit_tag(&mut self, state: &ViewModel, id: TagId, form: &TagForm) -> MutationResult {
        let kind = MutationKind::EditTag;
        self.ledger.begin(kind);
        let result = match self.checked_tag_draft(state, form, Some(id)) {
            Ok(draft) => self
                .store
                .edit_tag(id, &draft)
                .await
                .map_err(MutationError::from),
            Err(err) => Err(err),
        };
        self.finish(kind, result)
    }

    pub async fn delete_tag(&mut self, id: TagId) -> MutationResult {
        let kind = MutationKind::DeleteTag;
        self.ledger.begin(kind);
        let result = self
            .store
            .delete_tag(id)
            .await
            .map_err(MutationError::from);
        self.finish(kind, result)
    }

    /// Checks the name against the cached tags. The server re-checks.
    fn checked_tag_draft(
        &self,
        state: &ViewModel,
        form: &TagForm,
        editing: Option<TagId>,
    ) -> Result<TagDraft, MutationError> {
        let draft = form.to_draft(&self.config.defaults.tag_color)?;
        if let Some(existing) = find_by_name(state.tags(), &draft.name, editing) {
            return Err(GatewayError::DuplicateName(format!(
                "Tag \"{}\" already exists.",
                existing.name
            ))
            .into());
        }
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::gateway::{InMemoryStore, StoreCall, StoreOperation};
    use crate::model::DEFAULT_TAG_COLOR;
    use assert_matches::assert_matches;

    fn date(year: i32, month: u8, day: u8) -> ContactDate {
        ContactDate::from_calendar(year, month, day).expect("valid date")
    }

    fn form(name: &str, date: &str) -> ContactForm {
        ContactForm {
            name: name.into(),
            date: date.into(),
            tag_id: None,
        }
    }

    fn tag_form(name: &str) -> TagForm {
        TagForm {
            name: name.into(),
            color: String::new(),
        }
    }

    async fn cached_tags(store: &InMemoryStore) -> anyhow::Result<ViewModel> {
        let mut state = ViewModel::new();
        state.set_tags(store.list_tags().await?);
        store.clear_calls();
        Ok(state)
    }

    #[tokio::test]
    async fn unchanged_padded_name_edits_in_place() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Ada ", date(1990, 5, 1), None);
        let original = store.list_contacts().await?.remove(0);
        store.clear_calls();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let mut orchestrator = MutationOrchestrator::new(&store, &config, &mut ledger);

        let mut edited = ContactForm::from_contact(&original);
        edited.date = "1991-06-02".into();
        let outcome = orchestrator.edit_contact(&original, &edited).await?;

        assert_eq!(outcome.kind, MutationKind::EditContact);
        assert_eq!(store.calls(), vec![StoreCall::EditContact("Ada ".into())]);
        let listed = store.list_contacts().await?;
        assert_eq!(listed[0].name, "Ada ");
        assert_eq!(listed[0].date, date(1991, 6, 2));
        Ok(())
    }

    #[tokio::test]
    async fn create_contact_defaults_a_blank_date() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let mut orchestrator = MutationOrchestrator::new(&store, &config, &mut ledger);

        let outcome = orchestrator.create_contact(&form("  Ada ", "")).await?;
        assert_eq!(outcome.kind, MutationKind::CreateContact);
        assert!(!outcome.refresh_tags);

        let listed = store.list_contacts().await?;
        assert_eq!(listed[0].name, "Ada");
        assert_eq!(listed[0].date.to_wire(), "1947-06-28");
        assert_eq!(
            ledger.history_of(MutationKind::CreateContact),
            vec![Phase::Pending, Phase::Applied, Phase::Idle]
        );
        assert_eq!(ledger.phase(MutationKind::CreateContact), Phase::Idle);
        Ok(())
    }

    #[tokio::test]
    async fn create_contact_requires_a_name() {
        let store = InMemoryStore::default();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let mut orchestrator = MutationOrchestrator::new(&store, &config, &mut ledger);

        let err = orchestrator
            .create_contact(&form("   ", "1990-05-01"))
            .await
            .unwrap_err();
        assert_matches!(err, MutationError::Invalid(_));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.calls().is_empty());
        assert_eq!(
            ledger.history_of(MutationKind::CreateContact),
            vec![Phase::Pending, Phase::Failed, Phase::Idle]
        );
    }

    #[tokio::test]
    async fn display_dates_are_accepted() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        MutationOrchestrator::new(&store, &config, &mut ledger)
            .create_contact(&form("Ada", "5/1/1990"))
            .await?;
        assert_eq!(store.list_contacts().await?[0].date, date(1990, 5, 1));
        Ok(())
    }

    #[tokio::test]
    async fn the_151st_contact_is_rejected() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        for i in 0..150 {
            store.seed_contact(&format!("c{i}"), date(2000, 1, 1), None);
        }
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .create_contact(&form("one too many", ""))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(err.to_string(), "Maximum of 150 contacts allowed");
        assert_eq!(store.contact_names().len(), 150);
        Ok(())
    }

    #[tokio::test]
    async fn unchanged_name_edits_in_place() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Ada", date(1990, 5, 1), None);
        let original = store.list_contacts().await?.remove(0);
        store.clear_calls();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let mut edited = ContactForm::from_contact(&original);
        edited.date = "2001-02-03".into();
        let outcome = MutationOrchestrator::new(&store, &config, &mut ledger)
            .edit_contact(&original, &edited)
            .await?;
        assert_eq!(outcome.kind, MutationKind::EditContact);
        assert_eq!(store.mutations(), vec![StoreCall::EditContact("Ada".into())]);
        assert_eq!(store.list_contacts().await?[0].date, date(2001, 2, 3));
        Ok(())
    }

    #[tokio::test]
    async fn rename_deletes_before_creating() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Alice", date(1990, 5, 1), None);
        let original = store.list_contacts().await?.remove(0);
        store.clear_calls();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let outcome = MutationOrchestrator::new(&store, &config, &mut ledger)
            .edit_contact(&original, &form("Alicia", "1990-05-01"))
            .await?;
        assert_eq!(outcome.kind, MutationKind::RenameContact);
        assert_eq!(
            store.mutations(),
            vec![
                StoreCall::DeleteContact("Alice".into()),
                StoreCall::CreateContact("Alicia".into()),
            ]
        );
        assert_eq!(store.contact_names(), vec!["Alicia".to_owned()]);
        Ok(())
    }

    #[tokio::test]
    async fn failed_rename_leaves_neither_name() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Alice", date(1990, 5, 1), None);
        let original = store.list_contacts().await?.remove(0);
        store.clear_calls();
        store.fail_next(
            StoreOperation::CreateContact,
            GatewayError::Server("Failed to create contact".into()),
        );
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .edit_contact(&original, &form("Alicia", ""))
            .await
            .unwrap_err();
        assert_matches!(
            err,
            MutationError::RenameIncomplete { ref from, ref to, restored: false, .. }
                if from == "Alice" && to == "Alicia"
        );
        assert_eq!(err.kind(), ErrorKind::Server);
        assert_eq!(
            store.mutations(),
            vec![
                StoreCall::DeleteContact("Alice".into()),
                StoreCall::CreateContact("Alicia".into()),
            ]
        );
        assert!(store.contact_names().is_empty());
        assert_eq!(ledger.phase(MutationKind::RenameContact), Phase::Idle);
        assert_eq!(
            ledger.history_of(MutationKind::RenameContact),
            vec![Phase::Pending, Phase::Failed, Phase::Idle]
        );
        Ok(())
    }

    #[tokio::test]
    async fn failed_rename_can_restore_the_original() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Alice", date(1990, 5, 1), Some(4));
        let original = store.list_contacts().await?.remove(0);
        store.fail_next(
            StoreOperation::CreateContact,
            GatewayError::Server("Failed to create contact".into()),
        );
        let mut config = AppConfig::default();
        config.rename.compensation = RenameCompensation::RestoreOriginal;
        let mut ledger = MutationLedger::new();

        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .edit_contact(&original, &form("Alicia", ""))
            .await
            .unwrap_err();
        assert_matches!(err, MutationError::RenameIncomplete { restored: true, .. });
        assert!(err.to_string().ends_with("Alice was restored."));
        let listed = store.list_contacts().await?;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "Alice");
        assert_eq!(listed[0].tag_id, Some(4));
        assert_eq!(listed[0].date, date(1990, 5, 1));
        Ok(())
    }

    #[tokio::test]
    async fn failed_delete_aborts_the_rename() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let original = Contact::new("Ghost", date(1990, 5, 1));
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .edit_contact(&original, &form("Spirit", ""))
            .await
            .unwrap_err();
        assert_matches!(err, MutationError::Rejected(GatewayError::NotFound(_)));
        assert_eq!(store.mutations(), vec![StoreCall::DeleteContact("Ghost".into())]);
        Ok(())
    }

    #[tokio::test]
    async fn second_delete_reports_not_found() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_contact("Ada", date(1990, 5, 1), None);
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let mut orchestrator = MutationOrchestrator::new(&store, &config, &mut ledger);

        orchestrator.delete_contact("Ada").await?;
        let err = orchestrator.delete_contact("Ada").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.mutations().len(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_tag_is_refused_without_a_call() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        store.seed_tag("work", None);
        let state = cached_tags(&store).await?;
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .create_tag(&state, &tag_form("Work"))
            .await
            .unwrap_err();
        assert_matches!(err, MutationError::Rejected(GatewayError::DuplicateName(_)));
        assert!(store.calls().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn editing_a_tag_may_keep_its_own_name() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let id = store.seed_tag("Work", Some("#6366f1"));
        store.seed_tag("Gym", None);
        let state = cached_tags(&store).await?;
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let mut orchestrator = MutationOrchestrator::new(&store, &config, &mut ledger);

        let recolor = TagForm {
            name: "work".into(),
            color: "#10b981".into(),
        };
        let outcome = orchestrator.edit_tag(&state, id, &recolor).await?;
        assert!(outcome.refresh_tags);

        let clash = orchestrator.edit_tag(&state, id, &tag_form("GYM")).await;
        assert_matches!(
            clash,
            Err(MutationError::Rejected(GatewayError::DuplicateName(_)))
        );
        assert_eq!(store.mutations(), vec![StoreCall::EditTag(id)]);
        Ok(())
    }

    #[tokio::test]
    async fn blank_tag_color_becomes_gray() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let state = ViewModel::new();
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        MutationOrchestrator::new(&store, &config, &mut ledger)
            .create_tag(&state, &tag_form(" Family "))
            .await?;
        let tags = store.list_tags().await?;
        assert_eq!(tags[0].name, "Family");
        assert_eq!(tags[0].color.as_deref(), Some(DEFAULT_TAG_COLOR));
        Ok(())
    }

    #[tokio::test]
    async fn the_11th_tag_is_rejected() -> anyhow::Result<()> {
        let store = InMemoryStore::with_limits(&Limits::default());
        for i in 0..10 {
            store.seed_tag(&format!("t{i}"), None);
        }
        let state = cached_tags(&store).await?;
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();

        let err = MutationOrchestrator::new(&store, &config, &mut ledger)
            .create_tag(&state, &tag_form("eleven"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(store.tag_names().len(), 10);
        Ok(())
    }

    #[tokio::test]
    async fn deleting_a_tag_refreshes_tags() -> anyhow::Result<()> {
        let store = InMemoryStore::default();
        let id = store.seed_tag("Work", None);
        let config = AppConfig::default();
        let mut ledger = MutationLedger::new();
        let outcome = MutationOrchestrator::new(&store, &config, &mut ledger)
            .delete_tag(id)
            .await?;
        assert_eq!(outcome.kind, MutationKind::DeleteTag);
        assert!(outcome.refresh_tags);
        assert!(store.tag_names().is_empty());
        Ok(())
    }
}
