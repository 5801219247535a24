use std::sync::Arc;

use crate::config::AppConfig;
use crate::gateway::{ErrorKind, GatewayError, RemoteStore};
use crate::model::TagId;
use crate::present::{ContactPresenter, ContactView, TagLegend, TagOption, TagPresenter};

pub mod mutations;
pub mod state;

pub use mutations::{
    ContactForm, MutationError, MutationKind, MutationLedger, MutationOutcome, Phase, TagForm,
};
pub use state::{Modal, Notice, NoticeLevel, PendingDelete, PendingEdit, ViewMode, ViewModel};

use self::mutations::{MutationOrchestrator, MutationResult};

/// Session controller. Owns the view-model, turns user intents into store
/// calls and presenter renders, and reports every failure as a [`Notice`].
pub struct App {
    pub config: Arc<AppConfig>,
    store: Arc<dyn RemoteStore>,
    state: ViewModel,
    ledger: MutationLedger,
    view: Option<ContactView>,
}

impl App {
    pub fn new(config: Arc<AppConfig>, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            config,
            store,
            state: ViewModel::new(),
            ledger: MutationLedger::new(),
            view: None,
        }
    }

    pub fn state(&self) -> &ViewModel {
        &self.state
    }

    pub fn ledger(&self) -> &MutationLedger {
        &self.ledger
    }

    /// The last successful render.
    pub fn view(&self) -> Option<&ContactView> {
        self.view.as_ref()
    }

    pub fn legend(&self) -> TagLegend {
        TagPresenter::new(&self.config.limits).render(&self.state)
    }

    pub fn tag_options(&self) -> Vec<TagOption> {
        TagPresenter::new(&self.config.limits).options(&self.state)
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.state.take_notice()
    }

    /// Loads tags, then contacts, so the first render can color its badges.
    pub async fn start(&mut self) -> bool {
        self.refresh_tags().await && self.refresh_view().await
    }

    pub async fn refresh_tags(&mut self) -> bool {
        let result = self.store.list_tags().await;
        match result {
            Ok(tags) => {
                tracing::debug!(count = tags.len(), "tags loaded");
                self.state.set_tags(tags);
                true
            }
            Err(err) => {
                self.report_gateway("loading tags", &err);
                false
            }
        }
    }

    /// Re-renders the active view from a fresh fetch.
    pub async fn refresh_view(&mut self) -> bool {
        let presenter = ContactPresenter::new(self.store.as_ref(), &self.config.limits);
        let result = presenter.render(&self.state, self.state.view_mode()).await;
        match result {
            Ok(rendered) => {
                self.state.set_contacts(rendered.contacts);
                self.view = Some(rendered.view);
                true
            }
            Err(err) => {
                self.report_gateway("loading contacts", &err);
                false
            }
        }
    }

    pub async fn toggle_sort(&mut self) -> bool {
        let ascending = !self.state.sort_ascending();
        self.state.set_sort_ascending(ascending);
        self.refresh_view().await
    }

    pub async fn show_grid(&mut self) -> bool {
        if self.state.active_filter().is_some() {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::Validation,
                "Clear the tag filter to use the grid view.",
            )));
            return false;
        }
        self.state.set_view_mode(ViewMode::Grid);
        self.refresh_view().await
    }

    pub async fn show_list(&mut self) -> bool {
        self.state.set_active_filter(None);
        self.state.set_view_mode(ViewMode::List);
        self.refresh_view().await
    }

    pub async fn open_tags(&mut self) -> TagLegend {
        self.refresh_tags().await;
        self.state.open_modal(Modal::Tags);
        self.legend()
    }

    /// `None` is the "All" entry.
    pub async fn select_tag(&mut self, filter: Option<TagId>) -> bool {
        self.state.set_active_filter(filter);
        self.state.set_view_mode(ViewMode::List);
        self.state.close_modal(Modal::Tags);
        self.refresh_view().await
    }

    pub async fn open_add_contact(&mut self) -> Option<ContactForm> {
        let max = self.config.limits.max_contacts;
        if self.state.contacts().len() >= max {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::CapacityExceeded,
                format!("Maximum of {max} contacts allowed."),
            )));
            return None;
        }
        self.refresh_tags().await;
        self.state.open_modal(Modal::AddContact);
        Some(ContactForm {
            date: self.config.defaults.contact_date.to_wire(),
            ..ContactForm::default()
        })
    }

    pub async fn submit_add_contact(&mut self, form: &ContactForm) -> bool {
        let result =
            MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                .create_contact(form)
                .await;
        let Some(outcome) = self.applied(result) else {
            return false;
        };
        self.state.close_modal(Modal::AddContact);
        self.state
            .set_notice(Some(Notice::info(format!("Added {}", form.name.trim()))));
        self.after_mutation(outcome).await
    }

    /// Refreshes tags for the dropdown, then returns the contact prefilled with
    /// its date in `YYYY-MM-DD`.
    pub async fn open_edit_contact(&mut self, name: &str) -> Option<ContactForm> {
        self.refresh_tags().await;
        let Some(contact) = self
            .state
            .contacts()
            .iter()
            .find(|contact| contact.name == name)
            .cloned()
        else {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::NotFound,
                format!("Contact \"{name}\" not found."),
            )));
            return None;
        };
        let form = ContactForm::from_contact(&contact);
        self.state
            .set_pending_edit(Some(PendingEdit { original: contact }));
        self.state.open_modal(Modal::EditContact);
        Some(form)
    }

    pub async fn submit_edit_contact(&mut self, form: &ContactForm) -> bool {
        let Some(pending) = self.state.pending_edit().cloned() else {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::Validation,
                "No contact is being edited.",
            )));
            return false;
        };
        let result =
            MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                .edit_contact(&pending.original, form)
                .await;
        match result {
            Ok(outcome) => {
                self.close_edit_contact();
                self.state
                    .set_notice(Some(Notice::info(format!("Saved {}", form.name.trim()))));
                self.after_mutation(outcome).await
            }
            Err(err @ MutationError::RenameIncomplete { .. }) => {
                // The original is gone, so there is nothing left to edit.
                self.close_edit_contact();
                self.refresh_view().await;
                self.report(&err);
                false
            }
            Err(err) => {
                self.report(&err);
                false
            }
        }
    }

    pub fn request_delete_contact(&mut self, name: &str) {
        self.state.set_pending_delete(Some(PendingDelete::Contact {
            name: name.to_owned(),
        }));
        self.state.open_modal(Modal::ConfirmDeleteContact);
    }

    pub fn request_delete_tag(&mut self, id: TagId) -> bool {
        let Some(tag) = self.state.tags().iter().find(|tag| tag.id == id) else {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::NotFound,
                format!("Tag {id} not found."),
            )));
            return false;
        };
        let pending = PendingDelete::Tag {
            id,
            name: tag.name.clone(),
        };
        self.state.set_pending_delete(Some(pending));
        self.state.open_modal(Modal::ConfirmDeleteTag);
        true
    }

    /// Runs the delete captured by the last request. The confirmation closes
    /// whether or not the call succeeds.
    pub async fn confirm_delete(&mut self) -> bool {
        let Some(pending) = self.state.pending_delete().cloned() else {
            return false;
        };
        self.state.set_pending_delete(None);
        let (result, label) = match &pending {
            PendingDelete::Contact { name } => {
                self.state.close_modal(Modal::ConfirmDeleteContact);
                let result =
                    MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                        .delete_contact(name)
                        .await;
                (result, name.clone())
            }
            PendingDelete::Tag { id, name } => {
                self.state.close_modal(Modal::ConfirmDeleteTag);
                let result =
                    MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                        .delete_tag(*id)
                        .await;
                (result, name.clone())
            }
        };
        let Some(outcome) = self.applied(result) else {
            return false;
        };
        if let PendingDelete::Contact { name } = &pending {
            let editing = self
                .state
                .pending_edit()
                .is_some_and(|edit| &edit.original.name == name);
            if editing {
                self.close_edit_contact();
            }
        }
        self.state
            .set_notice(Some(Notice::info(format!("Deleted {label}"))));
        self.after_mutation(outcome).await
    }

    pub fn cancel_delete(&mut self) {
        self.state.set_pending_delete(None);
        self.state.close_modal(Modal::ConfirmDeleteContact);
        self.state.close_modal(Modal::ConfirmDeleteTag);
    }

    pub async fn open_add_tag(&mut self) -> Option<TagForm> {
        self.refresh_tags().await;
        let max = self.config.limits.max_tags;
        if self.state.tags().len() >= max {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::CapacityExceeded,
                format!("Maximum of {max} tags allowed."),
            )));
            return None;
        }
        self.state.open_modal(Modal::AddTag);
        Some(TagForm {
            name: String::new(),
            color: self.config.defaults.tag_color.clone(),
        })
    }

    pub async fn submit_add_tag(&mut self, form: &TagForm) -> bool {
        let result =
            MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                .create_tag(&self.state, form)
                .await;
        let Some(outcome) = self.applied(result) else {
            return false;
        };
        self.state.close_modal(Modal::AddTag);
        self.state
            .set_notice(Some(Notice::info(format!("Added tag {}", form.name.trim()))));
        self.after_mutation(outcome).await
    }

    pub fn open_edit_tag(&mut self, id: TagId) -> Option<TagForm> {
        let Some(tag) = self.state.tags().iter().find(|tag| tag.id == id).cloned() else {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::NotFound,
                format!("Tag {id} not found."),
            )));
            return None;
        };
        let form = TagForm::from_tag(&tag);
        self.state.set_pending_tag_edit(Some(tag));
        self.state.open_modal(Modal::EditTag);
        Some(form)
    }

    pub async fn submit_edit_tag(&mut self, form: &TagForm) -> bool {
        let Some(id) = self.state.pending_tag_edit().map(|tag| tag.id) else {
            self.state.set_notice(Some(Notice::error(
                ErrorKind::Validation,
                "No tag is being edited.",
            )));
            return false;
        };
        let result =
            MutationOrchestrator::new(self.store.as_ref(), &self.config, &mut self.ledger)
                .edit_tag(&self.state, id, form)
                .await;
        let Some(outcome) = self.applied(result) else {
            return false;
        };
        self.state.close_modal(Modal::EditTag);
        self.state.set_pending_tag_edit(None);
        self.state
            .set_notice(Some(Notice::info(format!("Saved tag {}", form.name.trim()))));
        self.after_mutation(outcome).await
    }

    /// Closes the top dialog and drops whatever it had captured.
    pub fn close_modal(&mut self) -> Option<Modal> {
        let modal = self.state.top_modal()?;
        self.state.close_modal(modal);
        match modal {
            Modal::EditContact => self.state.set_pending_edit(None),
            Modal::EditTag => self.state.set_pending_tag_edit(None),
            Modal::ConfirmDeleteContact | Modal::ConfirmDeleteTag => {
                self.state.set_pending_delete(None)
            }
            Modal::AddContact | Modal::AddTag | Modal::Tags => {}
        }
        Some(modal)
    }

    fn close_edit_contact(&mut self) {
        self.state.close_modal(Modal::EditContact);
        self.state.set_pending_edit(None);
    }

    /// Reports a failed mutation.
    fn applied(&mut self, result: MutationResult) -> Option<MutationOutcome> {
        result.map_err(|err| self.report(&err)).ok()
    }

    /// Refetches what the mutation made stale. A failed refetch replaces the
    /// success notice.
    async fn after_mutation(&mut self, outcome: MutationOutcome) -> bool {
        let tags_loaded = !outcome.refresh_tags || self.refresh_tags().await;
        self.refresh_view().await && tags_loaded
    }

    fn report(&mut self, err: &MutationError) {
        self.state
            .set_notice(Some(Notice::error(err.kind(), err.to_string())));
    }

    fn report_gateway(&mut self, context: &str, err: &GatewayError) {
        tracing::warn!(kind = %err.kind(), error = %err, "{context} failed");
        self.state.set_notice(Some(Notice::from(err)));
    }
}
