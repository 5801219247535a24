use crate::gateway::{ErrorKind, GatewayError};
use crate::model::{Contact, Tag, TagId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum ViewMode {
    #[default]
    List,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Modal {
    AddContact,
    EditContact,
    Tags,
    AddTag,
    EditTag,
    ConfirmDeleteContact,
    ConfirmDeleteTag,
}

/// The contact whose edit dialog is open, as it was when the dialog opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEdit {
    pub original: Contact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDelete {
    Contact { name: String },
    Tag { id: TagId, name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A blocking notification for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub kind: Option<ErrorKind>,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            kind: None,
            message: message.into(),
        }
    }

    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            kind: Some(kind),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&GatewayError> for Notice {
    fn from(err: &GatewayError) -> Self {
        Notice::error(err.kind(), err.message())
    }
}

/// Session state shared by the controller and the presenters. Setters replace
/// one field; nothing here validates.
#[derive(Debug, Clone, Default)]
pub struct ViewModel {
    sort_ascending: bool,
    contacts: Vec<Contact>,
    tags: Vec<Tag>,
    active_filter: Option<TagId>,
    view_mode: ViewMode,
    pending_edit: Option<PendingEdit>,
    pending_tag_edit: Option<Tag>,
    pending_delete: Option<PendingDelete>,
    modals: Vec<Modal>,
    notice: Option<Notice>,
}

impl ViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sort_ascending(&self) -> bool {
        self.sort_ascending
    }

    pub fn set_sort_ascending(&mut self, ascending: bool) {
        self.sort_ascending = ascending;
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn set_contacts(&mut self, contacts: Vec<Contact>) {
        self.contacts = contacts;
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn set_tags(&mut self, tags: Vec<Tag>) {
        self.tags = tags;
    }

    pub fn active_filter(&self) -> Option<TagId> {
        self.active_filter
    }

    pub fn set_active_filter(&mut self, filter: Option<TagId>) {
        self.active_filter = filter;
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    pub fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub fn pending_edit(&self) -> Option<&PendingEdit> {
        self.pending_edit.as_ref()
    }

    pub fn set_pending_edit(&mut self, pending: Option<PendingEdit>) {
        self.pending_edit = pending;
    }

    pub fn pending_tag_edit(&self) -> Option<&Tag> {
        self.pending_tag_edit.as_ref()
    }

    pub fn set_pending_tag_edit(&mut self, tag: Option<Tag>) {
        self.pending_tag_edit = tag;
    }

    pub fn pending_delete(&self) -> Option<&PendingDelete> {
        self.pending_delete.as_ref()
    }

    pub fn set_pending_delete(&mut self, pending: Option<PendingDelete>) {
        self.pending_delete = pending;
    }

    pub fn modals(&self) -> &[Modal] {
        &self.modals
    }

    pub fn top_modal(&self) -> Option<Modal> {
        self.modals.last().copied()
    }

    pub fn is_open(&self, modal: Modal) -> bool {
        self.modals.contains(&modal)
    }

    /// Opening an already open dialog brings it to the top.
    pub fn open_modal(&mut self, modal: Modal) {
        self.modals.retain(|open| *open != modal);
        self.modals.push(modal);
    }

    pub fn close_modal(&mut self, modal: Modal) {
        self.modals.retain(|open| *open != modal);
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn set_notice(&mut self, notice: Option<Notice>) {
        self.notice = notice;
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_descending_unfiltered_in_list_mode() {
        let state = ViewModel::new();
        assert!(!state.sort_ascending());
        assert_eq!(state.active_filter(), None);
        assert_eq!(state.view_mode(), ViewMode::List);
        assert!(state.modals().is_empty());
        assert!(state.pending_delete().is_none());
    }

    #[test]
    fn confirmation_stacks_over_edit_dialog() {
        let mut state = ViewModel::new();
        state.open_modal(Modal::EditContact);
        state.open_modal(Modal::ConfirmDeleteContact);
        assert_eq!(state.top_modal(), Some(Modal::ConfirmDeleteContact));
        state.close_modal(Modal::ConfirmDeleteContact);
        assert_eq!(state.top_modal(), Some(Modal::EditContact));
        state.open_modal(Modal::Tags);
        state.open_modal(Modal::EditContact);
        assert_eq!(state.modals(), &[Modal::Tags, Modal::EditContact]);
    }

    #[test]
    fn view_mode_parses_from_lowercase() {
        assert_eq!("grid".parse::<ViewMode>().ok(), Some(ViewMode::Grid));
        assert_eq!(ViewMode::List.to_string(), "list");
    }

    #[test]
    fn take_notice_clears_it() {
        let mut state = ViewModel::new();
        state.set_notice(Some(Notice::error(ErrorKind::NotFound, "Contact not found")));
        let notice = state.take_notice().expect("notice");
        assert!(notice.is_error());
        assert!(state.notice().is_none());
    }
}
