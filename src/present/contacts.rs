//! Contact rows for the table and the grouped grid.
//!
//! The transforms here (`filter_by_tag`, `sort_by_date`, `group_by_tag`,
//! `tag_color`) are pure; [`ContactPresenter::render`] is the only function
//! that touches the store.

use indexmap::IndexMap;

use crate::app::state::{ViewMode, ViewModel};
use crate::config::Limits;
use crate::gateway::{GatewayResult, RemoteStore};
use crate::model::{Contact, Tag, TagId, DEFAULT_TAG_COLOR, NO_TAG_LABEL};

pub const SORT_ASCENDING_INDICATOR: char = '↑';
pub const SORT_DESCENDING_INDICATOR: char = '↓';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactRow {
    pub name: String,
    /// `MM/DD/YYYY`
    pub date: String,
    /// `YYYY-MM-DD`, what an edit form starts from.
    pub wire_date: String,
    pub tag_id: Option<TagId>,
    pub tag_label: Option<String>,
    pub tag_color: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Affordances {
    pub add_enabled: bool,
    pub add_label: String,
    /// The grid only covers the whole set, so it is off while filtering.
    pub grid_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListView {
    pub rows: Vec<ContactRow>,
    /// Contacts on the server, filtered or not.
    pub total: usize,
    pub active_filter: Option<TagId>,
    pub affordances: Affordances,
    pub sort_indicator: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridGroup {
    pub label: String,
    pub tag_id: Option<TagId>,
    pub color: String,
    pub rows: Vec<ContactRow>,
}

impl GridGroup {
    pub fn count(&self) -> usize {
        self.rows.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridView {
    pub groups: Vec<GridGroup>,
    pub total: usize,
    pub affordances: Affordances,
    pub sort_indicator: char,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactView {
    List(ListView),
    Grid(GridView),
}

impl ContactView {
    pub fn mode(&self) -> ViewMode {
        match self {
            ContactView::List(_) => ViewMode::List,
            ContactView::Grid(_) => ViewMode::Grid,
        }
    }

    pub fn total(&self) -> usize {
        match self {
            ContactView::List(view) => view.total,
            ContactView::Grid(view) => view.total,
        }
    }

    pub fn affordances(&self) -> &Affordances {
        match self {
            ContactView::List(view) => &view.affordances,
            ContactView::Grid(view) => &view.affordances,
        }
    }
}

/// Grouping key for the grid. Kept apart from the label so a tag literally
/// named "No Tag" does not merge with the untagged group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum GroupKey {
    Tagged(String),
    Untagged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactGroup {
    pub key: GroupKey,
    pub tag_id: Option<TagId>,
    pub contacts: Vec<Contact>,
}

impl ContactGroup {
    pub fn label(&self) -> &str {
        match &self.key {
            GroupKey::Tagged(name) => name,
            GroupKey::Untagged => NO_TAG_LABEL,
        }
    }
}

pub fn filter_by_tag(contacts: Vec<Contact>, filter: Option<TagId>) -> Vec<Contact> {
    match filter {
        None => contacts,
        Some(tag_id) => contacts
            .into_iter()
            .filter(|contact| contact.tag_id == Some(tag_id))
            .collect(),
    }
}

/// Stable in both directions: equal dates keep their input order.
pub fn sort_by_date(contacts: &mut [Contact], ascending: bool) {
    if ascending {
        contacts.sort_by(|a, b| a.date.cmp(&b.date));
    } else {
        contacts.sort_by(|a, b| b.date.cmp(&a.date));
    }
}

/// Partitions contacts by their own tag label in first-seen order. A contact
/// counts as tagged only when it carries both an id and a label; the untagged
/// group, if any, comes last.
pub fn group_by_tag(contacts: Vec<Contact>) -> Vec<ContactGroup> {
    let mut groups: IndexMap<GroupKey, ContactGroup> = IndexMap::new();
    let mut untagged = Vec::new();
    for contact in contacts {
        match (contact.tag.as_deref(), contact.tag_id) {
            (Some(label), Some(tag_id)) if !label.is_empty() => {
                let key = GroupKey::Tagged(label.to_owned());
                groups
                    .entry(key.clone())
                    .or_insert_with(|| ContactGroup {
                        key,
                        tag_id: Some(tag_id),
                        contacts: Vec::new(),
                    })
                    .contacts
                    .push(contact);
            }
            _ => untagged.push(contact),
        }
    }
    let mut ordered: Vec<ContactGroup> = groups.into_values().collect();
    if !untagged.is_empty() {
        ordered.push(ContactGroup {
            key: GroupKey::Untagged,
            tag_id: None,
            contacts: untagged,
        });
    }
    ordered
}

/// Color of the tag with `tag_id` in the cached list; gray when there is no
/// id, no such tag, or no color.
pub fn tag_color(tags: &[Tag], tag_id: Option<TagId>) -> &str {
    tag_id
        .and_then(|id| tags.iter().find(|tag| tag.id == id))
        .map(Tag::display_color)
        .unwrap_or(DEFAULT_TAG_COLOR)
}

pub fn to_row(contact: &Contact, tags: &[Tag]) -> ContactRow {
    ContactRow {
        name: contact.name.clone(),
        date: contact.date.to_display(),
        wire_date: contact.date.to_wire(),
        tag_id: contact.tag_id,
        tag_label: contact.tag.clone().filter(|label| !label.is_empty()),
        tag_color: tag_color(tags, contact.tag_id).to_owned(),
    }
}

pub fn affordances(total: usize, filter: Option<TagId>, limits: &Limits) -> Affordances {
    let at_capacity = total >= limits.max_contacts;
    Affordances {
        add_enabled: !at_capacity,
        add_label: if at_capacity {
            format!("Add ({total}/{})", limits.max_contacts)
        } else {
            "Add".to_owned()
        },
        grid_enabled: filter.is_none(),
    }
}

pub fn sort_indicator(ascending: bool) -> char {
    if ascending {
        SORT_ASCENDING_INDICATOR
    } else {
        SORT_DESCENDING_INDICATOR
    }
}

pub fn build_list(contacts: Vec<Contact>, state: &ViewModel, limits: &Limits) -> ListView {
    let total = contacts.len();
    let mut visible = filter_by_tag(contacts, state.active_filter());
    sort_by_date(&mut visible, state.sort_ascending());
    ListView {
        rows: visible
            .iter()
            .map(|contact| to_row(contact, state.tags()))
            .collect(),
        total,
        active_filter: state.active_filter(),
        affordances: affordances(total, state.active_filter(), limits),
        sort_indicator: sort_indicator(state.sort_ascending()),
    }
}

/// Groups the whole set; the active filter does not apply to the grid.
pub fn build_grid(contacts: Vec<Contact>, state: &ViewModel, limits: &Limits) -> GridView {
    let total = contacts.len();
    let groups = group_by_tag(contacts)
        .into_iter()
        .map(|mut group| {
            sort_by_date(&mut group.contacts, state.sort_ascending());
            GridGroup {
                label: group.label().to_owned(),
                tag_id: group.tag_id,
                color: tag_color(state.tags(), group.tag_id).to_owned(),
                rows: group
                    .contacts
                    .iter()
                    .map(|contact| to_row(contact, state.tags()))
                    .collect(),
            }
        })
        .collect();
    GridView {
        groups,
        total,
        affordances: affordances(total, state.active_filter(), limits),
        sort_indicator: sort_indicator(state.sort_ascending()),
    }
}

/// A render together with the snapshot it was derived from.
#[derive(Debug, Clone)]
pub struct RenderedContacts {
    pub contacts: Vec<Contact>,
    pub view: ContactView,
}

pub struct ContactPresenter<'a> {
    store: &'a dyn RemoteStore,
    limits: &'a Limits,
}

impl<'a> ContactPresenter<'a> {
    pub fn new(store: &'a dyn RemoteStore, limits: &'a Limits) -> Self {
        Self { store, limits }
    }

    /// Always refetches, so a render after any mutation sees the server's
    /// current data.
    pub async fn render(
        &self,
        state: &ViewModel,
        mode: ViewMode,
    ) -> GatewayResult<RenderedContacts> {
        let contacts = self.store.list_contacts().await?;
        tracing::debug!(count = contacts.len(), %mode, "rendering contacts");
        let view = match mode {
            ViewMode::List => ContactView::List(build_list(contacts.clone(), state, self.limits)),
            ViewMode::Grid => ContactView::Grid(build_grid(contacts.clone(), state, self.limits)),
        };
        Ok(RenderedContacts { contacts, view })
    }
}
