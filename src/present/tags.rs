use crate::app::state::ViewModel;
use crate::config::Limits;
use crate::model::{Tag, TagId, ALL_TAGS_LABEL};

pub const NO_TAGS_PLACEHOLDER: &str = "No other tags found";
pub const NO_TAG_OPTION: &str = "No tag";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItem {
    pub id: TagId,
    pub name: String,
    pub color: String,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEntry {
    /// Clears the filter.
    All { active: bool },
    Tag(TagItem),
}

impl TagEntry {
    pub fn label(&self) -> &str {
        match self {
            TagEntry::All { .. } => ALL_TAGS_LABEL,
            TagEntry::Tag(item) => &item.name,
        }
    }

    /// The filter selecting this entry applies.
    pub fn filter(&self) -> Option<TagId> {
        match self {
            TagEntry::All { .. } => None,
            TagEntry::Tag(item) => Some(item.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagLegend {
    pub entries: Vec<TagEntry>,
    pub placeholder: Option<&'static str>,
    pub add_enabled: bool,
    pub add_label: String,
}

impl TagLegend {
    pub fn tag_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, TagEntry::Tag(_)))
            .count()
    }
}

/// One choice in a contact form's tag selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    pub value: Option<TagId>,
    pub label: String,
}

pub fn build_legend(tags: &[Tag], active: Option<TagId>, limits: &Limits) -> TagLegend {
    let at_capacity = tags.len() >= limits.max_tags;
    let mut entries = Vec::with_capacity(tags.len() + 1);
    entries.push(TagEntry::All {
        active: active.is_none(),
    });
    entries.extend(tags.iter().map(|tag| {
        TagEntry::Tag(TagItem {
            id: tag.id,
            name: tag.name.clone(),
            color: tag.display_color().to_owned(),
            active: active == Some(tag.id),
        })
    }));
    TagLegend {
        entries,
        placeholder: tags.is_empty().then_some(NO_TAGS_PLACEHOLDER),
        add_enabled: !at_capacity,
        add_label: if at_capacity {
            format!("Add Tag ({}/{})", tags.len(), limits.max_tags)
        } else {
            "Add Tag".to_owned()
        },
    }
}

pub fn dropdown_options(tags: &[Tag]) -> Vec<TagOption> {
    std::iter::once(TagOption {
        value: None,
        label: NO_TAG_OPTION.to_owned(),
    })
    .chain(tags.iter().map(|tag| TagOption {
        value: Some(tag.id),
        label: tag.name.clone(),
    }))
    .collect()
}

/// Case-insensitive name lookup, skipping the tag `except` (the one being
/// edited).
pub fn find_by_name<'a>(tags: &'a [Tag], name: &str, except: Option<TagId>) -> Option<&'a Tag> {
    let wanted = name.trim().to_lowercase();
    tags.iter()
        .find(|tag| Some(tag.id) != except && tag.name.to_lowercase() == wanted)
}

/// Renders the tag legend from the cached tag list.
pub struct TagPresenter<'a> {
    limits: &'a Limits,
}

impl<'a> TagPresenter<'a> {
    pub fn new(limits: &'a Limits) -> Self {
        Self { limits }
    }

    pub fn render(&self, state: &ViewModel) -> TagLegend {
        build_legend(state.tags(), state.active_filter(), self.limits)
    }

    pub fn options(&self, state: &ViewModel) -> Vec<TagOption> {
        dropdown_options(state.tags())
    }
}
