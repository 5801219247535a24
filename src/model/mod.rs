use serde::{Deserialize, Serialize};

mod date;

pub use date::{display_to_wire, wire_to_display, ContactDate, DateError};

pub type TagId = i64;

/// Badge color used when a tag has no color or cannot be found.
pub const DEFAULT_TAG_COLOR: &str = "#e5e7eb";
pub const NO_TAG_LABEL: &str = "No Tag";
pub const ALL_TAGS_LABEL: &str = "All";

/// A contact as listed by the server. `tag` is the tag name joined in at list
/// time and is absent when the referenced tag no longer exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub name: String,
    pub date: ContactDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_id: Option<TagId>,
}

impl Contact {
    pub fn new(name: impl Into<String>, date: ContactDate) -> Self {
        Self {
            name: name.into(),
            date,
            tag: None,
            tag_id: None,
        }
    }

    pub fn tagged(mut self, tag_id: TagId, label: impl Into<String>) -> Self {
        self.tag_id = Some(tag_id);
        self.tag = Some(label.into());
        self
    }

    pub fn to_draft(&self) -> ContactDraft {
        ContactDraft {
            name: self.name.clone(),
            date: self.date,
            tag_id: self.tag_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    #[serde(default)]
    pub color: Option<String>,
}

impl Tag {
    pub fn display_color(&self) -> &str {
        match self.color.as_deref() {
            Some(color) if !color.trim().is_empty() => color,
            _ => DEFAULT_TAG_COLOR,
        }
    }
}

/// Body of `/create` and `/edit`.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub date: ContactDate,
    pub tag_id: Option<TagId>,
}

/// Body of `/tags/create`; `/tags/edit` adds the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagDraft {
    pub name: String,
    pub color: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_listed_contacts_with_and_without_tags() -> anyhow::Result<()> {
        let raw = r#"[
            {"name":"Ada","date":"1990-05-01T00:00:00Z","tag":"Work","tag_id":3},
            {"name":"Bob","date":"1947-06-28"}
        ]"#;
        let contacts: Vec<Contact> = serde_json::from_str(raw)?;
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].tag.as_deref(), Some("Work"));
        assert_eq!(contacts[0].tag_id, Some(3));
        assert_eq!(contacts[0].date.to_wire(), "1990-05-01");
        assert_eq!(contacts[1].tag, None);
        assert_eq!(contacts[1].tag_id, None);
        Ok(())
    }

    #[test]
    fn draft_omits_missing_tag_id() -> anyhow::Result<()> {
        let draft = ContactDraft {
            name: "Ada".into(),
            date: ContactDate::from_calendar(1990, 5, 1)?,
            tag_id: None,
        };
        assert_eq!(
            serde_json::to_string(&draft)?,
            r#"{"name":"Ada","date":"1990-05-01"}"#
        );
        let tagged = ContactDraft {
            tag_id: Some(7),
            ..draft
        };
        assert_eq!(
            serde_json::to_string(&tagged)?,
            r#"{"name":"Ada","date":"1990-05-01","tag_id":7}"#
        );
        Ok(())
    }

    #[test]
    fn uncolored_tags_fall_back_to_gray() {
        let mut tag = Tag {
            id: 1,
            name: "Family".into(),
            color: None,
        };
        assert_eq!(tag.display_color(), DEFAULT_TAG_COLOR);
        tag.color = Some(String::new());
        assert_eq!(tag.display_color(), DEFAULT_TAG_COLOR);
        tag.color = Some("#6366f1".into());
        assert_eq!(tag.display_color(), "#6366f1");
    }
}
