//! View derivation: pure functions of a [`ViewModel`](crate::app::ViewModel)
//! snapshot and the store's data.

pub mod contacts;
pub mod tags;

pub use contacts::{
    Affordances, ContactPresenter, ContactRow, ContactView, GridGroup, GridView, ListView,
    RenderedContacts,
};
pub use tags::{TagEntry, TagLegend, TagOption, TagPresenter};
