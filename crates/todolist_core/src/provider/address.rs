//! URI addressing for the to-do content provider.
//!
//! `content://com.example.todoprovider/todoitems` names the whole table and
//! `content://com.example.todoprovider/todoitems/{id}` names one row.

use super::{ProviderError, ProviderResult};
use crate::model::task::TaskId;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt::{Display, Formatter};

pub const SCHEME: &str = "content";
pub const AUTHORITY: &str = "com.example.todoprovider";
pub const COLLECTION_PATH: &str = "todoitems";

/// MIME type reported for the collection address.
pub const COLLECTION_TYPE: &str = "vnd.android.cursor.dir/vnd.example.todos";
/// MIME type reported for a single-row address.
pub const ITEM_TYPE: &str = "vnd.android.cursor.item/vnd.example.todos";

static ADDRESS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^content://com\.example\.todoprovider/todoitems(?:/([0-9]+))?$")
        .expect("valid content address regex")
});

/// Which rows a URI selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentAddress {
    Collection,
    Item(TaskId),
}

impl ContentAddress {
    /// Matches a URI against the collection and single-row patterns.
    pub fn parse(uri: &str) -> ProviderResult<Self> {
        let captures = ADDRESS_RE
            .captures(uri)
            .ok_or_else(|| ProviderError::UnsupportedAddress(uri.to_string()))?;
        match captures.get(1) {
            None => Ok(Self::Collection),
            // Digits that overflow i64 cannot name a stored row.
            Some(id) => id
                .as_str()
                .parse::<TaskId>()
                .map(Self::Item)
                .map_err(|_| ProviderError::UnsupportedAddress(uri.to_string())),
        }
    }

    /// Address of the row a fresh insert produced.
    pub fn with_appended_id(id: TaskId) -> Self {
        Self::Item(id)
    }

    pub fn to_uri(self) -> String {
        self.to_string()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Collection => COLLECTION_TYPE,
            Self::Item(_) => ITEM_TYPE,
        }
    }
}

impl Display for ContentAddress {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{SCHEME}://{AUTHORITY}/{COLLECTION_PATH}")?;
        if let Self::Item(id) = self {
            write!(f, "/{id}")?;
        }
        Ok(())
    }
}
