use std::collections::HashMap;
use std::fmt;

use bon::bon;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A piece of text and its metadata, as stored in and returned by a vector store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub page_content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub metadata: HashMap<String, Value>,
}

#[bon]
impl Document {
    #[builder]
    pub fn new(
        #[builder(into)] page_content: String,
        #[builder(into)] id: Option<String>,
        #[builder(default)] metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            page_content,
            id,
            metadata,
        }
    }
}

impl From<&str> for Document {
    fn from(text: &str) -> Self {
        Self {
            page_content: text.to_string(),
            ..Default::default()
        }
    }
}

impl From<String> for Document {
    fn from(page_content: String) -> Self {
        Self {
            page_content,
            ..Default::default()
        }
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.metadata.is_empty() {
            write!(f, "page_content='{}'", self.page_content)
        } else {
            write!(
                f,
                "page_content='{}' metadata={:?}",
                self.page_content, self.metadata
            )
        }
    }
}
