// Copyright (c) 2022 MASSA LABS <info@massa.net>

use serde::{Deserialize, Serialize};
use std::fmt;

/// key/value pair attached to an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    /// attribute name
    pub key: String,
    /// attribute value, in its display form
    pub value: String,
}

/// Deterministic event emitted while executing a block.
///
/// Replicas must emit the same events in the same order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// event type (ex: `slash`)
    pub kind: String,
    /// ordered attributes
    pub attributes: Vec<EventAttribute>,
}

impl Event {
    /// Creates an event without attributes
    pub fn new(kind: &str) -> Self {
        Event {
            kind: kind.to_string(),
            attributes: Vec::new(),
        }
    }

    /// Appends an attribute
    ///
    /// ```
    /// # use relay_models::Event;
    /// let event = Event::new("slash").with_attribute("reason", "double_sign");
    /// assert_eq!(event.get("reason"), Some("double_sign"));
    /// ```
    #[must_use]
    pub fn with_attribute(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.attributes.push(EventAttribute {
            key: key.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Value of the first attribute named `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.key == key)
            .map(|attribute| attribute.value.as_str())
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        for attribute in &self.attributes {
            write!(f, " {}={}", attribute.key, attribute.value)?;
        }
        Ok(())
    }
}
