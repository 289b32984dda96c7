//! # Item classifier communications module

use serde::{Deserialize, Serialize};

/// A type of item found by a classifier and the number of them.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ItemCount {
    pub label: String,
    pub count: u32,
}

impl ItemCount {
    pub fn new<S: Into<String>>(label: S, count: u32) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}
