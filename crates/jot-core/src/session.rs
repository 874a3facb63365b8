//! Session context
//!
//! Which user is acting, and which entry (if any) is open for editing.
//! The core trusts the user id it is given; authentication happens elsewhere.

use crate::models::{EntryAggregate, User};

/// The acting user and the entry they have open
#[derive(Debug, Clone)]
pub struct Session {
    user_id: String,
    current_entry: Option<EntryAggregate>,
}

impl Session {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            current_entry: None,
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self::new(user.id.clone())
    }

    pub fn current_user_id(&self) -> &str {
        &self.user_id
    }

    pub fn current_entry(&self) -> Option<&EntryAggregate> {
        self.current_entry.as_ref()
    }

    /// Open an entry, returning whichever was open before
    pub fn set_current_entry(&mut self, aggregate: EntryAggregate) -> Option<EntryAggregate> {
        self.current_entry.replace(aggregate)
    }

    /// Hand the open entry over to the caller, leaving none open
    pub fn take_current_entry(&mut self) -> Option<EntryAggregate> {
        self.current_entry.take()
    }

    pub fn clear_current_entry(&mut self) {
        self.current_entry = None;
    }
}
