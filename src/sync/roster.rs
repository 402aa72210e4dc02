use crate::common::{PresenceChange, User, UserId};

/// How a fresh user list relates to the one already rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RosterUpdate {
    Unchanged,
    /// Membership or presence changed; the whole list must be redrawn.
    Replaced,
    /// Only unread counters moved; patch these rows in place.
    Patched(Vec<PresenceChange>),
}

#[derive(Debug, Default)]
pub struct Roster {
    users: Vec<User>,
    loaded: bool,
    fetch_in_flight: bool,
    selected: Option<UserId>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn get(&self, id: UserId) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn select(&mut self, peer: Option<UserId>) {
        self.selected = peer;
    }

    pub fn selected(&self) -> Option<&User> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn begin_fetch(&mut self) -> bool {
        if self.fetch_in_flight {
            return false;
        }
        self.fetch_in_flight = true;
        true
    }

    pub fn fetch_failed(&mut self) {
        self.fetch_in_flight = false;
    }

    /// Diff `fresh` against the local list and adopt it.
    pub fn apply(&mut self, fresh: Vec<User>) -> RosterUpdate {
        self.fetch_in_flight = false;

        let first_load = !self.loaded;
        self.loaded = true;
        if first_load || self.is_structural(&fresh) {
            self.users = fresh;
            return RosterUpdate::Replaced;
        }

        let mut changes = Vec::new();
        for user in fresh {
            if let Some(local) = self.users.iter_mut().find(|local| local.id == user.id) {
                if local.unread_count != user.unread_count {
                    local.unread_count = user.unread_count;
                    changes.push(PresenceChange {
                        user: user.id,
                        is_online: user.is_online,
                        unread_count: user.unread_count,
                    });
                }
            }
        }

        if changes.is_empty() {
            RosterUpdate::Unchanged
        } else {
            RosterUpdate::Patched(changes)
        }
    }

    fn is_structural(&self, fresh: &[User]) -> bool {
        if self.users.len() != fresh.len() {
            return true;
        }
        self.users.iter().any(|local| {
            match fresh.iter().find(|user| user.id == local.id) {
                Some(user) => {
                    user.is_online != local.is_online
                        || user.display_name != local.display_name
                        || user.avatar_ref != local.avatar_ref
                }
                None => true,
            }
        })
    }
}
