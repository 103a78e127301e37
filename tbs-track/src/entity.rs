// Copyright (c) 2023 Graphcore Ltd. All rights reserved.

//! Named nodes of the simulation hierarchy.
//!
//! A sweep creates `sweep`, each load point a `ring` below it, and each
//! station of the ring `station{index}` with its `mac`, `genA` and `genB`
//! children. Every event is emitted on behalf of one of these so that it can
//! be filtered by full name, e.g. `sweep::ring::station3::mac`.

use std::fmt;
use std::rc::Rc;

use crate::{Id, Tracker, create, destroy};

const SEPARATOR: &str = "::";

/// A node of the simulation hierarchy, created with [`toplevel`] for the
/// root or [`Entity::new`] below it.
pub struct Entity {
    /// Local name (e.g. `station3`).
    pub name: String,

    /// Only the root has no parent.
    pub parent: Option<Rc<Entity>>,

    /// Id given to every event this entity emits.
    pub id: Id,

    /// Receives the events of this entity and its children.
    pub tracker: Tracker,

    full_name: String,
}

impl Entity {
    /// Create a child of `parent`.
    #[must_use]
    pub fn new(parent: &Rc<Entity>, name: &str) -> Self {
        let full_name = format!("{}{SEPARATOR}{name}", parent.full_name);
        Self::register(Some(parent.clone()), parent.tracker.clone(), name, full_name)
    }

    /// Create the `index`th child of a kind, named `{kind}{index}`.
    ///
    /// ```rust
    /// use std::rc::Rc;
    /// use tbs_track::entity::{Entity, toplevel};
    ///
    /// let top = toplevel(&tbs_track::tracker::dev_null_tracker(), "top");
    /// let station = Entity::numbered(&top, "station", 3);
    /// assert_eq!(station.full_name(), "top::station3");
    /// ```
    #[must_use]
    pub fn numbered(parent: &Rc<Entity>, kind: &str, index: usize) -> Self {
        Self::new(parent, &format!("{kind}{index}"))
    }

    fn register(parent: Option<Rc<Entity>>, tracker: Tracker, name: &str, full_name: String) -> Self {
        let id = tracker.unique_id();
        tracker.add_entity(id, &full_name);
        let entity = Self {
            name: name.to_string(),
            parent,
            id,
            tracker,
            full_name,
        };
        create!(entity);
        entity
    }

    /// The names from the root down to this entity, joined by `::`.
    #[must_use]
    pub fn full_name(&self) -> &str {
        &self.full_name
    }
}

impl Drop for Entity {
    fn drop(&mut self) {
        destroy!(self);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({} {})", self.id, self.full_name)
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full_name)
    }
}

/// Create the root of a hierarchy.
pub fn toplevel(tracker: &Tracker, name: &str) -> Rc<Entity> {
    Rc::new(Entity::register(
        None,
        tracker.clone(),
        name,
        name.to_string(),
    ))
}
