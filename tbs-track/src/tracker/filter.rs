// Copyright (c) 2025 Graphcore Ltd. All rights reserved.

use std::cell::RefCell;
use std::collections::HashMap;

use regex::Regex;

use crate::Id;
use crate::tracker::TrackConfigError;

/// Chooses the level at which each entity emits events.
///
/// Entities take the level of the first rule whose pattern matches their full
/// name (e.g. `top::ring::station3::mac`), or the default level otherwise.
pub struct LevelFilter {
    default_level: log::Level,
    rules: Vec<(Regex, log::Level)>,

    /// Only entities whose level differs from the default are kept.
    overrides: RefCell<HashMap<Id, log::Level>>,
}

impl LevelFilter {
    /// Create a filter that gives every entity `default_level`.
    #[must_use]
    pub fn new(default_level: log::Level) -> Self {
        Self {
            default_level,
            rules: Vec::new(),
            overrides: RefCell::new(HashMap::new()),
        }
    }

    /// Add a rule giving entities whose name matches `pattern` the `level`.
    ///
    /// ```rust
    /// use tbs_track::tracker::LevelFilter;
    /// let filter = LevelFilter::new(log::Level::Warn)
    ///     .with_rule(r"::mac$", log::Level::Trace)
    ///     .unwrap();
    /// ```
    pub fn with_rule(mut self, pattern: &str, level: log::Level) -> Result<Self, TrackConfigError> {
        let regex = Regex::new(pattern)
            .map_err(|e| TrackConfigError(format!("Invalid filter '{pattern}': {e}")))?;
        self.rules.push((regex, level));
        Ok(self)
    }

    fn level_for(&self, entity_name: &str) -> log::Level {
        self.rules
            .iter()
            .find(|(regex, _)| regex.is_match(entity_name))
            .map_or(self.default_level, |(_, level)| *level)
    }

    /// Record the level of a newly created entity.
    pub fn register(&self, id: Id, entity_name: &str) {
        let level = self.level_for(entity_name);
        if level != self.default_level {
            self.overrides.borrow_mut().insert(id, level);
        }
    }

    /// Whether an event of `level` from the entity `id` passes.
    #[must_use]
    pub fn allows(&self, id: Id, level: log::Level) -> bool {
        let entity_level = self
            .overrides
            .borrow()
            .get(&id)
            .copied()
            .unwrap_or(self.default_level);
        level <= entity_level
    }
}

#[cfg(test)]
mod tests {
    use log::Level;

    use super::*;

    const NAMES: [&str; 4] = [
        "top",
        "top::ring",
        "top::ring::station0::mac",
        "top::ring::station1::genA",
    ];

    fn levels(filter: &LevelFilter) -> Vec<Level> {
        NAMES.iter().map(|n| filter.level_for(n)).collect()
    }

    #[test]
    fn default_only() {
        let filter = LevelFilter::new(Level::Error);
        assert_eq!(levels(&filter), vec![Level::Error; 4]);
    }

    #[test]
    fn mac_engines_traced() {
        let filter = LevelFilter::new(Level::Warn)
            .with_rule("::mac$", Level::Trace)
            .unwrap();
        assert_eq!(
            levels(&filter),
            vec![Level::Warn, Level::Warn, Level::Trace, Level::Warn]
        );
    }

    #[test]
    fn first_matching_rule_wins() {
        let filter = LevelFilter::new(Level::Error)
            .with_rule("station1", Level::Debug)
            .unwrap()
            .with_rule("ring", Level::Info)
            .unwrap();
        assert_eq!(
            levels(&filter),
            vec![Level::Error, Level::Info, Level::Info, Level::Debug]
        );
    }

    #[test]
    fn registered_entities() {
        let filter = LevelFilter::new(Level::Warn)
            .with_rule("station0", Level::Trace)
            .unwrap();
        filter.register(Id(5), NAMES[2]);
        filter.register(Id(6), NAMES[3]);

        assert!(filter.allows(Id(5), Level::Trace));
        assert!(!filter.allows(Id(6), Level::Info));
        assert!(filter.allows(Id(6), Level::Warn));
        // Unregistered ids use the default
        assert!(filter.allows(Id(7), Level::Error));
    }

    #[test]
    fn bad_pattern() {
        let err = LevelFilter::new(Level::Error)
            .with_rule("(", Level::Info)
            .err()
            .unwrap();
        assert!(err.0.starts_with("Invalid filter '('"));
    }
}
