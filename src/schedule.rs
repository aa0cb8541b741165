use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::calendar::DateKey;
use crate::config::Person;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[default]
    Class,
    Rest,
}

impl EntryKind {
    pub fn toggled(self) -> Self {
        match self {
            EntryKind::Class => EntryKind::Rest,
            EntryKind::Rest => EntryKind::Class,
        }
    }

    /// Glyph drawn inside the stamp circle.
    pub fn stamp(&self) -> &'static str {
        match self {
            EntryKind::Class => "課",
            EntryKind::Rest => "休",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntryKind::Class => "上課",
            EntryKind::Rest => "休息",
        }
    }
}

/// Attendance flags keyed by person name.
pub type People = BTreeMap<String, bool>;

/// The known attendees, in display order.
#[derive(Clone, Debug, PartialEq)]
pub struct Roster(Vec<Person>);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleEntry {
    pub kind: EntryKind,
    pub people: People,
}

#[derive(Debug, Default)]
pub struct ScheduleStore {
    entries: HashMap<DateKey, ScheduleEntry>,
}

impl Roster {
    pub fn new(people: Vec<Person>) -> Self {
        Roster(people)
    }

    pub fn people(&self) -> &[Person] {
        &self.0
    }

    pub fn get(&self, idx: usize) -> Option<&Person> {
        self.0.get(idx)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Flags for every roster member, all unset.
    pub fn blank_people(&self) -> People {
        self.0
            .iter()
            .map(|person| (person.name.clone(), false))
            .collect()
    }
}

impl ScheduleEntry {
    pub fn new(kind: EntryKind, people: People) -> Self {
        ScheduleEntry { kind, people }
    }

    pub fn blank(kind: EntryKind, roster: &Roster) -> Self {
        Self::new(kind, roster.blank_people())
    }

    pub fn is_rest(&self) -> bool {
        self.kind == EntryKind::Rest
    }

    pub fn has_any_person(&self) -> bool {
        self.people.values().any(|&present| present)
    }

    pub fn is_present(&self, name: &str) -> bool {
        self.people.get(name).copied().unwrap_or(false)
    }

    /// Rest days, and class days nobody has been assigned to yet, show the
    /// stamp; otherwise the attendee names are shown instead.
    pub fn shows_stamp_glyph(&self) -> bool {
        self.is_rest() || !self.has_any_person()
    }

    pub fn toggle(&mut self, name: &str) {
        let flag = self.people.entry(name.to_owned()).or_insert(false);
        *flag = !*flag;
    }

    /// Names shown on the day cell, in roster order. Flags of rest days are
    /// kept but never displayed.
    pub fn attendees<'r>(&self, roster: &'r Roster) -> Vec<&'r Person> {
        if self.is_rest() {
            return Vec::new();
        }

        roster
            .people()
            .iter()
            .filter(|person| self.is_present(&person.name))
            .collect()
    }
}

impl ScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DateKey) -> Option<&ScheduleEntry> {
        self.entries.get(key)
    }

    pub fn save(&mut self, key: DateKey, entry: ScheduleEntry) {
        log::debug!("saving {:?} at {}", entry.kind, key);
        self.entries.insert(key, entry);
    }

    pub fn clear(&mut self, key: &DateKey) -> Option<ScheduleEntry> {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            log::debug!("cleared {}", key);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
