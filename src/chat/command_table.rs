//! User-defined text-expansion shortcuts.
//!
//! A command maps a trigger (matched against the whole trimmed input,
//! ignoring case) to the text that is actually sent.  The table is
//! persisted as a JSON array under [`COMMANDS_KEY`].

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::store::{COMMANDS_KEY, KeyValueStore};
use crate::{Error, Result};

/// One trigger and its expansion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCommand {
    /// Creation-time identifier, unique within a table.
    #[serde(default)]
    pub id: String,
    /// Text that, typed on its own, is replaced.
    pub trigger: String,
    /// Replacement text.
    pub content: String,
}

impl CustomCommand {
    fn matches(&self, input: &str) -> bool {
        self.trigger.trim().to_lowercase() == input.to_lowercase()
    }
}

/// Ordered list of custom commands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandTable {
    commands: Vec<CustomCommand>,
}

impl CommandTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table from commands, keeping their order.
    pub fn from_commands(commands: Vec<CustomCommand>) -> Self {
        Self { commands }
    }

    /// Returns the expansion for `text`, or `text` itself when nothing matches.
    ///
    /// When several commands share a trigger the first one wins.
    pub fn lookup<'a>(&'a self, text: &'a str) -> &'a str {
        match self.find(text) {
            Some(command) => &command.content,
            None => text,
        }
    }

    /// Returns the first command whose trigger matches `text`.
    pub fn find(&self, text: &str) -> Option<&CustomCommand> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.commands.iter().find(|command| command.matches(text))
    }

    /// Adds a command at the end of the table.
    ///
    /// # Errors
    ///
    /// Returns a validation error when the trigger or content is blank.
    pub fn add(
        &mut self,
        trigger: impl Into<String>,
        content: impl Into<String>,
    ) -> Result<&CustomCommand> {
        let trigger = trigger.into().trim().to_string();
        let content = content.into();
        if trigger.is_empty() {
            return Err(Error::validation(
                "command trigger must not be empty",
                Some("trigger".to_string()),
            ));
        }
        if content.trim().is_empty() {
            return Err(Error::validation(
                "command content must not be empty",
                Some("content".to_string()),
            ));
        }
        let id = self.next_id();
        self.commands.push(CustomCommand {
            id,
            trigger,
            content,
        });
        Ok(&self.commands[self.commands.len() - 1])
    }

    fn next_id(&self) -> String {
        let mut millis = OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
        while self.commands.iter().any(|c| c.id == millis.to_string()) {
            millis += 1;
        }
        millis.to_string()
    }

    /// Removes every command with the given trigger; returns how many went.
    pub fn remove(&mut self, trigger: &str) -> usize {
        let trigger = trigger.trim();
        let before = self.commands.len();
        self.commands.retain(|command| !command.matches(trigger));
        before - self.commands.len()
    }

    /// Iterates the commands in table order.
    pub fn iter(&self) -> impl Iterator<Item = &CustomCommand> {
        self.commands.iter()
    }

    /// Number of commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Returns true if the table holds no commands.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Loads the table from `store`.
    ///
    /// Missing data yields an empty table.  Unreadable or malformed data is
    /// logged and also yields an empty table.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let raw = match store.get(COMMANDS_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Self::new(),
            Err(err) => {
                tracing::warn!(error = %err, "could not read custom commands");
                return Self::new();
            }
        };
        match serde_json::from_str::<Vec<CustomCommand>>(&raw) {
            Ok(commands) => Self::from_commands(commands),
            Err(err) => {
                tracing::warn!(error = %err, "ignoring malformed custom commands");
                Self::new()
            }
        }
    }

    /// Writes the table to `store`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the write fails.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<()> {
        let json = serde_json::to_string(&self.commands)?;
        store.set(COMMANDS_KEY, &json)
    }
}

impl<'a> IntoIterator for &'a CommandTable {
    type Item = &'a CustomCommand;
    type IntoIter = std::slice::Iter<'a, CustomCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn table() -> CommandTable {
        let mut table = CommandTable::new();
        table.add("go", "A").unwrap();
        table.add("go", "B").unwrap();
        table.add("/review", "Review this code carefully.").unwrap();
        table
    }

    #[test]
    fn first_match_wins() {
        let table = table();
        assert_eq!(table.lookup("go"), "A");
        assert_eq!(table.lookup("GO "), "A");
        assert_eq!(table.lookup("  /Review"), "Review this code carefully.");
    }

    #[test]
    fn matching_folds_unicode_case() {
        let mut table = CommandTable::new();
        table.add("Ésta", "expanded").unwrap();
        table.add("ПРИВЕТ", "hello").unwrap();
        assert_eq!(table.lookup("ésta"), "expanded");
        assert_eq!(table.lookup(" ÉSTA "), "expanded");
        assert_eq!(table.lookup("привет"), "hello");
        assert_eq!(table.lookup("esta"), "esta");

        assert_eq!(table.remove("éSTA"), 1);
        assert_eq!(table.lookup("ésta"), "ésta");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn non_matching_text_is_unchanged() {
        let table = table();
        assert_eq!(table.lookup("go now"), "go now");
        assert_eq!(table.lookup("hello"), "hello");
        assert_eq!(table.lookup(""), "");
    }

    #[test]
    fn lookup_is_idempotent() {
        let mut table = CommandTable::new();
        table.add("x", "expanded").unwrap();
        for input in ["x", "X", "expanded", "other"] {
            let once = table.lookup(input);
            assert_eq!(table.lookup(once), once);
        }
    }

    #[test]
    fn add_rejects_blank_fields() {
        let mut table = CommandTable::new();
        assert!(table.add("  ", "content").unwrap_err().is_validation());
        assert!(table.add("t", " ").unwrap_err().is_validation());
        assert!(table.is_empty());
    }

    #[test]
    fn ids_are_unique() {
        let table = table();
        let ids: Vec<&str> = table.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert_ne!(ids[0], ids[1]);
        assert_ne!(ids[1], ids[2]);
        assert_ne!(ids[0], ids[2]);
    }

    #[test]
    fn remove_by_trigger() {
        let mut table = table();
        assert_eq!(table.remove("GO"), 2);
        assert_eq!(table.remove("go"), 0);
        assert_eq!(table.len(), 1);
        assert_eq!(table.lookup("go"), "go");
    }

    #[test]
    fn save_then_load() {
        let mut store = MemoryStore::new();
        let table = table();
        table.save(&mut store).unwrap();

        let loaded = CommandTable::load(&store);
        assert_eq!(loaded, table);
        assert_eq!(loaded.lookup("go"), "A");
    }

    #[test]
    fn load_accepts_entries_without_id() {
        let mut store = MemoryStore::new();
        store
            .set(COMMANDS_KEY, r#"[{"trigger":"hi","content":"hello there"}]"#)
            .unwrap();
        let table = CommandTable::load(&store);
        assert_eq!(table.lookup("HI"), "hello there");
    }

    #[test]
    fn load_degrades_to_empty() {
        let store = MemoryStore::new();
        assert!(CommandTable::load(&store).is_empty());

        let mut store = MemoryStore::new();
        store.set(COMMANDS_KEY, "{ nope").unwrap();
        assert!(CommandTable::load(&store).is_empty());
    }
}
