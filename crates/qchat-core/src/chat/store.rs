use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::chat::{ConversationRecord, Message, MessageLog, title_from_prompt};
use crate::storage::{Storage, StorageError};

/// Storage key of the chat index.
const INDEX_KEY: &str = "chatHistory";

/// Title of a chat created before any message was sent.
pub const DEFAULT_CHAT_TITLE: &str = "New Chat";

/// Assistant greeting shown in a chat with no stored messages.
pub const WELCOME_MESSAGE: &str = "Welcome to your new chat!";

fn messages_key(chat_id: &str) -> String {
    format!("chat_{chat_id}_messages")
}

/// Conversation index and per-chat message logs over a [`Storage`].
#[derive(Debug)]
pub struct ChatStore<S> {
    storage: S,
}

impl<S: Storage> ChatStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Lists chats, newest first. A corrupted index reads as empty.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn list_chats(&self) -> Result<Vec<ConversationRecord>, StorageError> {
        Ok(self.read_json(INDEX_KEY)?.unwrap_or_default())
    }

    /// Creates an empty chat titled [`DEFAULT_CHAT_TITLE`].
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or written.
    pub fn create_chat(&mut self) -> Result<ConversationRecord, StorageError> {
        let record = ConversationRecord::new(uuid::Uuid::new_v4().to_string(), DEFAULT_CHAT_TITLE);
        self.prepend_record(record.clone())?;
        Ok(record)
    }

    /// Returns the chat's record, if it is in the index.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn find_chat(&self, chat_id: &str) -> Result<Option<ConversationRecord>, StorageError> {
        Ok(self
            .list_chats()?
            .into_iter()
            .find(|record| record.id == chat_id))
    }

    /// Returns the stored title, or `Chat <id>` for an unknown chat.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn chat_title(&self, chat_id: &str) -> Result<String, StorageError> {
        Ok(self
            .find_chat(chat_id)?
            .map_or_else(|| format!("Chat {chat_id}"), |record| record.title))
    }

    /// Stores the first exchange of a conversation that had no index entry
    /// yet, titling it from the prompt.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or written.
    pub fn record_first_exchange(
        &mut self,
        chat_id: &str,
        messages: &[Message],
    ) -> Result<ConversationRecord, StorageError> {
        let title = messages
            .iter()
            .find(|m| m.role == crate::chat::Role::User)
            .map_or_else(|| DEFAULT_CHAT_TITLE.to_string(), |m| title_from_prompt(&m.content));
        let record = ConversationRecord::new(chat_id, title);
        self.prepend_record(record.clone())?;
        self.save_messages(chat_id, messages)?;
        Ok(record)
    }

    /// Loads a chat's messages.
    ///
    /// A missing or corrupted log yields a single assistant welcome message.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read.
    pub fn load_messages(&self, chat_id: &str) -> Result<MessageLog, StorageError> {
        match self.read_json::<MessageLog>(&messages_key(chat_id))? {
            Some(messages) => Ok(messages),
            None => Ok(vec![Message::assistant(WELCOME_MESSAGE)]),
        }
    }

    /// Replaces a chat's message log.
    ///
    /// # Errors
    /// Returns an error if the log cannot be encoded or written.
    pub fn save_messages(&mut self, chat_id: &str, messages: &[Message]) -> Result<(), StorageError> {
        self.write_json(&messages_key(chat_id), &messages)
    }

    /// Titles a chat from its first prompt if it still has the default title.
    ///
    /// Returns the new title when one was set.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or written.
    pub fn retitle_if_new(
        &mut self,
        chat_id: &str,
        prompt: &str,
    ) -> Result<Option<String>, StorageError> {
        let mut chats = self.list_chats()?;
        let Some(record) = chats
            .iter_mut()
            .find(|r| r.id == chat_id && r.title == DEFAULT_CHAT_TITLE)
        else {
            return Ok(None);
        };
        record.title = title_from_prompt(prompt);
        let title = record.title.clone();
        self.write_json(INDEX_KEY, &chats)?;
        Ok(Some(title))
    }

    /// Deletes a chat's index entry and message log.
    ///
    /// Returns whether the chat was in the index.
    ///
    /// # Errors
    /// Returns an error if storage cannot be read or written.
    pub fn delete_chat(&mut self, chat_id: &str) -> Result<bool, StorageError> {
        let mut chats = self.list_chats()?;
        let before = chats.len();
        chats.retain(|record| record.id != chat_id);
        let removed = chats.len() != before;
        if removed {
            self.write_json(INDEX_KEY, &chats)?;
        }
        self.storage.remove(&messages_key(chat_id))?;
        Ok(removed)
    }

    fn prepend_record(&mut self, record: ConversationRecord) -> Result<(), StorageError> {
        let mut chats = self.list_chats()?;
        chats.retain(|r| r.id != record.id);
        chats.insert(0, record);
        self.write_json(INDEX_KEY, &chats)
    }

    /// Reads and decodes a value; undecodable data is logged and read as `None`.
    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.storage.get(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                warn!(key, error = %err, "ignoring corrupted stored value");
                Ok(None)
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(value).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.storage.set(key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::Role;
    use crate::storage::MemoryStorage;

    fn store() -> ChatStore<MemoryStorage> {
        ChatStore::new(MemoryStorage::new())
    }

    #[test]
    fn test_create_chat_prepends_to_index() {
        let mut store = store();
        let first = store.create_chat().unwrap();
        let second = store.create_chat().unwrap();

        let chats = store.list_chats().unwrap();
        assert_eq!(chats.len(), 2);
        assert_eq!(chats[0].id, second.id);
        assert_eq!(chats[1].id, first.id);
        assert_eq!(chats[0].title, DEFAULT_CHAT_TITLE);
    }

    #[test]
    fn test_message_log_round_trip() {
        let mut store = store();
        let log = vec![
            Message::user("What is superposition?"),
            Message::assistant("A **linear combination** of states."),
        ];
        store.save_messages("c1", &log).unwrap();

        let loaded = store.load_messages("c1").unwrap();
        assert_eq!(loaded.len(), 2);
        for (saved, loaded) in log.iter().zip(&loaded) {
            assert_eq!(
                (&saved.id, saved.role, &saved.content),
                (&loaded.id, loaded.role, &loaded.content)
            );
            assert_eq!(saved.timestamp, loaded.timestamp);
        }
    }

    #[test]
    fn test_missing_log_yields_welcome_message() {
        let loaded = store().load_messages("nope").unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].role, Role::Assistant);
        assert_eq!(loaded[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn test_corrupted_values_are_tolerated() {
        let mut storage = MemoryStorage::new();
        storage.set(INDEX_KEY, "{not json").unwrap();
        storage.set(&messages_key("c1"), "[{]").unwrap();
        let store = ChatStore::new(storage);

        assert!(store.list_chats().unwrap().is_empty());
        assert_eq!(store.load_messages("c1").unwrap()[0].content, WELCOME_MESSAGE);
    }

    #[test]
    fn test_record_first_exchange_titles_from_prompt() {
        let mut store = store();
        let log = vec![
            Message::user("How do quantum computers factor large numbers?"),
            Message::assistant("Shor's algorithm."),
        ];
        let record = store.record_first_exchange("c9", &log).unwrap();

        assert_eq!(record.title, "How do quantum computers facto...");
        assert_eq!(store.list_chats().unwrap()[0].id, "c9");
        assert_eq!(store.load_messages("c9").unwrap(), log);
    }

    #[test]
    fn test_retitle_only_replaces_default_title() {
        let mut store = store();
        let chat = store.create_chat().unwrap();

        let title = store.retitle_if_new(&chat.id, "Bell states").unwrap();
        assert_eq!(title.as_deref(), Some("Bell states"));
        assert_eq!(store.chat_title(&chat.id).unwrap(), "Bell states");

        assert_eq!(store.retitle_if_new(&chat.id, "Other").unwrap(), None);
        assert_eq!(store.chat_title(&chat.id).unwrap(), "Bell states");
    }

    #[test]
    fn test_delete_chat_removes_index_and_log() {
        let mut store = store();
        let chat = store.create_chat().unwrap();
        store
            .save_messages(&chat.id, &[Message::user("hi")])
            .unwrap();

        assert!(store.delete_chat(&chat.id).unwrap());
        assert!(store.list_chats().unwrap().is_empty());
        assert!(store.storage.is_empty());
        assert!(!store.delete_chat(&chat.id).unwrap());
    }

    #[test]
    fn test_unknown_chat_title() {
        assert_eq!(store().chat_title("abc").unwrap(), "Chat abc");
    }
}
