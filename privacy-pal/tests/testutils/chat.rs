//! Chat application used to drive end-to-end requests
//!
//! Data model:
//! - `users/{u}`: `name`, `gcs` (group chat ids), `dms` (other user id -> dm id)
//! - `gcs/{g}`: `owner`, `users` (members other than the creator)
//! - `dms/{d}`: `user1`, `user2`
//! - messages: `userId`, `content`, `timestamp`
//!
//! On the memory store messages live in a `messages` sub-collection of their
//! chat. On the sled store they share one flat `messages` collection and
//! carry a `chatId` field instead.

#[cfg(feature = "sled-backend")]
use privacy_pal::SledStore;
use privacy_pal::{
    AccessOutput, Address, DeletionDirective, Document, FieldUpdate, Filter, FnHandler,
    HandlerRegistry, Locator, MemoryStore, OutputValue, PalError, PalResult, PrivacyEngine,
    StorageAdapter, TypeHandler, Value,
};
use std::collections::BTreeMap;
use std::sync::Arc;

pub const USER: &str = "user";
pub const GROUP_CHAT: &str = "groupchat";
pub const DIRECT_MESSAGE: &str = "directmessage";
pub const MESSAGE: &str = "message";

/// Document locator in the same convention as `like`
fn top_level(like: &Locator, data_type: &str, collection: &str, id: &str) -> Locator {
    match like.address {
        Address::Path(_) => Locator::path_document(data_type, [collection], [id]),
        Address::Flat(_) => Locator::flat_document(data_type, collection, id),
    }
}

/// The subject's messages inside the chat `chat` names
fn chat_messages(chat: &Locator, chat_id: &str, subject_id: &str) -> PalResult<Locator> {
    match chat.address {
        Address::Path(_) => {
            chat.subcollection(MESSAGE, "messages", vec![Filter::eq("userId", subject_id)])
        }
        Address::Flat(_) => Ok(Locator::flat_collection(
            MESSAGE,
            "messages",
            vec![
                Filter::eq("userId", subject_id),
                Filter::eq("chatId", chat_id),
            ],
        )),
    }
}

fn document_id(document: &Document) -> PalResult<&str> {
    document
        .id()
        .ok_or_else(|| PalError::Handler("document has no _id".to_string()))
}

pub struct UserHandler;

impl UserHandler {
    fn group_chats(locator: &Locator, document: &Document) -> PalResult<Vec<Locator>> {
        Ok(document
            .string_array_field("gcs")?
            .into_iter()
            .map(|id| top_level(locator, GROUP_CHAT, "gcs", id))
            .collect())
    }

    fn direct_messages(
        locator: &Locator,
        document: &Document,
    ) -> PalResult<BTreeMap<String, Locator>> {
        let mut dms = BTreeMap::new();
        for (other_user, dm) in document.map_field("dms")? {
            let dm_id = dm
                .as_string()
                .ok_or_else(|| PalError::Handler(format!("invalid dm id for {}", other_user)))?;
            dms.insert(
                other_user.clone(),
                top_level(locator, DIRECT_MESSAGE, "dms", dm_id),
            );
        }
        Ok(dms)
    }
}

impl TypeHandler for UserHandler {
    fn handle_access(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<AccessOutput> {
        let mut out = AccessOutput::new();
        out.insert(
            "Name".to_string(),
            OutputValue::Scalar(document.get("name").cloned().unwrap_or(Value::Null)),
        );
        if document_id(document)? != subject_id {
            return Ok(out);
        }
        out.insert(
            "Groupchats".to_string(),
            OutputValue::Many(Self::group_chats(locator, document)?),
        );
        out.insert(
            "DirectMessages".to_string(),
            OutputValue::Keyed(Self::direct_messages(locator, document)?),
        );
        Ok(out)
    }

    fn handle_deletion(
        &self,
        _subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<DeletionDirective> {
        let mut children = Self::group_chats(locator, document)?;
        children.extend(Self::direct_messages(locator, document)?.into_values());
        Ok(DeletionDirective::delete().with_children(children))
    }
}

pub struct GroupChatHandler;

impl TypeHandler for GroupChatHandler {
    fn handle_access(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<AccessOutput> {
        let mut out = AccessOutput::new();
        out.insert(
            "Messages".to_string(),
            chat_messages(locator, document_id(document)?, subject_id)?.into(),
        );
        Ok(out)
    }

    fn handle_deletion(
        &self,
        subject_id: &str,
        locator: &Locator,
        document: &Document,
    ) -> PalResult<DeletionDirective> {
        let messages = chat_messages(locator, document_id(document)?, subject_id)?;
        let users = document.string_array_field("users")?;

        // An owner leaving hands the chat to the first remaining member
        let update = if document.str_field("owner")? == subject_id && users.len() > 1 {
            FieldUpdate::set("owner", users[0])
        } else {
            FieldUpdate::array_remove("users", subject_id)
        };
        Ok(DeletionDirective::update(vec![update]).with_children(vec![messages]))
    }
}

fn direct_message_access(
    subject_id: &str,
    locator: &Locator,
    document: &Document,
) -> PalResult<AccessOutput> {
    let user1 = document.str_field("user1")?;
    let user2 = document.str_field("user2")?;
    let other_user = if user1 == subject_id { user2 } else { user1 };

    let mut out = AccessOutput::new();
    out.insert(
        "Other User".to_string(),
        top_level(locator, USER, "users", other_user).into(),
    );
    out.insert(
        "Messages".to_string(),
        chat_messages(locator, document_id(document)?, subject_id)?.into(),
    );
    Ok(out)
}

fn direct_message_deletion(
    subject_id: &str,
    locator: &Locator,
    document: &Document,
) -> PalResult<DeletionDirective> {
    let messages = chat_messages(locator, document_id(document)?, subject_id)?;
    Ok(DeletionDirective::update(Vec::new()).with_children(vec![messages]))
}

fn message_access(_: &str, _: &Locator, document: &Document) -> PalResult<AccessOutput> {
    let mut out = AccessOutput::new();
    for (field, key) in [("content", "Content"), ("timestamp", "Timestamp")] {
        out.insert(
            key.to_string(),
            OutputValue::Scalar(document.get(field).cloned().unwrap_or(Value::Null)),
        );
    }
    Ok(out)
}

/// Every chat handler, by data type
pub fn chat_handlers() -> Vec<(&'static str, Arc<dyn TypeHandler>)> {
    vec![
        (USER, Arc::new(UserHandler) as Arc<dyn TypeHandler>),
        (GROUP_CHAT, Arc::new(GroupChatHandler) as Arc<dyn TypeHandler>),
        (
            DIRECT_MESSAGE,
            Arc::new(FnHandler::new(direct_message_access, direct_message_deletion))
                as Arc<dyn TypeHandler>,
        ),
        (
            MESSAGE,
            Arc::new(FnHandler::new(message_access, |_, _, _| {
                Ok(DeletionDirective::delete())
            })) as Arc<dyn TypeHandler>,
        ),
    ]
}

pub fn chat_registry() -> HandlerRegistry {
    let mut registry = HandlerRegistry::new();
    for (data_type, handler) in chat_handlers() {
        registry.register(data_type, handler).unwrap();
    }
    registry
}

/// Storage primitives the chat application needs from a bundled store
pub trait ChatBackend: StorageAdapter + Sized + 'static {
    fn add_root(&self, collection: &str, document: Document) -> String;
    fn add_message(&self, chat_collection: &str, chat_id: &str, document: Document) -> String;
    fn locator(&self, data_type: &str, collection: &str, id: &str) -> Locator;
    fn update(&self, locator: &Locator, updates: &[FieldUpdate]);
    fn count(&self) -> usize;
}

impl ChatBackend for MemoryStore {
    fn add_root(&self, collection: &str, document: Document) -> String {
        self.add(&[collection], &[], document).unwrap()
    }

    fn add_message(&self, chat_collection: &str, chat_id: &str, document: Document) -> String {
        self.add(&[chat_collection, "messages"], &[chat_id], document)
            .unwrap()
    }

    fn locator(&self, data_type: &str, collection: &str, id: &str) -> Locator {
        Locator::path_document(data_type, [collection], [id])
    }

    fn update(&self, locator: &Locator, updates: &[FieldUpdate]) {
        self.update_document(locator, updates).unwrap();
    }

    fn count(&self) -> usize {
        self.document_count()
    }
}

#[cfg(feature = "sled-backend")]
impl ChatBackend for SledStore {
    fn add_root(&self, collection: &str, document: Document) -> String {
        self.insert(collection, document).unwrap()
    }

    fn add_message(&self, _chat_collection: &str, chat_id: &str, document: Document) -> String {
        self.insert("messages", document.with("chatId", chat_id))
            .unwrap()
    }

    fn locator(&self, data_type: &str, collection: &str, id: &str) -> Locator {
        Locator::flat_document(data_type, collection, id)
    }

    fn update(&self, locator: &Locator, updates: &[FieldUpdate]) {
        self.update_document(locator, updates).unwrap();
    }

    fn count(&self) -> usize {
        self.document_count()
    }
}

/// Chat application operations on top of a store
pub struct Chat<B: ChatBackend> {
    pub store: Arc<B>,
}

impl<B: ChatBackend> Chat<B> {
    pub fn new(store: B) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// Engine over the shared store with every chat handler registered
    pub fn engine(&self) -> PrivacyEngine<Arc<B>> {
        PrivacyEngine::new(self.store.clone(), chat_registry())
    }

    pub fn user(&self, id: &str) -> Locator {
        self.store.locator(USER, "users", id)
    }

    pub fn group_chat(&self, id: &str) -> Locator {
        self.store.locator(GROUP_CHAT, "gcs", id)
    }

    pub fn direct_message(&self, id: &str) -> Locator {
        self.store.locator(DIRECT_MESSAGE, "dms", id)
    }

    /// Current state of one document
    pub fn fetch(&self, locator: &Locator) -> Document {
        self.store.get_document(locator).unwrap().document
    }

    pub fn create_user(&self, name: &str) -> String {
        self.store.add_root(
            "users",
            Document::new()
                .with("name", name)
                .with("gcs", Vec::<Value>::new())
                .with("dms", BTreeMap::<String, Value>::new()),
        )
    }

    pub fn create_group_chat(&self, owner: &str) -> String {
        let gc = self.store.add_root(
            "gcs",
            Document::new()
                .with("owner", owner)
                .with("users", Vec::<Value>::new()),
        );
        self.store
            .update(&self.user(owner), &[FieldUpdate::array_union("gcs", gc.as_str())]);
        gc
    }

    pub fn join_group_chat(&self, user: &str, gc: &str) {
        self.store
            .update(&self.group_chat(gc), &[FieldUpdate::array_union("users", user)]);
        self.store
            .update(&self.user(user), &[FieldUpdate::array_union("gcs", gc)]);
    }

    pub fn quit_group_chat(&self, user: &str, gc: &str) {
        self.store
            .update(&self.group_chat(gc), &[FieldUpdate::array_remove("users", user)]);
        self.store
            .update(&self.user(user), &[FieldUpdate::array_remove("gcs", gc)]);
    }

    pub fn send_group_message(&self, user: &str, gc: &str, content: &str) -> String {
        self.store.add_message("gcs", gc, message(user, content))
    }

    pub fn create_direct_message(&self, user1: &str, user2: &str) -> String {
        let dm = self.store.add_root(
            "dms",
            Document::new().with("user1", user1).with("user2", user2),
        );
        self.store.update(
            &self.user(user1),
            &[FieldUpdate::set(format!("dms.{}", user2), dm.as_str())],
        );
        self.store.update(
            &self.user(user2),
            &[FieldUpdate::set(format!("dms.{}", user1), dm.as_str())],
        );
        dm
    }

    pub fn send_direct_message(&self, user: &str, dm: &str, content: &str) -> String {
        self.store.add_message("dms", dm, message(user, content))
    }

    /// user1 owns gc1, user2 joins, then "hello" (user1), "hi" (user2) and
    /// "how are you?" (user1) are sent to it
    pub fn seed_group_chat(&self) -> GroupChatScenario {
        let user1 = self.create_user("user1");
        let user2 = self.create_user("user2");
        let gc1 = self.create_group_chat(&user1);
        self.join_group_chat(&user2, &gc1);
        self.send_group_message(&user1, &gc1, "hello");
        self.send_group_message(&user2, &gc1, "hi");
        self.send_group_message(&user1, &gc1, "how are you?");
        GroupChatScenario { user1, user2, gc1 }
    }
}

fn message(user: &str, content: &str) -> Document {
    Document::new()
        .with("userId", user)
        .with("content", content)
        .with("timestamp", chrono::Utc::now())
}

pub struct GroupChatScenario {
    pub user1: String,
    pub user2: String,
    pub gc1: String,
}

pub fn memory_chat() -> Chat<MemoryStore> {
    Chat::new(MemoryStore::new())
}

#[cfg(feature = "sled-backend")]
pub fn sled_chat() -> Chat<SledStore> {
    Chat::new(SledStore::temporary().unwrap())
}
