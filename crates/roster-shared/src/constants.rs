/// Group that receives buddies added without an explicit group.
pub const DEFAULT_BUDDY_GROUP: &str = "Buddies";

/// Group that receives chats added without an explicit group.
pub const DEFAULT_CHAT_GROUP: &str = "Chats";

/// File name of the persisted buddy list inside the data directory.
pub const BLIST_FILE_NAME: &str = "blist.xml";

/// Version attribute written on the document root.
pub const BLIST_DOCUMENT_VERSION: &str = "1.0";

/// Delay between the first unsaved change and the write to disk, in milliseconds.
pub const SAVE_DELAY_MS: u64 = 5_000;

/// Period of the autosave task's deadline check, in milliseconds.
pub const AUTOSAVE_POLL_MS: u64 = 1_000;

/// Int setting holding the unix time a buddy was last seen online.
pub const LAST_SEEN_SETTING: &str = "last_seen";

/// Default chat component used to identify a room.
pub const DEFAULT_CHAT_IDENTIFIER: &str = "channel";

/// String setting under which a buddy's icon reference is persisted.
pub const BUDDY_ICON_SETTING: &str = "buddy_icon";
