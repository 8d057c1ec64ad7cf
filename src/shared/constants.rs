/// Maximum characters kept from an AI reply
pub const MAX_AI_RESPONSE_CHARS: usize = 500;

/// Default cap for extracted attachment text (uploads, OCR)
pub const MAX_EXTRACT_CHARS: usize = 1000;

/// Cap for each referenced attachment when building a message prompt
pub const MAX_ATTACHMENT_PROMPT_CHARS: usize = 4000;

/// Characters of the opening prompt used to title an upload-initiated chat
pub const TITLE_PROMPT_PREFIX_CHARS: usize = 500;

/// Number of memory entries kept per chat (10 exchanges)
pub const MEMORY_WINDOW: usize = 20;

/// Name given to chats until they are titled
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Title used when the title model fails
pub const UNTITLED_CHAT_NAME: &str = "Untitled Chat";

/// Reply shown when the provider returns no choices
pub const AI_NO_RESPONSE_MESSAGE: &str = "⚠️ No response from AI.";

/// Reply shown when the provider cannot be reached or answers garbage
pub const AI_ERROR_MESSAGE: &str = "⚠️ Error contacting AI.";

// =============================================================================
// COOKIES
// =============================================================================

/// Session cookie carrying the signed session token
pub const SESSION_COOKIE: &str = "mirai_session";

/// Short-lived cookie carrying flash messages across a redirect
pub const FLASH_COOKIE: &str = "mirai_flash";
