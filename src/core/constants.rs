//! Shared constants used across the application

/// Default chat-completion endpoint base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Model requested when neither the config file nor the CLI overrides it.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Upper bound on tokens requested per completion.
pub const MAX_TOKENS: u32 = 1000;

/// Sampling temperature sent with every request.
pub const TEMPERATURE: f32 = 0.7;

/// Instruction prefixed to every conversation before capability clauses.
pub const BASE_INSTRUCTION: &str = "You are a helpful AI assistant.";

/// Service name under which keyring entries are registered.
pub const KEYRING_SERVICE: &str = "causerie";

/// Environment variable consulted when no API key is stored.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";
