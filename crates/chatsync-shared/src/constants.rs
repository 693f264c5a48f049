/// Application name
pub const APP_NAME: &str = "chatsync";

/// Maximum characters kept in a conversation's last-message preview
pub const PREVIEW_MAX_CHARS: usize = 60;

/// Default HTTP API port (server)
pub const DEFAULT_HTTP_PORT: u16 = 8080;

/// Path of the WebSocket push endpoint
pub const WS_PATH: &str = "/ws";

/// Query parameter carrying the bearer token on WebSocket upgrades
pub const WS_TOKEN_PARAM: &str = "token";

/// Size in bytes of an issued bearer token before hex encoding
pub const TOKEN_BYTES: usize = 32;
