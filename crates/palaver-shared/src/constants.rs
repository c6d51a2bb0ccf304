/// Application name
pub const APP_NAME: &str = "Palaver";

/// Fixed id of the synthesized welcome message written into an empty history.
pub const SEED_MESSAGE_ID: &str = "1";

/// Body of the welcome message.
pub const SEED_MESSAGE_TEXT: &str = "Hello! How can I help you today?";

/// Default realtime channel (topic) name.
pub const DEFAULT_CHANNEL_NAME: &str = "chat-channel";

/// Default event name published on the channel for new messages.
pub const DEFAULT_EVENT_NAME: &str = "new-message";

/// Fallback width/height for camera photos with no reported dimensions.
pub const DEFAULT_PHOTO_WIDTH: u32 = 300;
pub const DEFAULT_PHOTO_HEIGHT: u32 = 400;

/// Fallback width/height for picked videos with no reported dimensions.
pub const DEFAULT_VIDEO_WIDTH: u32 = 300;
pub const DEFAULT_VIDEO_HEIGHT: u32 = 200;

/// Canned GIF urls offered by the demo GIF picker.
pub const SAMPLE_GIF_URLS: [&str; 3] = [
    "https://media.giphy.com/media/3o7aCTPPm4OHfRLSH6/giphy.gif",
    "https://media.giphy.com/media/l0MYC0LajbaPoEADu/giphy.gif",
    "https://media.giphy.com/media/3o7abKhOpu0NwenH3O/giphy.gif",
];

/// Title and item count of the demo catalog entry.
pub const CATALOG_TITLE: &str = "Product Catalog";
pub const CATALOG_ITEMS: u32 = 25;
