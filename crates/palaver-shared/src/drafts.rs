//! Draft constructors for local content producers.
//!
//! Each producer (camera, gallery, file picker, catalog, GIF picker) hands
//! the synchronizer a fully-formed kind-specific payload.  The functions
//! here encode the producer defaults; they never touch ids or timestamps,
//! which are minted by the synchronizer at merge time.

use rand::seq::SliceRandom;

use crate::constants::{
    CATALOG_ITEMS, CATALOG_TITLE, DEFAULT_PHOTO_HEIGHT, DEFAULT_PHOTO_WIDTH,
    DEFAULT_VIDEO_HEIGHT, DEFAULT_VIDEO_WIDTH, SAMPLE_GIF_URLS,
};
use crate::message::MessageBody;
use crate::time::format_file_size;

/// A typed text message.
pub fn text(text: impl Into<String>) -> MessageBody {
    MessageBody::Text { text: text.into() }
}

/// A photo from the camera or gallery.  Dimensions fall back to the
/// camera defaults when the producer reports none.
pub fn photo(uri: impl Into<String>, width: Option<u32>, height: Option<u32>) -> MessageBody {
    MessageBody::Image {
        uri: uri.into(),
        width: width.unwrap_or(DEFAULT_PHOTO_WIDTH),
        height: height.unwrap_or(DEFAULT_PHOTO_HEIGHT),
    }
}

/// A video picked from the gallery.
pub fn video(uri: impl Into<String>, width: Option<u32>, height: Option<u32>) -> MessageBody {
    MessageBody::Video {
        uri: uri.into(),
        width: width.unwrap_or(DEFAULT_VIDEO_WIDTH),
        height: height.unwrap_or(DEFAULT_VIDEO_HEIGHT),
    }
}

/// An attached document.  `name` falls back to a generic file name and the
/// byte count is rendered human-readable.
pub fn document(uri: impl Into<String>, name: Option<String>, size_bytes: u64) -> MessageBody {
    MessageBody::File {
        uri: uri.into(),
        file_name: name.unwrap_or_else(|| "document.pdf".to_string()),
        file_size: format_file_size(size_bytes),
    }
}

/// The canned catalog entry.
pub fn catalog_entry() -> MessageBody {
    MessageBody::Catalog {
        title: CATALOG_TITLE.to_string(),
        items: CATALOG_ITEMS,
    }
}

/// A random canned GIF.
pub fn random_gif() -> MessageBody {
    let uri = SAMPLE_GIF_URLS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(SAMPLE_GIF_URLS[0]);
    MessageBody::Gif {
        uri: uri.to_string(),
    }
}
