#![forbid(unsafe_code)]

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod error;
pub mod settings;

pub mod util {
    pub mod crc;
    pub mod naming;
}

pub mod crypto {
    pub mod aead;
    pub mod kdf;
}

pub mod codec {
    pub mod deflate;
}

pub mod archive {
    pub mod blob;
    pub mod stream;
}

pub mod index {
    pub mod entry;
    pub mod store;
}

pub mod engine {
    pub mod backup;
    pub mod message;
    pub mod restore;
    pub(crate) mod manager;
    pub(crate) mod worker;
}

pub use crate::error::{BksError, Result};

pub use crate::settings::{DEFAULT_CHUNK_SIZE, Limit, Settings};

pub use crate::engine::backup::backup;
pub use crate::engine::message::{ControlMessage, ViewEvent};
pub use crate::engine::restore::restore;

pub use crate::index::entry::{DirEntry, EntryKind};
pub use crate::index::store::INDEX_FILE_NAME;

pub mod prelude {
    pub use crate::Result;
    pub use crate::engine::backup::backup;
    pub use crate::engine::message::{ControlMessage, ViewEvent};
    pub use crate::engine::restore::restore;
    pub use crate::settings::{DEFAULT_CHUNK_SIZE, Limit, Settings};
}
