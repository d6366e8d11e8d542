//! Users and tags: the people who work tickets and the labels they apply.

mod service;
mod store;
mod types;

pub use service::DirectoryService;
pub use store::{DirectoryError, DirectoryStore};
pub use types::{
    is_hex_color, NewTag, NewUser, Tag, User, UserPatch, DEFAULT_ROLE, DEFAULT_TAG_COLOR,
    SYSTEM_ROLE,
};
