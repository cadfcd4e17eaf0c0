pub mod collection;
pub mod file;
pub mod media;
pub mod shared;
pub mod style;
pub mod user;

pub use collection::{Collection, CollectionItem};
pub use file::StoredFile;
pub use media::{MediaAsset, MediaKind};
pub use shared::SharedCollection;
pub use style::ImageStyle;
pub use user::User;
