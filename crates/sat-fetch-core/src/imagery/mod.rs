pub mod source;
pub mod static_map;
pub mod writer;

pub use source::ImageSource;
pub use static_map::StaticImageSource;
pub use writer::{persist_image, PersistResult};
