//! 目录引擎：宿主契约实现与画廊详情映射

pub mod catalog;
pub mod gallery;

pub use catalog::GalleryCatalog;
pub use gallery::GalleryClient;
