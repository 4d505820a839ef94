//! CDN 分片解析 (Shard Resolution)

pub mod resolver;

pub use resolver::{ShardConfig, ShardResolver, image_id_from_hash, thumb_path_from_hash};
