//! 画廊检索引擎 (Gallery Index)
//!
//! 通过 HTTP 范围读取远程哈希树索引与倒排表，组合检索结果并映射为可展示的画廊条目。

pub mod core;
pub mod engine;
pub mod index;
pub mod interfaces;
pub mod network;
pub mod search;
pub mod shard;
pub mod ui;

#[cfg(test)]
mod testing;
