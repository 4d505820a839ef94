//! 测试工具：内存字节源与合成索引构建

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use reqwest::StatusCode;

use crate::core::error::{GalleryError, Result};
use crate::index::node::{IndexNode, PostingPointer};
use crate::interfaces::{ByteRange, RangeSource};

/// 内存字节源，按 URL (忽略查询串) 提供内容并遵循 Range 语义
#[derive(Default)]
pub struct MemorySource {
    files: RwLock<HashMap<String, Bytes>>,
    failures: RwLock<HashMap<String, StatusCode>>,
    hits: RwLock<HashMap<String, usize>>,
    total: AtomicUsize,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: &str, body: impl Into<Bytes>) {
        self.files.write().insert(url.to_string(), body.into());
    }

    pub fn fail(&self, url: &str, status: StatusCode) {
        self.failures.write().insert(url.to_string(), status);
    }

    pub fn hits(&self, url: &str) -> usize {
        self.hits.read().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RangeSource for MemorySource {
    async fn fetch(&self, url: &str, range: Option<ByteRange>) -> Result<Bytes> {
        let key = url.split('?').next().unwrap_or(url).to_string();
        self.total.fetch_add(1, Ordering::SeqCst);
        *self.hits.write().entry(key.clone()).or_default() += 1;

        if let Some(status) = self.failures.read().get(&key) {
            return Err(GalleryError::Transport {
                url: url.to_string(),
                status: *status,
            });
        }

        let body = self
            .files
            .read()
            .get(&key)
            .cloned()
            .ok_or_else(|| GalleryError::Transport {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })?;

        match range {
            None => Ok(body),
            Some(r) => {
                let len = body.len() as u64;
                if r.start >= len {
                    return Err(GalleryError::Transport {
                        url: url.to_string(),
                        status: StatusCode::RANGE_NOT_SATISFIABLE,
                    });
                }
                let end = r.end.min(len - 1);
                Ok(body.slice(r.start as usize..=end as usize))
            }
        }
    }
}

/// 大端序 ID 列表 (nozomi 列表格式)
pub fn id_feed(ids: &[u32]) -> Vec<u8> {
    ids.iter().flat_map(|id| id.to_be_bytes()).collect()
}

/// 带计数前缀的倒排表
pub fn posting_block(ids: &[u32]) -> Vec<u8> {
    let mut out = (ids.len() as u32).to_be_bytes().to_vec();
    out.extend(id_feed(ids));
    out
}

/// 合成索引构建器：节点按固定块大小依次排布，倒排表追加写入数据文件
pub struct TreeBuilder {
    pub block: usize,
    pub index: Vec<u8>,
    pub data: Vec<u8>,
}

impl TreeBuilder {
    pub fn new(block: usize) -> Self {
        Self {
            block,
            index: Vec::new(),
            data: Vec::new(),
        }
    }

    /// 追加一个倒排表，返回其指针
    pub fn posting(&mut self, ids: &[u32]) -> PostingPointer {
        let block = posting_block(ids);
        let pointer = PostingPointer {
            offset: self.data.len() as u64,
            length: block.len() as u32,
        };
        self.data.extend(block);
        pointer
    }

    /// 在指定槽位写入节点，返回其地址
    pub fn place(&mut self, slot: usize, node: &IndexNode) -> u64 {
        let address = slot * self.block;
        let encoded = node.encode();
        assert!(encoded.len() <= self.block, "node exceeds block size");
        if self.index.len() < address + self.block {
            self.index.resize(address + self.block, 0);
        }
        self.index[address..address + encoded.len()].copy_from_slice(&encoded);
        address as u64
    }
}

/// 最小 gg 脚本：类别 17 偏移 1，其余偏移 0
pub const GG_SCRIPT: &str =
    "var o = 0; switch (g) { case 17: o = 1; break; } b: '1700000000/'";

/// 画廊详情脚本，首个文件使用给定哈希
pub fn gallery_script(id: u32, hash: &str) -> String {
    format!(
        r#"var galleryinfo = {{"id":"{id}","title":"Gallery {id}","galleryurl":"/doujinshi/g-{id}.html","type":"doujinshi","language":"english","date":"2023-04-05 06:07:08-05","files":[{{"hash":"{hash}"}},{{"hash":"0000000000a"}}],"tags":[{{"tag":"glasses","female":"1"}},{{"tag":"full color"}}],"artists":[{{"artist":"some artist"}}],"groups":[{{"group":"circle one"}}],"parodys":[{{"parody":"original"}}],"characters":null}}"#
    )
}
