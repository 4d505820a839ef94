//! 远程多路搜索树查找 (Tree Searcher)
//!
//! 每一层按固定块大小范围读取节点，节点内线性扫描，首个 `>=` 目标的键决定命中或下行方向。

use std::cmp::Ordering;

use tracing::debug;

use crate::core::error::{GalleryError, Result};
use crate::index::node::{IndexNode, PostingPointer};
use crate::interfaces::{ByteRange, RangeSource};

/// 下行深度上限，防止损坏的子节点地址形成环
const MAX_DEPTH: usize = 64;

/// 节点内定位结果
#[derive(Debug, PartialEq, Eq)]
enum Located {
    Found(usize),
    Descend(usize),
}

/// 无符号逐字节比较，严格前缀视为更小
pub fn compare_keys(a: &[u8], b: &[u8]) -> Ordering {
    a.cmp(b)
}

fn locate(key: &[u8], node: &IndexNode) -> Located {
    for (i, candidate) in node.keys.iter().enumerate() {
        match compare_keys(key, candidate) {
            Ordering::Equal => return Located::Found(i),
            Ordering::Less => return Located::Descend(i),
            Ordering::Greater => {}
        }
    }
    Located::Descend(node.keys.len())
}

pub struct TreeSearcher<'a> {
    source: &'a dyn RangeSource,
    index_url: &'a str,
    node_size: u64,
}

impl<'a> TreeSearcher<'a> {
    pub fn new(source: &'a dyn RangeSource, index_url: &'a str, node_size: u64) -> Self {
        Self {
            source,
            index_url,
            node_size,
        }
    }

    /// 读取并解码指定地址处的节点
    pub async fn node_at(&self, address: u64) -> Result<IndexNode> {
        let range = ByteRange::with_len(address, self.node_size)
            .ok_or_else(|| GalleryError::corrupt(format!("node address {} overflows", address)))?;
        let bytes = self.source.fetch(self.index_url, Some(range)).await?;
        IndexNode::decode(&bytes)
    }

    /// 自根节点下行查找键对应的倒排指针
    pub async fn search(&self, key: &[u8], root: u64) -> Result<Option<PostingPointer>> {
        let mut address = root;

        for depth in 0..MAX_DEPTH {
            let node = self.node_at(address).await?;
            if node.keys.is_empty() {
                return Ok(None);
            }

            let slot = match locate(key, &node) {
                Located::Found(i) => {
                    let pointer = node.postings.get(i).copied().ok_or_else(|| {
                        GalleryError::corrupt(format!("key #{} at {} has no posting pointer", i, address))
                    })?;
                    debug!("命中索引键: depth={} address={}", depth, address);
                    return Ok(Some(pointer));
                }
                Located::Descend(i) => i,
            };

            if node.is_leaf() {
                return Ok(None);
            }

            match node.children.get(slot).copied() {
                Some(0) | None => return Ok(None),
                Some(child) => address = child,
            }
        }

        Err(GalleryError::corrupt(format!(
            "tree descent exceeded {} levels",
            MAX_DEPTH
        )))
    }
}
