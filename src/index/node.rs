//! 索引节点编解码 (Index Node Codec)
//!
//! ## 块格式 (大端序)
//!
//! ```text
//! [Key Count: u32]
//! For each key:
//!   [Key Length: u32]   1..=32
//!   [Key: bytes]
//! [Posting Count: u32]
//! For each posting:
//!   [Offset: u64]
//!   [Length: u32]
//! [Child Address: u64] x 17   (0 表示无子节点)
//! ```
//!
//! 固定字段读取完毕即停止，块尾多余字节忽略。

use std::io::{Cursor, Read};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::core::error::{GalleryError, Result};

/// 单个键的最大字节数
pub const MAX_KEY_LEN: usize = 32;

/// 每个节点固定的子节点地址数量
pub const CHILD_COUNT: usize = 17;

/// 倒排表在数据文件中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PostingPointer {
    pub offset: u64,
    pub length: u32,
}

/// 多路搜索树节点
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexNode {
    pub keys: Vec<Vec<u8>>,
    pub postings: Vec<PostingPointer>,
    pub children: [u64; CHILD_COUNT],
}

impl IndexNode {
    /// 叶子节点：所有子节点地址均为 0
    pub fn is_leaf(&self) -> bool {
        self.children.iter().all(|&addr| addr == 0)
    }

    /// 键数与倒排指针数是否一致
    ///
    /// 解码不强制该约束，仅供校验使用。
    pub fn is_consistent(&self) -> bool {
        self.keys.len() == self.postings.len()
    }

    /// 解码固定布局的节点块
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut cursor = Cursor::new(data);

        let key_count = read_u32(&mut cursor, "key count")?;
        let mut keys = Vec::with_capacity((key_count as usize).min(CHILD_COUNT));
        for i in 0..key_count {
            let key_len = read_u32(&mut cursor, "key length")? as usize;
            if key_len == 0 || key_len > MAX_KEY_LEN {
                return Err(GalleryError::corrupt(format!(
                    "key #{} has invalid length {}",
                    i, key_len
                )));
            }
            let mut key = vec![0u8; key_len];
            cursor
                .read_exact(&mut key)
                .map_err(|_| GalleryError::corrupt(format!("key #{} truncated", i)))?;
            keys.push(key);
        }

        let posting_count = read_u32(&mut cursor, "posting count")?;
        let mut postings = Vec::with_capacity((posting_count as usize).min(CHILD_COUNT));
        for _ in 0..posting_count {
            let offset = read_u64(&mut cursor, "posting offset")?;
            let length = read_u32(&mut cursor, "posting length")?;
            postings.push(PostingPointer { offset, length });
        }

        let mut children = [0u64; CHILD_COUNT];
        for child in children.iter_mut() {
            *child = read_u64(&mut cursor, "child address")?;
        }

        Ok(Self {
            keys,
            postings,
            children,
        })
    }

    /// 按解码格式重新编码
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        // Vec<u8> 写入不会失败
        let _ = self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut Vec<u8>) -> std::io::Result<()> {
        out.write_u32::<BigEndian>(self.keys.len() as u32)?;
        for key in &self.keys {
            out.write_u32::<BigEndian>(key.len() as u32)?;
            out.extend_from_slice(key);
        }
        out.write_u32::<BigEndian>(self.postings.len() as u32)?;
        for posting in &self.postings {
            out.write_u64::<BigEndian>(posting.offset)?;
            out.write_u32::<BigEndian>(posting.length)?;
        }
        for child in &self.children {
            out.write_u64::<BigEndian>(*child)?;
        }
        Ok(())
    }
}

fn read_u32(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u32> {
    cursor
        .read_u32::<BigEndian>()
        .map_err(|_| GalleryError::corrupt(format!("node truncated at {}", field)))
}

fn read_u64(cursor: &mut Cursor<&[u8]>, field: &str) -> Result<u64> {
    cursor
        .read_u64::<BigEndian>()
        .map_err(|_| GalleryError::corrupt(format!("node truncated at {}", field)))
}
