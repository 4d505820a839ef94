//! 倒排表与列表文件读取
//!
//! - 倒排表：`[Count: u32 BE][ID: u32 BE] x Count`，长度必须恰好为 `4 + 4 * Count`
//! - nozomi 列表：无前缀的 `u32 BE` 序列，保持文件内顺序

use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};
use indexmap::IndexSet;
use tracing::debug;

use crate::core::error::{GalleryError, Result};
use crate::index::node::PostingPointer;
use crate::interfaces::{ByteRange, RangeSource};

/// 有序去重的画廊 ID 集合
pub type IdSet = IndexSet<u32>;

/// 倒排表读取器
pub struct PostingListReader<'a> {
    source: &'a dyn RangeSource,
    data_url: &'a str,
    max_bytes: u32,
    max_count: u32,
}

impl<'a> PostingListReader<'a> {
    pub fn new(source: &'a dyn RangeSource, data_url: &'a str, max_bytes: u32, max_count: u32) -> Self {
        Self {
            source,
            data_url,
            max_bytes,
            max_count,
        }
    }

    /// 按指针范围读取并解码倒排表
    pub async fn read(&self, pointer: PostingPointer) -> Result<IdSet> {
        if pointer.length == 0 || pointer.length > self.max_bytes {
            return Err(GalleryError::corrupt(format!(
                "posting length {} outside [1, {}]",
                pointer.length, self.max_bytes
            )));
        }

        let range = ByteRange::with_len(pointer.offset, pointer.length as u64)
            .ok_or_else(|| GalleryError::corrupt(format!("posting offset {} overflows", pointer.offset)))?;

        debug!("读取倒排表: {} @ {}", self.data_url, range.header_value());
        let bytes = self.source.fetch(self.data_url, Some(range)).await?;
        if bytes.len() as u64 != range.len() {
            return Err(GalleryError::corrupt(format!(
                "short posting read: got {} of {} bytes",
                bytes.len(),
                range.len()
            )));
        }
        decode_postings(&bytes, self.max_count)
    }
}

/// 解码带计数前缀的倒排表
pub fn decode_postings(bytes: &[u8], max_count: u32) -> Result<IdSet> {
    let mut cursor = Cursor::new(bytes);
    let count = cursor
        .read_u32::<BigEndian>()
        .map_err(|_| GalleryError::corrupt("posting list shorter than its count prefix"))?;

    if count == 0 || count > max_count {
        return Err(GalleryError::corrupt(format!(
            "posting count {} outside [1, {}]",
            count, max_count
        )));
    }

    let expected = 4 + 4 * count as usize;
    if bytes.len() != expected {
        return Err(GalleryError::corrupt(format!(
            "posting list is {} bytes, expected {}",
            bytes.len(),
            expected
        )));
    }

    let mut ids = IdSet::with_capacity(count as usize);
    for _ in 0..count {
        // 长度已校验，读取不会越界
        let id = cursor
            .read_u32::<BigEndian>()
            .map_err(|_| GalleryError::corrupt("posting list truncated"))?;
        ids.insert(id);
    }

    if ids.len() != count as usize {
        return Err(GalleryError::corrupt(format!(
            "posting list declares {} ids but holds {} unique",
            count,
            ids.len()
        )));
    }

    Ok(ids)
}

/// 解码 nozomi 列表 (按文件顺序，重复 ID 只保留首次出现)
pub fn decode_feed(bytes: &[u8]) -> Result<IdSet> {
    if bytes.len() % 4 != 0 {
        return Err(GalleryError::corrupt(format!(
            "id feed length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(bytes);
    let mut ids = IdSet::with_capacity(bytes.len() / 4);
    while let Ok(id) = cursor.read_u32::<BigEndian>() {
        ids.insert(id);
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{id_feed, posting_block, MemorySource};

    #[test]
    fn decodes_exact_posting_list() {
        let ids = decode_postings(&posting_block(&[7, 3, 11]), 10_000_000).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![7, 3, 11]);
    }

    #[test]
    fn length_mismatch_is_corrupt() {
        let mut block = posting_block(&[1, 2]);
        block.extend([0, 0, 0, 9]);
        assert!(matches!(
            decode_postings(&block, 10_000_000),
            Err(GalleryError::CorruptIndex(_))
        ));
        assert!(decode_postings(&block[..8], 10_000_000).is_err());
    }

    #[test]
    fn zero_or_excessive_count_is_corrupt() {
        assert!(decode_postings(&0u32.to_be_bytes(), 10).is_err());
        assert!(decode_postings(&posting_block(&[1, 2, 3]), 2).is_err());
    }

    #[test]
    fn duplicate_ids_are_corrupt() {
        assert!(decode_postings(&posting_block(&[5, 5]), 10).is_err());
    }

    #[test]
    fn feed_keeps_file_order() {
        let ids = decode_feed(&id_feed(&[30, 10, 20, 10])).unwrap();
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec![30, 10, 20]);
        assert!(decode_feed(&[0, 0, 0]).is_err());
        assert!(decode_feed(&[]).unwrap().is_empty());
    }

    #[tokio::test]
    async fn reader_rejects_out_of_bound_lengths_without_fetching() {
        let source = MemorySource::new();
        let reader = PostingListReader::new(&source, "https://ltn.test/data", 100_000_000, 10_000_000);

        for length in [0u32, 100_000_001] {
            let err = reader
                .read(PostingPointer { offset: 0, length })
                .await
                .unwrap_err();
            assert!(matches!(err, GalleryError::CorruptIndex(_)));
        }
        assert_eq!(source.total_hits(), 0);
    }

    #[tokio::test]
    async fn reader_fetches_pointer_range() {
        let source = MemorySource::new();
        let mut data = posting_block(&[1, 2]);
        let offset = data.len() as u64;
        data.extend(posting_block(&[9, 8, 7]));
        source.insert("https://ltn.test/data", data);

        let reader = PostingListReader::new(&source, "https://ltn.test/data", 100_000_000, 10_000_000);
        let ids = reader
            .read(PostingPointer { offset, length: 16 })
            .await
            .unwrap();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains(&8));
    }

    #[tokio::test]
    async fn short_range_read_is_corrupt() {
        let source = MemorySource::new();
        source.insert("https://ltn.test/data", posting_block(&[1, 2]));

        let reader = PostingListReader::new(&source, "https://ltn.test/data", 100_000_000, 10_000_000);
        let err = reader
            .read(PostingPointer { offset: 0, length: 16 })
            .await
            .unwrap_err();
        assert!(matches!(err, GalleryError::CorruptIndex(_)));
    }
}
