use at_core::{Batch, BatchMetadata, Item};
use serde_json::Value;

use crate::traits::Batcher;

/// Puts every surviving Item into a single Batch (spec.md §8 scenario 1).
pub struct SingleBatcher {
    title: String,
    metadata: BatchMetadata,
}

impl Batcher for SingleBatcher {
    fn batch(&self, items: Vec<Item>) -> anyhow::Result<Vec<Batch>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        Ok(vec![Batch {
            title: self.title.clone(),
            items,
            metadata: self.metadata.clone(),
        }])
    }
}

pub fn single(params: &Value) -> anyhow::Result<Box<dyn Batcher>> {
    let metadata: BatchMetadata = params
        .get("metadata")
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    let title = params
        .get("metadata")
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("single batcher requires metadata.title"))?
        .to_string();
    Ok(Box::new(SingleBatcher { title, metadata }))
}

/// Splits items into `chunk_size`-sized batches, titled `"[idx/total] <title>"`
/// (spec.md §8 scenario 2). If `chunk_size` would produce more than
/// `max_chunks` batches, the chunk size is grown to the minimum that fits —
/// matching `original_source/autotransform/batcher/chunk.py`'s
/// `ChunkBatcher.batch`.
pub struct ChunkBatcher {
    chunk_size: usize,
    max_chunks: Option<usize>,
    metadata: BatchMetadata,
    title: String,
}

impl Batcher for ChunkBatcher {
    fn batch(&self, items: Vec<Item>) -> anyhow::Result<Vec<Batch>> {
        if items.is_empty() {
            return Ok(Vec::new());
        }
        let mut chunk_size = self.chunk_size.max(1);
        if let Some(max_chunks) = self.max_chunks {
            let needed = items.len().div_ceil(chunk_size);
            if needed > max_chunks {
                chunk_size = items.len().div_ceil(max_chunks);
            }
        }

        let chunks: Vec<Vec<Item>> = items
            .chunks(chunk_size)
            .map(|c| c.to_vec())
            .collect();
        let total = chunks.len();

        Ok(chunks
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| Batch {
                title: format!("[{}/{total}] {}", idx + 1, self.title),
                items: chunk,
                metadata: self.metadata.clone(),
            })
            .collect())
    }
}

pub fn chunk(params: &Value) -> anyhow::Result<Box<dyn Batcher>> {
    let chunk_size = params
        .get("chunk_size")
        .and_then(Value::as_u64)
        .ok_or_else(|| anyhow::anyhow!("chunk batcher requires 'chunk_size'"))? as usize;
    let max_chunks = params.get("max_chunks").and_then(Value::as_u64).map(|n| n as usize);
    let metadata: BatchMetadata = params
        .get("metadata")
        .cloned()
        .map(serde_json::from_value)
        .transpose()?
        .unwrap_or_default();
    let title = params
        .get("metadata")
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("chunk batcher requires metadata.title"))?
        .to_string();
    Ok(Box::new(ChunkBatcher {
        chunk_size,
        max_chunks,
        metadata,
        title,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items(n: usize) -> Vec<Item> {
        (0..n).map(|i| Item::new(format!("item-{i}"))).collect()
    }

    #[test]
    fn chunk_batcher_respects_max_chunks() {
        let batcher = ChunkBatcher {
            chunk_size: 2,
            max_chunks: Some(2),
            metadata: BatchMetadata::default(),
            title: "t".into(),
        };
        let batches = batcher.batch(items(5)).unwrap();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].items.len(), 3);
        assert_eq!(batches[1].items.len(), 2);
        assert_eq!(batches[0].title, "[1/2] t");
        assert_eq!(batches[1].title, "[2/2] t");
    }

    #[test]
    fn chunk_batcher_without_cap_uses_chunk_size_directly() {
        let batcher = ChunkBatcher {
            chunk_size: 2,
            max_chunks: None,
            metadata: BatchMetadata::default(),
            title: "t".into(),
        };
        let batches = batcher.batch(items(5)).unwrap();
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[2].items.len(), 1);
    }

    #[test]
    fn single_batcher_is_empty_on_no_items() {
        let batcher = SingleBatcher {
            title: "t".into(),
            metadata: BatchMetadata::default(),
        };
        assert!(batcher.batch(Vec::new()).unwrap().is_empty());
    }
}
