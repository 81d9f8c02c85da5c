//! Partitioning of a record sequence into ordered, non-overlapping batches.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::record::Record;

/// Position metadata sent alongside each batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchInfo {
    /// 1-based batch number.
    pub current: usize,
    pub total: usize,
    pub size: usize,
}

/// A contiguous slice of the validated records.
#[derive(Debug, Clone, Copy)]
pub struct Batch<'a> {
    /// 1-based batch number.
    pub index: usize,
    pub total: usize,
    /// Position of the first record in the full sequence.
    pub offset: usize,
    pub records: &'a [Record],
}

impl<'a> Batch<'a> {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_last(&self) -> bool {
        self.index == self.total
    }

    pub fn info(&self) -> BatchInfo {
        BatchInfo {
            current: self.index,
            total: self.total,
            size: self.records.len(),
        }
    }

    /// `params` merged with `data` and `batchInfo`; the batch keys win.
    pub fn payload(&self, params: &Map<String, Value>) -> Result<Value, serde_json::Error> {
        let mut body = params.clone();
        body.insert("data".into(), serde_json::to_value(self.records)?);
        body.insert("batchInfo".into(), serde_json::to_value(self.info())?);
        Ok(Value::Object(body))
    }
}

/// Number of batches needed for `len` records.
pub fn batch_count(len: usize, batch_size: usize) -> usize {
    len.div_ceil(batch_size)
}

/// Split `records` into batches of `batch_size` (last one may be shorter).
///
/// # Panics
/// If `batch_size` is zero; callers validate options first.
pub fn partition(records: &[Record], batch_size: usize) -> impl Iterator<Item = Batch<'_>> {
    let total = batch_count(records.len(), batch_size);
    records
        .chunks(batch_size)
        .enumerate()
        .map(move |(i, chunk)| Batch {
            index: i + 1,
            total,
            offset: i * batch_size,
            records: chunk,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(n: usize) -> Vec<Record> {
        (0..n)
            .map(|i| Record::new().with("number", format!("R{i}")))
            .collect()
    }

    #[test]
    fn partition_sizes_450_by_200() {
        let recs = records(450);
        let sizes: Vec<usize> = partition(&recs, 200).map(|b| b.len()).collect();
        assert_eq!(sizes, vec![200, 200, 50]);
    }

    #[test]
    fn partition_is_lossless_and_ordered() {
        for (n, size) in [(1, 1), (7, 3), (9, 3), (10, 200), (401, 200)] {
            let recs = records(n);
            let batches: Vec<_> = partition(&recs, size).collect();
            assert_eq!(batches.len(), batch_count(n, size));
            assert_eq!(batches.len(), (n + size - 1) / size);

            let rebuilt: Vec<Record> = batches
                .iter()
                .flat_map(|b| b.records.iter().cloned())
                .collect();
            assert_eq!(rebuilt, recs);

            for b in &batches {
                assert_eq!(&recs[b.offset..b.offset + b.len()], b.records);
            }
            assert!(batches.last().unwrap().is_last());
        }
    }

    #[test]
    fn payload_merges_params() {
        let recs = records(2);
        let batch = partition(&recs, 5).next().unwrap();
        let mut params = Map::new();
        params.insert("flowId".into(), json!("z244yolix5cg9meb"));
        params.insert("action".into(), json!("materials_excel"));
        params.insert("data".into(), json!("overwritten"));

        let payload = batch.payload(&params).unwrap();
        assert_eq!(payload["flowId"], "z244yolix5cg9meb");
        assert_eq!(payload["data"].as_array().unwrap().len(), 2);
        assert_eq!(payload["data"][1]["number"], "R1");
        assert_eq!(payload["batchInfo"], json!({"current": 1, "total": 1, "size": 2}));
    }
}
