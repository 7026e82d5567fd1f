// ============================================================
// Layer 6 — Prediction Dump
// ============================================================
// Writes the tensors collected during the final evaluation to
// JSON so they can be inspected offline. Each tensor is stored
// row-major together with its shape.

use anyhow::{Context, Result};
use burn::prelude::*;
use serde::{Deserialize, Serialize};
use std::{fs, path::Path};

use crate::ml::trainer::CollectedPredictions;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpedTensor<T> {
    pub shape:  Vec<usize>,
    pub values: Vec<T>,
}

impl DumpedTensor<f32> {
    fn from_float<B: Backend, const D: usize>(t: &Tensor<B, D>) -> Result<Self> {
        let data = t.clone().into_data().convert::<f32>();
        let shape = data.shape.clone();
        let values = data
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read float tensor: {:?}", e))?;
        Ok(Self { shape, values })
    }
}

impl DumpedTensor<i64> {
    fn from_int<B: Backend, const D: usize>(t: &Tensor<B, D, Int>) -> Result<Self> {
        let data = t.clone().into_data().convert::<i64>();
        let shape = data.shape.clone();
        let values = data
            .to_vec::<i64>()
            .map_err(|e| anyhow::anyhow!("Cannot read int tensor: {:?}", e))?;
        Ok(Self { shape, values })
    }
}

/// One entry per evaluated batch in every list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PredictionDump {
    /// Type logits: [batch, steps, num_types]
    pub pred_type: Vec<DumpedTensor<f32>>,
    /// 0-indexed next types, −1 on padding: [batch, steps]
    pub true_type: Vec<DumpedTensor<i64>>,
    pub pred_time: Vec<DumpedTensor<f32>>,
    pub true_time: Vec<DumpedTensor<f32>>,
}

impl PredictionDump {
    pub fn from_collected<B: Backend>(collected: &CollectedPredictions<B>) -> Result<Self> {
        Ok(Self {
            pred_type: collected.pred_type.iter().map(DumpedTensor::<f32>::from_float).collect::<Result<_>>()?,
            true_type: collected.true_type.iter().map(DumpedTensor::<i64>::from_int).collect::<Result<_>>()?,
            pred_time: collected.pred_time.iter().map(DumpedTensor::<f32>::from_float).collect::<Result<_>>()?,
            true_time: collected.true_time.iter().map(DumpedTensor::<f32>::from_float).collect::<Result<_>>()?,
        })
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string(self)?;
        fs::write(path, json)
            .with_context(|| format!("Cannot write predictions to '{}'", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::testing::TestBackend;

    fn collected() -> CollectedPredictions<TestBackend> {
        let device = Default::default();
        let mut c = CollectedPredictions::default();
        c.pred_type.push(Tensor::<TestBackend, 3>::from_floats([[[0.5, 1.5], [2.0, -1.0]]], &device));
        c.true_type.push(Tensor::<TestBackend, 2, Int>::from_ints([[1, -1]], &device));
        c.pred_time.push(Tensor::<TestBackend, 2>::from_floats([[0.25, 0.0]], &device));
        c.true_time.push(Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device));
        c
    }

    #[test]
    fn test_dump_keeps_shapes_and_values() {
        let dump = PredictionDump::from_collected(&collected()).unwrap();
        assert_eq!(dump.pred_type[0].shape, vec![1, 2, 2]);
        assert_eq!(dump.pred_type[0].values, vec![0.5, 1.5, 2.0, -1.0]);
        assert_eq!(dump.true_type[0].values, vec![1, -1]);
        assert_eq!(dump.true_time[0].shape, vec![1, 2]);
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("predictions.json");
        let dump = PredictionDump::from_collected(&collected()).unwrap();

        dump.write(&path).unwrap();
        let json = std::fs::read_to_string(&path).unwrap();
        assert_eq!(serde_json::from_str::<PredictionDump>(&json).unwrap(), dump);
    }

    #[test]
    fn test_empty_collection() {
        let empty = CollectedPredictions::<TestBackend>::default();
        let dump = PredictionDump::from_collected(&empty).unwrap();
        assert!(dump.pred_type.is_empty());
    }
}
