// ============================================================
// Layer 4 — Pickle Archive Loader
// ============================================================
// Loads one dataset split from a pickled archive, the format
// the public point-process benchmarks ship in.
//
// Archive layout (a Python dict):
//   {
//     "dim_process": 5,               ← number of event types
//     "train": [                      ← key named after the split
//       [ {"time_since_start": 0.0,
//          "time_since_last_event": 0.0,
//          "type_event": 2,           ← 0-indexed on disk
//          "is_endo": 1}, ... ],      ← optional, default endogenous
//       ...
//     ],
//     ...                             ← other keys are ignored
//   }
//
// Older archives were pickled by Python 2, so byte strings are
// decoded as UTF-8 while reading.
//
// File naming: `<prefix><split>.pkl`, e.g. data/so/ + train.pkl
//
// Reference: serde-pickle crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::Deserialize;
use serde_pickle::{DeOptions, HashableValue, Value};
use std::{fs, path::PathBuf};

use crate::domain::event::{Event, EventSequence};
use crate::domain::traits::{SequenceSource, SplitData};
use crate::error::TrainError;

/// Archive key declaring the number of distinct event types
const NUM_TYPES_KEY: &str = "dim_process";

/// The endogenous flag is stored as a bool or as a 0/1 integer
/// depending on which tool produced the archive.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    time_since_start:      f64,
    time_since_last_event: f64,
    type_event:            i64,
    #[serde(default)]
    is_endo:               Option<Flag>,
}

impl RawEvent {
    fn into_event(self) -> Result<Event, TrainError> {
        // Stored 0-indexed; shift so 0 stays free for PAD
        let kind = usize::try_from(self.type_event + 1).map_err(|_| {
            TrainError::MalformedArchive(format!("negative type_event {}", self.type_event))
        })?;
        let endogenous = self.is_endo.as_ref().map_or(true, Flag::is_set);
        Ok(Event {
            time: self.time_since_start,
            time_since_last: self.time_since_last_event,
            kind,
            endogenous,
        })
    }
}

/// Reads `<prefix><split>.pkl` archives.
pub struct PickleLoader {
    prefix: String,
}

impl PickleLoader {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    fn path_for(&self, split: &str) -> PathBuf {
        PathBuf::from(format!("{}{}.pkl", self.prefix, split))
    }
}

impl SequenceSource for PickleLoader {
    fn load_split(&self, split: &str) -> Result<SplitData> {
        let path = self.path_for(split);
        tracing::info!("Loading {} split from '{}'", split, path.display());

        let bytes = fs::read(&path)
            .with_context(|| format!("Cannot read dataset archive '{}'", path.display()))?;
        let data = parse_archive(&bytes, split)
            .with_context(|| format!("Cannot parse dataset archive '{}'", path.display()))?;

        tracing::info!(
            "Loaded {} sequences ({} events, {} types) from '{}'",
            data.sequences.len(),
            data.num_events(),
            data.num_types,
            path.display()
        );
        Ok(data)
    }
}

/// Decode an in-memory archive and extract the named split.
pub fn parse_archive(bytes: &[u8], split: &str) -> Result<SplitData> {
    let value = serde_pickle::value_from_slice(bytes, DeOptions::new().decode_strings())?;

    let Value::Dict(mut entries) = value else {
        return Err(TrainError::MalformedArchive("top-level object is not a dict".into()).into());
    };

    let num_types_value = entries
        .remove(&HashableValue::String(NUM_TYPES_KEY.to_string()))
        .ok_or_else(|| TrainError::MalformedArchive(format!("missing '{NUM_TYPES_KEY}'")))?;
    let num_types: usize = serde_pickle::from_value(num_types_value)
        .map_err(|e| TrainError::MalformedArchive(format!("'{NUM_TYPES_KEY}': {e}")))?;

    let split_value = entries
        .remove(&HashableValue::String(split.to_string()))
        .ok_or_else(|| TrainError::MalformedArchive(format!("missing split '{split}'")))?;
    let raw: Vec<Vec<RawEvent>> = serde_pickle::from_value(split_value)
        .map_err(|e| TrainError::MalformedArchive(format!("split '{split}': {e}")))?;

    let sequences = raw
        .into_iter()
        .enumerate()
        .map(|(index, events)| {
            let events = events
                .into_iter()
                .map(RawEvent::into_event)
                .collect::<Result<Vec<_>, _>>()?;
            let seq = EventSequence::new(events);
            seq.validate(index, num_types)?;
            Ok(seq)
        })
        .collect::<Result<Vec<_>, TrainError>>()?;

    Ok(SplitData { sequences, num_types })
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use serde_pickle::SerOptions;
    use std::collections::BTreeMap;

    fn key(s: &str) -> HashableValue {
        HashableValue::String(s.to_string())
    }

    fn raw_event(t: f64, gap: f64, kind: i64, endo: Option<i64>) -> Value {
        let mut m = BTreeMap::new();
        m.insert(key("time_since_start"), Value::F64(t));
        m.insert(key("time_since_last_event"), Value::F64(gap));
        m.insert(key("type_event"), Value::I64(kind));
        if let Some(e) = endo {
            m.insert(key("is_endo"), Value::I64(e));
        }
        Value::Dict(m)
    }

    fn archive(split: &str, seqs: Vec<Vec<Value>>, num_types: i64) -> Vec<u8> {
        let mut m = BTreeMap::new();
        m.insert(key("dim_process"), Value::I64(num_types));
        m.insert(key(split), Value::List(seqs.into_iter().map(Value::List).collect()));
        m.insert(key("args"), Value::None);
        serde_pickle::value_to_vec(&Value::Dict(m), SerOptions::new()).unwrap()
    }

    #[test]
    fn test_types_are_shifted_past_pad() {
        let bytes = archive(
            "dev",
            vec![vec![raw_event(0.0, 0.0, 0, None), raw_event(1.5, 1.5, 2, None)]],
            3,
        );
        let data = parse_archive(&bytes, "dev").unwrap();
        assert_eq!(data.num_types, 3);
        let kinds: Vec<usize> = data.sequences[0].events.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![1, 3]);
        assert!(data.sequences[0].events.iter().all(|e| e.endogenous));
    }

    #[test]
    fn test_reads_endogenous_flag() {
        let bytes = archive(
            "train",
            vec![vec![raw_event(0.0, 0.0, 0, Some(1)), raw_event(1.0, 1.0, 0, Some(0))]],
            1,
        );
        let data = parse_archive(&bytes, "train").unwrap();
        let flags: Vec<bool> = data.sequences[0].events.iter().map(|e| e.endogenous).collect();
        assert_eq!(flags, vec![true, false]);
    }

    #[test]
    fn test_missing_split_is_an_error() {
        let bytes = archive("train", vec![], 2);
        assert!(parse_archive(&bytes, "test").is_err());
    }

    #[test]
    fn test_rejects_decreasing_times() {
        let bytes = archive(
            "train",
            vec![vec![raw_event(2.0, 0.0, 0, None), raw_event(1.0, -1.0, 0, None)]],
            1,
        );
        assert!(parse_archive(&bytes, "train").is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let loader = PickleLoader::new("/nonexistent/prefix/");
        assert!(loader.load_split("train").is_err());
    }

    #[test]
    fn test_loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = archive("test", vec![vec![raw_event(0.0, 0.0, 1, None)]], 2);
        fs::write(dir.path().join("test.pkl"), bytes).unwrap();

        let prefix = format!("{}/", dir.path().display());
        let data = PickleLoader::new(prefix).load_split("test").unwrap();
        assert_eq!(data.sequences.len(), 1);
        assert_eq!(data.num_events(), 1);
    }
}
