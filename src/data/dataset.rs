use burn::data::dataset::Dataset;

use crate::domain::event::EventSequence;

/// In-memory split exposed through Burn's Dataset trait so the
/// DataLoader can call .get(index) and .len() on it.
pub struct EventDataset {
    sequences: Vec<EventSequence>,
}

impl EventDataset {
    pub fn new(sequences: Vec<EventSequence>) -> Self {
        Self { sequences }
    }
}

impl Dataset<EventSequence> for EventDataset {
    fn get(&self, index: usize) -> Option<EventSequence> {
        self.sequences.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.sequences.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_len() {
        let ds = EventDataset::new(vec![
            EventSequence::from_times(&[0.0, 1.0], &[1, 2]),
            EventSequence::from_times(&[0.0], &[1]),
        ]);
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.get(1).map(|s| s.len()), Some(1));
        assert!(ds.get(2).is_none());
    }
}
