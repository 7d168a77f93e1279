// ============================================================
// Layer 4 — Sequence Trimming Policies
// ============================================================
// Primary-corpus sequences pass through a trimming policy before
// their lengths are checked against the buckets. The policy is a
// collaborator (SequenceTrimmer trait); two are shipped:
//
//   NoTrim       → sequences are used as read
//   HeadTrimmer  → keep at most `max_len` leading tokens
//
// Secondary-corpus data is never trimmed.

use crate::domain::traits::SequenceTrimmer;

/// Identity policy
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTrim;

impl SequenceTrimmer for NoTrim {
    fn trim(&self, ids: Vec<u32>) -> Vec<u32> {
        ids
    }
}

/// Keeps the first `max_len` ids of a sequence.
#[derive(Debug, Clone, Copy)]
pub struct HeadTrimmer {
    max_len: usize,
}

impl HeadTrimmer {
    pub fn new(max_len: usize) -> Self {
        Self { max_len }
    }
}

impl SequenceTrimmer for HeadTrimmer {
    fn trim(&self, mut ids: Vec<u32>) -> Vec<u32> {
        ids.truncate(self.max_len);
        ids
    }
}

/// Pick the policy matching an optional configured length.
pub fn trimmer_for(trim_length: Option<usize>) -> Box<dyn SequenceTrimmer> {
    match trim_length {
        Some(n) => Box::new(HeadTrimmer::new(n)),
        None    => Box::new(NoTrim),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_head_trimmer_truncates() {
        let t = HeadTrimmer::new(3);
        assert_eq!(t.trim(vec![9, 8, 7, 6, 5]), vec![9, 8, 7]);
        assert_eq!(t.trim(vec![4]), vec![4]);
    }

    #[test]
    fn test_no_trim_is_identity() {
        assert_eq!(NoTrim.trim(vec![1, 2, 3]), vec![1, 2, 3]);
    }

    #[test]
    fn test_trimmer_for_config() {
        assert_eq!(trimmer_for(Some(2)).trim(vec![5, 6, 7]), vec![5, 6]);
        assert_eq!(trimmer_for(None).trim(vec![5, 6, 7]), vec![5, 6, 7]);
    }
}
