//! C6: packs every distinct completion string into a single blob, reusing
//! an existing occurrence as a substring match wherever possible.
//!
//! Grounded on the original generator's `serialize_outputs`, with the
//! redundant in-loop re-sort removed (Section 9: "sort once").

use std::collections::BTreeMap;

/// `(blob, offset_by_completion, max_completion_length)`.
pub struct Completions {
    pub blob: String,
    pub offsets: BTreeMap<String, usize>,
    pub max_length: usize,
}

/// Greedily packs `completions` longest-first: each completion that already
/// occurs as a substring of the blob built so far reuses that offset;
/// otherwise it's appended and a new offset is recorded. Not globally
/// optimal, but deterministic.
pub fn pack<'a>(completions: impl IntoIterator<Item = &'a str>) -> Completions {
    let mut sorted: Vec<&str> = completions.into_iter().collect();
    sorted.sort_by_key(|c| std::cmp::Reverse(c.chars().count()));
    sorted.dedup();

    let mut blob = String::new();
    let mut offsets = BTreeMap::new();
    let mut max_length = 0;

    for completion in sorted {
        max_length = max_length.max(completion.len());
        if offsets.contains_key(completion) {
            continue;
        }
        if let Some(byte_offset) = blob.find(completion) {
            offsets.insert(completion.to_string(), byte_offset);
        } else {
            offsets.insert(completion.to_string(), blob.len());
            blob.push_str(completion);
        }
    }

    Completions {
        blob,
        offsets,
        max_length,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_suffix_is_reused() {
        // S3: "the" appears once in the blob; both completions referencing
        // it resolve to the same offset.
        let completions = pack(["the", "the"]);
        assert_eq!(completions.blob, "the");
        assert_eq!(completions.offsets.len(), 1);
    }

    #[test]
    fn longer_completion_absorbs_a_shorter_substring() {
        let completions = pack(["ample", "xample"]);
        assert_eq!(completions.blob, "xample");
        assert_eq!(completions.offsets["ample"], 1);
        assert_eq!(completions.offsets["xample"], 0);
    }

    #[test]
    fn every_offset_points_at_its_own_completion() {
        let completions = pack(["foo", "bar", "foobar"]);
        for (completion, &offset) in &completions.offsets {
            let len = completion.chars().count();
            let slice: String = completions.blob.chars().skip(offset).take(len).collect();
            assert_eq!(&slice, completion);
        }
    }
}
