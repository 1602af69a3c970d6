//! Pipeline utility functions

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Compute a short hash for a topic string
///
/// Returns an 8-character hexadecimal hash suitable for logging and tracing,
/// so user-supplied topics never appear verbatim in logs.
pub fn hash_topic(topic: &str) -> String {
    let mut hasher = DefaultHasher::new();
    topic.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..8].to_string()
}

/// File stem for a section, 1-based and zero-padded ("section_01")
pub fn section_file_stem(index: usize) -> String {
    format!("section_{:02}", index + 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_topic_is_stable_and_short() {
        let a = hash_topic("日本のカレーの歴史");
        assert_eq!(a.len(), 8);
        assert_eq!(a, hash_topic("日本のカレーの歴史"));
        assert_ne!(a, hash_topic("インドのカレー"));
    }

    #[test]
    fn test_section_file_stem() {
        assert_eq!(section_file_stem(0), "section_01");
        assert_eq!(section_file_stem(9), "section_10");
        assert_eq!(section_file_stem(99), "section_100");
    }
}
