//! Byte-path helpers shared by the trie operations

/// Separator between path segments
pub const PATH_SEPARATOR: u8 = b'/';

/// Find the length of the common prefix between two byte slices
pub fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

/// Whether a label contains a path separator anywhere
pub fn has_separator(label: &[u8]) -> bool {
    label.contains(&PATH_SEPARATOR)
}

/// Whether a path names a directory (ends in a separator)
pub fn is_directory(path: &[u8]) -> bool {
    path.last() == Some(&PATH_SEPARATOR)
}

/// Length of `label` up to and including its last separator, or 0 if it has none
pub fn directory_len(label: &[u8]) -> usize {
    label
        .iter()
        .rposition(|&b| b == PATH_SEPARATOR)
        .map_or(0, |i| i + 1)
}

/// The final segment of a path, after its last separator
pub fn last_segment(path: &[u8]) -> &[u8] {
    &path[directory_len(path)..]
}

/// Whether an entry carries no content (empty or all zero bytes)
pub fn is_zero_entry(entry: &[u8]) -> bool {
    entry.iter().all(|&b| b == 0)
}
