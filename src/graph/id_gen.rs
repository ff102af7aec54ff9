//! Deterministic edge key generation via BLAKE3

use blake3::Hasher;

/// Compute a key for an edge added without one
///
/// Key = hex(BLAKE3(source|target|kind|seq)[0..16])
///
/// `seq` is the graph's edge sequence number, so parallel edges between
/// the same pair still get distinct keys.
///
/// # Examples
/// ```
/// use mgraph::graph::compute_edge_key;
///
/// let key = compute_edge_key("John", "Martha", false, 0);
/// assert_eq!(key.len(), 32);
/// ```
pub fn compute_edge_key(source: &str, target: &str, undirected: bool, seq: u64) -> String {
    let mut hasher = Hasher::new();

    hasher.update(source.as_bytes());
    hasher.update(b"|"); // separator
    hasher.update(target.as_bytes());
    hasher.update(b"|");
    hasher.update(if undirected { b"u" } else { b"d" });
    hasher.update(b"|");
    hasher.update(&seq.to_le_bytes());

    // Берём первые 16 байт hash'а
    let hash = hasher.finalize();
    hash.as_bytes()[..16]
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_key() {
        let k1 = compute_edge_key("John", "Martha", false, 7);
        let k2 = compute_edge_key("John", "Martha", false, 7);
        assert_eq!(k1, k2);
    }

    #[test]
    fn test_sequence_separates_parallel_edges() {
        let k1 = compute_edge_key("John", "Martha", false, 0);
        let k2 = compute_edge_key("John", "Martha", false, 1);
        assert_ne!(k1, k2);
    }

    #[test]
    fn test_kind_and_orientation_matter() {
        let directed = compute_edge_key("A", "B", false, 0);
        let undirected = compute_edge_key("A", "B", true, 0);
        let reversed = compute_edge_key("B", "A", false, 0);
        assert_ne!(directed, undirected);
        assert_ne!(directed, reversed);
    }

    #[test]
    fn test_separator_prevents_concatenation_collisions() {
        let k1 = compute_edge_key("ab", "c", false, 0);
        let k2 = compute_edge_key("a", "bc", false, 0);
        assert_ne!(k1, k2);
    }
}
