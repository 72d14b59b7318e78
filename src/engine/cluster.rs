//! Threshold clustering over the similarity matrix.

use std::collections::HashMap;

use super::union_find::UnionFind;

/// Partitions batch indices into connected components: two indices land in
/// the same cluster iff a chain of pairwise similarities at or above
/// `threshold` links them, so indirect matches merge through intermediates.
///
/// Clusters come back largest-first with members in ascending index order;
/// equal sizes keep the order in which each cluster's root was first seen.
pub fn cluster_indices(matrix: &[Vec<f32>], threshold: f32) -> Vec<Vec<usize>> {
    let n = matrix.len();
    let mut sets = UnionFind::new(n);
    for i in 0..n {
        for j in (i + 1)..n {
            if matrix[i][j] >= threshold {
                sets.union(i, j);
            }
        }
    }

    let mut positions: HashMap<usize, usize> = HashMap::new();
    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for i in 0..n {
        let root = sets.find(i);
        let pos = match positions.get(&root) {
            Some(&pos) => pos,
            None => {
                clusters.push(Vec::new());
                positions.insert(root, clusters.len() - 1);
                clusters.len() - 1
            }
        };
        clusters[pos].push(i);
    }
    clusters.sort_by(|a, b| b.len().cmp(&a.len()));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symmetric(pairs: &[(usize, usize, f32)], n: usize) -> Vec<Vec<f32>> {
        let mut matrix = vec![vec![0.0; n]; n];
        for (i, row) in matrix.iter_mut().enumerate() {
            row[i] = 1.0;
        }
        for &(i, j, s) in pairs {
            matrix[i][j] = s;
            matrix[j][i] = s;
        }
        matrix
    }

    #[test]
    fn test_transitive_chain_merges() {
        // 0-1 and 1-2 are similar, 0-2 is not; all three still join.
        let matrix = symmetric(&[(0, 1, 0.9), (1, 2, 0.85), (0, 2, 0.1)], 3);
        let clusters = cluster_indices(&matrix, 0.5);
        assert_eq!(clusters, vec![vec![0, 1, 2]]);
    }

    #[test]
    fn test_below_threshold_stays_apart() {
        let matrix = symmetric(&[(0, 1, 0.4)], 3);
        let clusters = cluster_indices(&matrix, 0.5);
        assert_eq!(clusters, vec![vec![0], vec![1], vec![2]]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let matrix = symmetric(&[(0, 1, 0.5)], 2);
        let clusters = cluster_indices(&matrix, 0.5);
        assert_eq!(clusters, vec![vec![0, 1]]);
    }

    #[test]
    fn test_largest_cluster_first() {
        let matrix = symmetric(&[(2, 3, 0.9), (3, 4, 0.9), (0, 1, 0.9)], 5);
        let clusters = cluster_indices(&matrix, 0.5);
        assert_eq!(clusters, vec![vec![2, 3, 4], vec![0, 1]]);
    }

    #[test]
    fn test_size_tie_keeps_first_encountered_root() {
        let matrix = symmetric(&[(0, 3, 0.9), (1, 2, 0.9)], 4);
        let clusters = cluster_indices(&matrix, 0.5);
        assert_eq!(clusters, vec![vec![0, 3], vec![1, 2]]);
    }

    #[test]
    fn test_raising_threshold_never_merges_more() {
        let matrix = symmetric(
            &[(0, 1, 0.8), (1, 2, 0.45), (3, 4, 0.6), (2, 4, 0.2)],
            5,
        );
        let low = cluster_indices(&matrix, 0.3);
        let high = cluster_indices(&matrix, 0.7);
        assert!(high.len() >= low.len());
    }

    #[test]
    fn test_empty_matrix_yields_no_clusters() {
        let clusters = cluster_indices(&[], 0.5);
        assert!(clusters.is_empty());
    }
}
