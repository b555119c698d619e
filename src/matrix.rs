//! The benchmark parameter matrix.
//!
//! A `ParameterGrid` is the Cartesian product of the algorithm list with the
//! three instance axes (size center, item count, variability). Expanding it
//! yields one `ParameterPoint` per combination; each point stands for
//! `duplicates` generated instances on disk.

use serde::{Deserialize, Serialize};

/// Algorithms exercised by the default benchmark plan.
pub const DEFAULT_ALGORITHMS: [&str; 8] = [
    "NextFit",
    "FirstFit",
    "FirstFitDecreasing",
    "BestFit",
    "BestFitDecreasing",
    "PackingConstraint",
    "BinCompletion",
    "ModifiedFirstFitDecreasing",
];

/// Mean item size axis, as a percentage of bin capacity.
pub const SIZE_CENTERS: [u32; 3] = [25, 50, 75];

/// Items-per-instance axis.
pub const ITEM_COUNTS: [u32; 3] = [50, 100, 500];

/// Item size spread axis.
pub const VARIABILITIES: [u32; 3] = [1, 2, 3];

/// Instances generated per parameter point.
pub const DEFAULT_DUPLICATES: u32 = 10_000;

/// Maximum bin capacity assumed by every generated instance.
pub const MAX_SIZE: u32 = 100;

/// One generation request: an algorithm plus a position on the three axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterPoint {
    /// Algorithm the instances are generated for.
    pub algorithm: String,
    /// Number of items per instance.
    pub item_count: u32,
    /// Mean item size as a percentage of bin capacity.
    pub size_center: u32,
    /// Item size spread level.
    pub variability: u32,
    /// Instances to generate for this point.
    pub duplicates: u32,
}

impl std::fmt::Display for ParameterPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} count={} center={} variability={}",
            self.algorithm, self.item_count, self.size_center, self.variability
        )
    }
}

/// The full benchmark matrix.
#[derive(Debug, Clone)]
pub struct ParameterGrid {
    pub algorithms: Vec<String>,
    pub size_centers: Vec<u32>,
    pub item_counts: Vec<u32>,
    pub variabilities: Vec<u32>,
    pub duplicates: u32,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            algorithms: DEFAULT_ALGORITHMS.iter().map(|s| s.to_string()).collect(),
            size_centers: SIZE_CENTERS.to_vec(),
            item_counts: ITEM_COUNTS.to_vec(),
            variabilities: VARIABILITIES.to_vec(),
            duplicates: DEFAULT_DUPLICATES,
        }
    }
}

impl ParameterGrid {
    /// Creates the default grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts the grid to a single algorithm, keeping the axes.
    pub fn for_algorithm(algorithm: impl Into<String>) -> Self {
        Self {
            algorithms: vec![algorithm.into()],
            ..Self::default()
        }
    }

    /// Replaces the algorithm list.
    pub fn with_algorithms(mut self, algorithms: Vec<String>) -> Self {
        self.algorithms = algorithms;
        self
    }

    /// Sets the instances-per-point count.
    pub fn with_duplicates(mut self, duplicates: u32) -> Self {
        self.duplicates = duplicates;
        self
    }

    /// Number of parameter points in the grid.
    pub fn len(&self) -> usize {
        self.algorithms.len()
            * self.size_centers.len()
            * self.item_counts.len()
            * self.variabilities.len()
    }

    /// Returns true when the grid expands to no points.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Expands the grid into concrete points.
    ///
    /// Order is algorithm-major, then size center, item count, variability,
    /// matching the order in which generation populates the per-algorithm
    /// directories.
    pub fn points(&self) -> Vec<ParameterPoint> {
        let mut points = Vec::with_capacity(self.len());
        for algorithm in &self.algorithms {
            for &size_center in &self.size_centers {
                for &item_count in &self.item_counts {
                    for &variability in &self.variabilities {
                        points.push(ParameterPoint {
                            algorithm: algorithm.clone(),
                            item_count,
                            size_center,
                            variability,
                            duplicates: self.duplicates,
                        });
                    }
                }
            }
        }
        points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_grid_size() {
        let grid = ParameterGrid::default();
        assert_eq!(grid.len(), 8 * 3 * 3 * 3);
        assert_eq!(grid.points().len(), 216);
    }

    #[test]
    fn test_single_algorithm_grid() {
        let grid = ParameterGrid::for_algorithm("BestFit");
        assert_eq!(grid.len(), 27);
        assert!(grid.points().iter().all(|p| p.algorithm == "BestFit"));
    }

    #[test]
    fn test_expansion_order() {
        let grid = ParameterGrid::for_algorithm("NextFit").with_duplicates(5);
        let points = grid.points();
        // Variability is the innermost axis.
        assert_eq!(
            points[0],
            ParameterPoint {
                algorithm: "NextFit".to_string(),
                item_count: 50,
                size_center: 25,
                variability: 1,
                duplicates: 5,
            }
        );
        assert_eq!(points[1].variability, 2);
        assert_eq!(points[3].item_count, 100);
        assert_eq!(points[9].size_center, 50);
    }

    #[test]
    fn test_empty_algorithms() {
        let grid = ParameterGrid::default().with_algorithms(Vec::new());
        assert!(grid.is_empty());
        assert!(grid.points().is_empty());
    }
}
