#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Stable handle of a live cell. Ids are handed out in creation order and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CellId(pub u64);

/// Grid coordinate of one patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Patch {
    pub row: usize,
    pub col: usize,
}

impl Patch {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Toroidal `rows x cols` grid of patches.
///
/// The grid owns the patches; a patch only references its occupant by id.
/// At most one cell occupies a patch.
#[derive(Debug, Clone)]
pub struct Grid {
    rows: usize,
    cols: usize,
    occupant: Vec<Option<CellId>>,
}

impl Grid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            occupant: vec![None; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn patch_count(&self) -> usize {
        self.occupant.len()
    }

    /// Patch for a flat row-major index.
    pub fn patch_at(&self, index: usize) -> Patch {
        Patch::new(index / self.cols, index % self.cols)
    }

    pub fn contains(&self, patch: Patch) -> bool {
        patch.row < self.rows && patch.col < self.cols
    }

    /// Flat index of `patch`, `None` when it lies outside the grid.
    #[inline]
    fn slot(&self, patch: Patch) -> Option<usize> {
        self.contains(patch)
            .then(|| patch.row * self.cols + patch.col)
    }

    pub fn occupant(&self, patch: Patch) -> Option<CellId> {
        self.slot(patch).and_then(|slot| self.occupant[slot])
    }

    /// Inside the grid and unoccupied.
    pub fn is_free(&self, patch: Patch) -> bool {
        self.slot(patch)
            .is_some_and(|slot| self.occupant[slot].is_none())
    }

    pub fn occupied_count(&self) -> usize {
        self.occupant.iter().filter(|o| o.is_some()).count()
    }

    /// Place `cell` on a free patch. Returns `false` (and does nothing) when the patch is
    /// occupied or outside the grid.
    pub fn place(&mut self, patch: Patch, cell: CellId) -> bool {
        let Some(slot) = self.slot(patch) else {
            return false;
        };
        if self.occupant[slot].is_some() {
            return false;
        }
        self.occupant[slot] = Some(cell);
        true
    }

    pub fn vacate(&mut self, patch: Patch) -> Option<CellId> {
        let slot = self.slot(patch)?;
        self.occupant[slot].take()
    }

    /// The 3x3 Moore neighbourhood of `patch`, including the patch itself, wrapping
    /// across every edge. Duplicates from wrapping on grids narrower than 3 are dropped.
    pub fn neighbourhood(&self, patch: Patch) -> Vec<Patch> {
        let rows = [
            (patch.row + self.rows - 1) % self.rows,
            patch.row,
            (patch.row + 1) % self.rows,
        ];
        let cols = [
            (patch.col + self.cols - 1) % self.cols,
            patch.col,
            (patch.col + 1) % self.cols,
        ];

        let mut out = Vec::with_capacity(9);
        for &r in &rows {
            for &c in &cols {
                let p = Patch::new(r, c);
                if !out.contains(&p) {
                    out.push(p);
                }
            }
        }
        out
    }

    /// Unoccupied patches in the neighbourhood of `patch`.
    pub fn free_neighbours(&self, patch: Patch) -> Vec<Patch> {
        self.neighbourhood(patch)
            .into_iter()
            .filter(|p| self.is_free(*p))
            .collect()
    }
}
