//! Sparse cell storage for sheets.
//!
//! Cells live in 16x16 blocks and a block is only allocated while it holds a
//! cell. Coordinates are 0-based here; [`crate::Sheet`] converts from the
//! 1-based positions used everywhere else.

use std::collections::HashMap;

pub const CHUNK_SIZE: usize = 16;

type BlockKey = (usize, usize);
type LocalKey = (u8, u8);

fn split(row: usize, col: usize) -> (BlockKey, LocalKey) {
    (
        (row / CHUNK_SIZE, col / CHUNK_SIZE),
        ((row % CHUNK_SIZE) as u8, (col % CHUNK_SIZE) as u8),
    )
}

fn join(block: BlockKey, local: LocalKey) -> (usize, usize) {
    (
        block.0 * CHUNK_SIZE + local.0 as usize,
        block.1 * CHUNK_SIZE + local.1 as usize,
    )
}

#[derive(Clone, Debug)]
pub struct ChunkedGrid<T> {
    blocks: HashMap<BlockKey, HashMap<LocalKey, T>>,
}

impl<T> Default for ChunkedGrid<T> {
    fn default() -> Self {
        Self {
            blocks: HashMap::new(),
        }
    }
}

impl<T> ChunkedGrid<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        let (block, local) = split(row, col);
        self.blocks.get(&block)?.get(&local)
    }

    /// Returns the previous value at that coordinate
    pub fn insert(&mut self, row: usize, col: usize, value: T) -> Option<T> {
        let (block, local) = split(row, col);
        self.blocks.entry(block).or_default().insert(local, value)
    }

    /// Frees the block once its last cell is gone
    pub fn remove(&mut self, row: usize, col: usize) -> Option<T> {
        let (block, local) = split(row, col);
        let cells = self.blocks.get_mut(&block)?;
        let value = cells.remove(&local);
        if cells.is_empty() {
            self.blocks.remove(&block);
        }
        value
    }

    pub fn len(&self) -> usize {
        self.blocks.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Every stored cell in no particular order
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), &T)> {
        self.blocks.iter().flat_map(|(block, cells)| {
            cells
                .iter()
                .map(move |(local, value)| (join(*block, *local), value))
        })
    }

    /// Move every cell to the coordinate returned by `f`; cells mapped to
    /// `None` are dropped. Row and column insertion or deletion go through here.
    pub fn remap<F>(&mut self, mut f: F)
    where
        F: FnMut(usize, usize) -> Option<(usize, usize)>,
    {
        for (block, cells) in std::mem::take(&mut self.blocks) {
            for (local, value) in cells {
                let (row, col) = join(block, local);
                if let Some((row, col)) = f(row, col) {
                    self.insert(row, col, value);
                }
            }
        }
    }
}
