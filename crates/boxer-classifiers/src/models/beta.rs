//! Per-discrimination coefficient blocks.
//!
//! A block has one row per feature id and one column per class position.
//! Blocks are created lazily by the learners and grow as the dictionary and
//! the discrimination's class list grow.
use serde::{Deserialize, Serialize};

use crate::data_point::DataPoint;
use crate::error::{ClassifierError, Result};
use crate::math::Array2;
use crate::suite::DiscrId;

/// Lifecycle of a discrimination's parameters inside a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockState {
    /// No block yet.
    Unallocated,
    /// Sized to the current dimensions, never trained.
    Allocated,
    /// At least one training example absorbed.
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BlockDocument", into = "BlockDocument")]
pub struct BetaBlock {
    discr: DiscrId,
    matrix: Array2<f64>,
    updates: u64,
}

impl BetaBlock {
    pub fn new(discr: DiscrId, rows: usize, cols: usize, fill: f64) -> Self {
        BetaBlock {
            discr,
            matrix: Array2::from_elem(rows, cols, fill),
            updates: 0,
        }
    }

    pub fn discr(&self) -> DiscrId {
        self.discr
    }

    pub fn matrix(&self) -> &Array2<f64> {
        &self.matrix
    }

    pub fn matrix_mut(&mut self) -> &mut Array2<f64> {
        &mut self.matrix
    }

    pub fn updates(&self) -> u64 {
        self.updates
    }

    pub fn mark_updated(&mut self) {
        self.updates += 1;
    }

    pub fn state(&self) -> BlockState {
        if self.updates == 0 {
            BlockState::Allocated
        } else {
            BlockState::Updated
        }
    }

    /// Checked coefficient lookup.
    pub fn coefficient(&self, feature: usize, class: usize) -> Result<f64> {
        if feature >= self.matrix.nrows() {
            return Err(ClassifierError::DimensionMismatch {
                what: "feature id",
                index: feature,
                bound: self.matrix.nrows(),
            });
        }
        if class >= self.matrix.ncols() {
            return Err(ClassifierError::DimensionMismatch {
                what: "class position",
                index: class,
                bound: self.matrix.ncols(),
            });
        }
        Ok(self.matrix[(feature, class)])
    }

    pub fn grow_to(&mut self, rows: usize, cols: usize, fill: f64) {
        self.matrix.grow_with(rows, cols, fill);
    }

    /// `x . beta[:, c]` for `c < n_classes`; cells outside the block count
    /// as zero.
    pub fn linear_scores(&self, point: &DataPoint, n_classes: usize) -> Vec<f64> {
        let mut scores = vec![0.0; n_classes];
        let cols = self.matrix.ncols().min(n_classes);
        for &(j, x) in point.features() {
            if j >= self.matrix.nrows() {
                continue;
            }
            let row = self.matrix.row_slice(j);
            for c in 0..cols {
                scores[c] += row[c] * x;
            }
        }
        scores
    }

    /// Number of non-zero coefficients.
    pub fn nonzero_count(&self) -> usize {
        self.matrix.as_slice().iter().filter(|&&b| b != 0.0).count()
    }
}

#[derive(Serialize, Deserialize)]
struct BlockDocument {
    discr: DiscrId,
    rows: usize,
    cols: usize,
    updates: u64,
    values: Vec<f64>,
}

impl TryFrom<BlockDocument> for BetaBlock {
    type Error = String;

    fn try_from(doc: BlockDocument) -> std::result::Result<Self, Self::Error> {
        let matrix = Array2::from_shape_vec((doc.rows, doc.cols), doc.values)
            .map_err(|e| format!("coefficient block for {}: {}", doc.discr, e))?;
        Ok(BetaBlock {
            discr: doc.discr,
            matrix,
            updates: doc.updates,
        })
    }
}

impl From<BetaBlock> for BlockDocument {
    fn from(block: BetaBlock) -> Self {
        let (rows, cols) = block.matrix.shape();
        BlockDocument {
            discr: block.discr,
            rows,
            cols,
            updates: block.updates,
            values: block.matrix.to_vec(),
        }
    }
}

/// The blocks of one learner, one per discrimination it has touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BetaSet {
    blocks: Vec<BetaBlock>,
}

impl BetaSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_blocks(blocks: Vec<BetaBlock>) -> Result<Self> {
        let mut set = BetaSet::new();
        for block in blocks {
            if set.find(block.discr).is_some() {
                return Err(ClassifierError::schema(format!(
                    "two coefficient blocks for discrimination {}",
                    block.discr
                )));
            }
            set.blocks.push(block);
        }
        Ok(set)
    }

    pub fn find(&self, discr: DiscrId) -> Option<&BetaBlock> {
        self.blocks.iter().find(|b| b.discr == discr)
    }

    pub fn find_block_for_dis(&self, discr: DiscrId) -> Result<&BetaBlock> {
        self.find(discr)
            .ok_or_else(|| ClassifierError::not_found("coefficient block for discrimination", discr))
    }

    pub fn state(&self, discr: DiscrId) -> BlockState {
        self.find(discr)
            .map(BetaBlock::state)
            .unwrap_or(BlockState::Unallocated)
    }

    /// Block for `discr` grown to at least `rows x cols`, allocating it on
    /// first use.
    pub fn block_always(&mut self, discr: DiscrId, rows: usize, cols: usize, fill: f64) -> &mut BetaBlock {
        let index = match self.blocks.iter().position(|b| b.discr == discr) {
            Some(index) => index,
            None => {
                log::debug!("Allocating {}x{} coefficient block for {}", rows, cols, discr);
                self.blocks.push(BetaBlock::new(discr, rows, cols, fill));
                self.blocks.len() - 1
            }
        };
        let block = &mut self.blocks[index];
        block.grow_to(rows, cols, fill);
        block
    }

    pub fn remove(&mut self, discr: DiscrId) -> Option<BetaBlock> {
        let index = self.blocks.iter().position(|b| b.discr == discr)?;
        Some(self.blocks.remove(index))
    }

    pub fn blocks(&self) -> &[BetaBlock] {
        &self.blocks
    }

    pub fn blocks_mut(&mut self) -> &mut [BetaBlock] {
        &mut self.blocks
    }

    pub fn to_vec(&self) -> Vec<BetaBlock> {
        self.blocks.clone()
    }
}
