use std::fmt;

use crate::types::Cell;

/// Business identifier of an entity, made of one or more column values.
///
/// Integer components are widened on construction so keys read from `int4` and `int8`
/// columns compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NaturalKey(Vec<Cell>);

impl NaturalKey {
    pub fn new(cells: Vec<Cell>) -> Self {
        Self(cells.into_iter().map(Cell::normalized).collect())
    }

    pub fn single(cell: impl Into<Cell>) -> Self {
        Self::new(vec![cell.into()])
    }

    /// Returns `true` if any component is null. Such keys never identify an entity.
    pub fn is_null(&self) -> bool {
        self.0.is_empty() || self.0.iter().any(Cell::is_null)
    }

    pub fn cells(&self) -> &[Cell] {
        &self.0
    }
}

impl fmt::Display for NaturalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.as_slice() {
            [single] => write!(f, "{single}"),
            cells => {
                f.write_str("(")?;
                for (i, cell) in cells.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{cell}")?;
                }
                f.write_str(")")
            }
        }
    }
}

/// Warehouse generated identifier of a dimension row.
///
/// Keys are allocated from [`SurrogateKey::FIRST`] upwards within a load cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurrogateKey(i64);

impl SurrogateKey {
    pub const FIRST: SurrogateKey = SurrogateKey(1);

    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }

    pub(crate) fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for SurrogateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SurrogateKey> for Cell {
    fn from(value: SurrogateKey) -> Self {
        Cell::I64(value.0)
    }
}
