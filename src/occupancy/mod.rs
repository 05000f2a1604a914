mod geometry;
mod matrix;

pub use geometry::{columns, masking_start, paginate};
pub use matrix::{check_attributes, color, Cell, ColorKey, Occupancy, Page, Row, RowKind};
