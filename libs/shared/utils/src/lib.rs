pub mod time_grid;
pub mod test_utils;

pub use time_grid::{CivilDate, TimeGrid, TimeGridError, TimeOfDay};
