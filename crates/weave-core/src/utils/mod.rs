pub mod fs;

pub use fs::{dir_snapshot, find_dirs, normalize, sorted_entries, DirSnapshot};
