pub mod raw;

pub use raw::{dump_dataset, read_f32_le, write_f32_le, DATA_FILE, LABELS_FILE};
