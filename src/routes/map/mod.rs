mod handler;

pub use handler::{get_map_center, save_map_center};
