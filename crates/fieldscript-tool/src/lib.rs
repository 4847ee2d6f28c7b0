pub mod listing;
pub mod model;

pub use listing::{parse_line, parse_listing, Item};
pub use model::{load_blob, parse_num};
