pub mod util;

pub use util::{round_for_display, split_csv};
