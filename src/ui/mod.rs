pub mod progress;

pub use progress::{Ui, get_multi};
