pub mod baseline;
pub mod defs;
pub mod empty;

pub use baseline::BaselineSummarizer;
pub use defs::*;
pub use empty::EmptySummarizer;
