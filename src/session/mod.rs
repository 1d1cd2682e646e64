pub mod navigation;
pub mod review;

pub use navigation::Navigator;
pub use review::{classify, ReviewOutcome};
