pub mod runner;

pub use runner::AttemptRunner;
