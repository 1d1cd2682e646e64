pub mod attempt_timing;
pub mod scoring;
