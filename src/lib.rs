// Moodbench - Library Entry Point
//
// Scrapes emotion-labelled image searches, annotates the downloaded images and
// measures how the whole pipeline scales with the number of workers.

pub mod constants;
pub mod error;
pub mod config;
pub mod storage;
pub mod diagnostics;
pub mod pool;
pub mod browser;
pub mod harvest;
pub mod fetch;
pub mod annotate;
pub mod worker;
pub mod experiment;
pub mod results;

#[cfg(test)]
mod testing;

pub use config::{AnnotationVariant, Category, ExperimentConfig};
pub use error::{MoodBenchError, Result};
pub use experiment::{Harness, LevelReport, Sample};
