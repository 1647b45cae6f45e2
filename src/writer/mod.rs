//! Component 4 – turning method models into files.
pub mod files;
pub mod rust;
