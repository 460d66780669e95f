//! Utility modules for common functionality

pub mod url;
