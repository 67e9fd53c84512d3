//! Press/release debouncing

pub mod debounce;

pub use debounce::DebounceFilter;
