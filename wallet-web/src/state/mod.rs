//! Reactive state

pub mod wallet;
