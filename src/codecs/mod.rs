//! Codec implementations

pub mod g723_1;
