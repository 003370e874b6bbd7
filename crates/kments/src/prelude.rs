pub use kments_core::prelude::*;

// vim: ts=4
