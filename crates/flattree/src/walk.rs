//! Walking engine and its time-sliced driver.
//!
//! - `machine`: the recompute algorithm as an explicit cursor stack
//! - `driver`: budgeted, resumable slices and the async drive loop

mod driver;
mod machine;

pub(crate) use machine::WalkMachine;
