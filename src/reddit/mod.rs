//! Reddit digest workflow: task synthesis and result shaping.

mod shape;
mod task;

pub use shape::{final_output, render_plan};
pub use task::{Instruction, TaskTemplate};
