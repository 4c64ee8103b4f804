//! 任务层：适应度契约、默认 Prompt、Python 执行器与内置任务

pub mod compression;
pub mod primes;
pub mod prompts;
pub mod python;
pub mod registry;
pub mod sorting;
pub mod sudoku;
pub mod traits;

pub use compression::CompressionTask;
pub use primes::PrimesTask;
pub use python::PythonRunner;
pub use registry::TaskRegistry;
pub use sorting::SortingTask;
pub use sudoku::SudokuTask;
pub use traits::{EvalContext, Task, TaskError};
