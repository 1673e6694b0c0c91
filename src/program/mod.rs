//! Program Definition Module
//!
//! Data structures for workout programs and the parser that builds them
//! from text.
//!
//! # Components
//!
//! - [`model`]: [`ExerciseProgram`], [`Exercise`] and [`ExerciseRef`]
//! - [`parser`]: Text format parsing and program loading

pub mod model;
pub mod parser;

pub use model::{Exercise, ExerciseProgram, ExerciseRef};
pub use parser::{load_program, parse_duration, parse_program, ParseError, REST_PROMPT};
