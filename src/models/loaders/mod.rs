pub mod json_loader;

pub use json_loader::{load_questions, write_answers};
