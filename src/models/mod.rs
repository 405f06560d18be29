pub mod loaders;
pub mod question;

pub use loaders::{load_questions, write_answers};
pub use question::{AnswerRecord, Question};
