pub mod random_word;
pub mod sub_words;

pub use random_word::RandomWordTool;
pub use sub_words::{SubWordsParams, SubWordsTool};
