/// Project, sentence, word and caption-style records.
pub mod model;
