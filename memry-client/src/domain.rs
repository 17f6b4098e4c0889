pub mod lecture;

pub use lecture::{
    ChatMessage, ConceptEdge, ConceptGraph, ConceptNode, Flashcard, Lecture, QuizQuestion,
    TranscriptSegment,
};
