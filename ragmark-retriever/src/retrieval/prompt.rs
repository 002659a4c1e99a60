//! Prompt assembly for a downstream chat model.

use crate::storage::Chunk;

const CHAT_PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. If you don't know the answer, just say that you don't know, don't try to make up an answer.\n";

/// Build a question-answering prompt from retrieved chunks.
///
/// Each chunk becomes a `Context from <path>:` block, in the order given.
/// With no chunks the prompt is the preamble followed by the question.
pub fn build_chat_prompt(context: &[Chunk], question: &str) -> String {
    let mut prompt = String::from(CHAT_PREAMBLE);
    for chunk in context {
        prompt.push_str(&format!(
            "Context from {}:\n{}\n\n",
            chunk.path, chunk.text
        ));
    }
    prompt.push_str("Question: ");
    prompt.push_str(question);
    prompt.push_str("\nSuccint Answer: ");
    prompt
}
