//! Prompt template for RAG generation

/// Prompt builder for RAG queries
pub struct PromptBuilder;

impl PromptBuilder {
    /// Join retrieved chunks with a blank line between them
    pub fn build_context<S: AsRef<str>>(chunks: &[S]) -> String {
        chunks
            .iter()
            .map(AsRef::as_ref)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the full RAG prompt.
    ///
    /// Chunk text is inserted verbatim; nothing guards against instructions
    /// embedded in the documents.
    pub fn build_prompt<S: AsRef<str>>(chunks: &[S], question: &str) -> String {
        format!(
            r#"You are an AI assistant answering questions based on the provided document context.

Context:
{context}

Question:
{question}

Answer:"#,
            context = Self::build_context(chunks),
            question = question
        )
    }
}
