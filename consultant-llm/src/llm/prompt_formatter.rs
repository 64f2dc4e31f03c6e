use consultant_data_services::ScoredChunk;

/// Formatter for consultant prompts with or without retrieved policy context
pub struct LlmPromptFormatter;

impl LlmPromptFormatter {
    const PERSONA: &'static str = "You are an AI HR consultant answering employee questions \
        about company policy. Answer using only the policy excerpts provided. If the excerpts \
        do not cover the question, say that the policies do not address it instead of guessing.";

    /// Format the question with the retrieved excerpts
    pub fn format(question: &str, context: &[ScoredChunk]) -> String {
        let mut prompt = String::new();

        prompt.push_str(Self::PERSONA);
        prompt.push_str("\n\n");

        if context.is_empty() {
            prompt.push_str("NO POLICY CONTEXT AVAILABLE.\n\n");
        } else {
            prompt.push_str("POLICY EXCERPTS:\n\n");
            for (i, scored) in context.iter().enumerate() {
                prompt.push_str(&format!(
                    "[{}] {} (part {})\n{}\n\n",
                    i + 1,
                    scored.chunk.source,
                    scored.chunk.chunk_index + 1,
                    scored.chunk.text.trim()
                ));
            }
        }

        prompt.push_str(&format!("QUESTION: {}\n\n", question.trim()));
        prompt.push_str("Answer in a few sentences and cite the excerpt numbers you relied on.\n");

        prompt
    }
}
