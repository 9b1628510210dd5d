//! Model-specific prompt preparation.
//!
//! Some embedding models expect a terminator token that the service does not
//! append on its own. Everything else is passed through unchanged.

/// End-of-text token expected by Qwen3 embedding models.
pub const QWEN3_EOT_TOKEN: &str = "<|endoftext|>";

/// Whether `model_id` names a Qwen3 embedding model.
pub fn is_qwen3_embedding(model_id: &str) -> bool {
    let id = model_id.to_lowercase();
    id.contains("qwen3") && id.contains("embed")
}

/// Prepare `text` for embedding with `model_id`.
pub fn prepare_prompt(text: &str, model_id: &str) -> String {
    if is_qwen3_embedding(model_id) && !text.ends_with(QWEN3_EOT_TOKEN) {
        format!("{}{}", text, QWEN3_EOT_TOKEN)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_qwen3_gets_suffix() {
        let out = prepare_prompt("fn main() {}", "dengcao/Qwen3-Embedding-0.6B:Q8_0");
        assert_eq!(out, "fn main() {}<|endoftext|>");
    }

    #[test]
    fn test_suffix_not_doubled() {
        let once = prepare_prompt("hello", "qwen3-embedding");
        assert_eq!(prepare_prompt(&once, "qwen3-embedding"), once);
    }

    #[test]
    fn test_other_models_pass_through() {
        assert_eq!(prepare_prompt("hello", "nomic-embed-text"), "hello");
        // chat model, not an embedding model
        assert_eq!(prepare_prompt("hello", "qwen3:8b"), "hello");
    }
}
