/// The AI actions the application offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiRequest {
    /// Draft note content from a topic typed into the form
    Generate { topic: String },
    Summarize { note_id: String, text: String },
    Expand { note_id: String, text: String },
}

impl AiRequest {
    pub fn prompt(&self) -> String {
        match self {
            AiRequest::Generate { topic } => {
                format!("Generate detailed content for a sticky note based on the following topic: \"{}\"", topic)
            }
            AiRequest::Summarize { text, .. } => format!("Summarize this note concisely: \"{}\"", text),
            AiRequest::Expand { text, .. } => {
                format!("Expand on this note, adding details or related ideas: \"{}\"", text)
            }
        }
    }

    /// The note the request is about, if any
    pub fn note_id(&self) -> Option<&str> {
        match self {
            AiRequest::Generate { .. } => None,
            AiRequest::Summarize { note_id, .. } | AiRequest::Expand { note_id, .. } => Some(note_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompts_quote_the_input() {
        let request = AiRequest::Summarize {
            note_id: "n1".to_string(),
            text: "Call mom".to_string(),
        };
        assert_eq!(request.prompt(), "Summarize this note concisely: \"Call mom\"");
        assert_eq!(request.note_id(), Some("n1"));

        let request = AiRequest::Generate {
            topic: "groceries".to_string(),
        };
        assert!(request.prompt().ends_with("topic: \"groceries\""));
        assert_eq!(request.note_id(), None);
    }
}
