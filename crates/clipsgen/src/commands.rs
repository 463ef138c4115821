//! Command Router - recognises reserved commands at the input prompt
//!
//! Anything that is not a reserved command is a problem statement and
//! enters the pipeline.

/// What one line of user input asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// End the session
    Exit,
    /// Show usage guidance
    Help,
    /// Blank line, ignored
    Empty,
    /// Problem description for the pipeline
    Problem(String),
}

impl Command {
    /// Whether this command runs the generate/execute/interpret pipeline
    pub fn enters_pipeline(&self) -> bool {
        matches!(self, Command::Problem(_))
    }
}

/// Route one line of input
pub fn route_command(input: &str) -> Command {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Command::Empty;
    }

    match trimmed.to_lowercase().as_str() {
        "quit" | "exit" | "q" => Command::Exit,
        "help" => Command::Help,
        _ => Command::Problem(trimmed.to_string()),
    }
}

/// Whether a y/n answer means yes
pub fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_commands() {
        for input in ["quit", "exit", "q", "  QUIT ", "Exit"] {
            assert_eq!(route_command(input), Command::Exit, "input: {input:?}");
        }
    }

    #[test]
    fn test_help_and_empty() {
        assert_eq!(route_command("help"), Command::Help);
        assert_eq!(route_command("HELP  "), Command::Help);
        assert_eq!(route_command(""), Command::Empty);
        assert_eq!(route_command("   \t"), Command::Empty);
    }

    #[test]
    fn test_problem_is_trimmed_verbatim() {
        let cmd = route_command("  Classify if a person is adult based on age >= 18 ");
        assert_eq!(
            cmd,
            Command::Problem("Classify if a person is adult based on age >= 18".to_string())
        );
        assert!(cmd.enters_pipeline());
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative(" YES "));
        assert!(!is_affirmative("n"));
        assert!(!is_affirmative(""));
    }

    #[test]
    fn test_reserved_words_inside_sentences_are_problems() {
        assert!(route_command("quit smoking advisor").enters_pipeline());
        assert!(route_command("help me pick a loan").enters_pipeline());
        assert!(!Command::Help.enters_pipeline());
    }
}
