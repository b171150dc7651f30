use thiserror::Error;

use crate::metadata::MetadataError;
use crate::parsing::ParseError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl CoreError {
    /// One line for the user, keeping malformed metadata apart from other failures.
    pub fn user_message(&self) -> String {
        match self {
            CoreError::Metadata(MetadataError::Malformed { line, reason }) => {
                format!("Malformed metadata: line {}: {reason}", line + 1)
            }
            _ => format!("Failed to extract todo: {self}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_distinguishes_metadata() {
        let malformed = CoreError::from(MetadataError::Malformed {
            line: 2,
            reason: "bad".to_string(),
        });
        assert_eq!(
            malformed.user_message(),
            "Malformed metadata: line 3: bad"
        );

        let parse = CoreError::from(ParseError::UnclosedNode { offset: 7 });
        assert!(parse.user_message().starts_with("Failed to extract todo: "));
    }
}
