//! Response type for command execution results.

use std::time::Duration;

use crate::error::CommandError;

/// Response from a command execution.
#[derive(Debug, Clone)]
pub struct Response {
    /// The command that was executed.
    pub command: String,

    /// Output with the command echo and trailing prompt removed.
    pub result: String,

    /// The prompt that was matched at the end.
    pub prompt: String,

    /// Time taken to execute the command.
    pub elapsed: Duration,

    /// Failure marker found in the output, if any.
    pub failure_message: Option<String>,
}

impl Response {
    /// Create a new successful response.
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            prompt: prompt.into(),
            elapsed,
            failure_message: None,
        }
    }

    /// Create a failed response.
    pub fn failed(
        command: impl Into<String>,
        result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
        failure_message: impl Into<String>,
    ) -> Self {
        Self {
            failure_message: Some(failure_message.into()),
            ..Self::new(command, result, prompt, elapsed)
        }
    }

    /// Check if the response indicates success.
    pub fn is_success(&self) -> bool {
        self.failure_message.is_none()
    }

    /// Turn a failed response into [`CommandError::Rejected`].
    pub fn into_result(self) -> Result<Self, CommandError> {
        match self.failure_message {
            Some(message) => Err(CommandError::Rejected {
                command: self.command,
                message,
            }),
            None => Ok(self),
        }
    }
}

impl std::fmt::Display for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_into_result() {
        let ok = Response::new("show bgp", "10.1.1.1 ...", "r1#", Duration::ZERO);
        assert!(ok.is_success());
        assert!(ok.into_result().is_ok());

        let failed = Response::failed(
            "show bgp foo",
            "% Invalid input detected at '^' marker.",
            "r1#",
            Duration::ZERO,
            "% Invalid input detected",
        );
        match failed.into_result() {
            Err(CommandError::Rejected { command, message }) => {
                assert_eq!(command, "show bgp foo");
                assert_eq!(message, "% Invalid input detected");
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }
}
