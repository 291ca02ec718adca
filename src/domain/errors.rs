use thiserror::Error;

/// Errores del dominio. El texto de `Display` es el mensaje que ve el cliente.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    #[error("Already processing an image")]
    AlreadyRunning,
    #[error("Feet detection is only available with BODY_25 model")]
    FeetRequiresBody25,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("{0}")]
    OperationFailed(String),

    #[error("Exception during processing: {0}")]
    Launch(String),
    #[error("OpenPose process failed (code {}): {stderr}", exit_label(.code))]
    ToolFailed { code: Option<i32>, stderr: String },

    #[error("{0}")]
    Discovery(String),

    #[error("No active processing to stop")]
    NotRunning,
    #[error("Processing already finished")]
    AlreadyFinished,
    #[error("Error stopping process: {0}")]
    Cancellation(String),
}

pub type DomainResult<T> = Result<T, DomainError>;

// Un proceso terminado por señal no tiene código de salida.
fn exit_label(code: &Option<i32>) -> String {
    code.map(|c| c.to_string()).unwrap_or_else(|| "signal".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_failure_message_carries_exit_code_and_stderr() {
        let err = DomainError::ToolFailed { code: Some(3), stderr: "bad model".into() };
        assert_eq!(err.to_string(), "OpenPose process failed (code 3): bad model");

        let killed = DomainError::ToolFailed { code: None, stderr: "No error output".into() };
        assert_eq!(killed.to_string(), "OpenPose process failed (code signal): No error output");
    }
}
