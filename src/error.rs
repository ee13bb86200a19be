use thiserror::Error;

/// Failure reported by the GitLab REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{action} failed: {status} - {message}")]
    Status {
        action: String,
        status: reqwest::StatusCode,
        message: String,
    },
}

/// Failure running the `git` (or `ssh`) executable.
#[derive(Debug, Error)]
pub enum GitError {
    #[error("Failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{command}` exited with {status}: {stderr}")]
    Failed {
        command: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid mode: {0}")]
pub struct ParseModeError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display() {
        let e = ApiError::Status {
            action: "Delete project 42".to_string(),
            status: reqwest::StatusCode::FORBIDDEN,
            message: "403 Forbidden".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Delete project 42 failed: 403 Forbidden - 403 Forbidden"
        );
    }

    #[test]
    fn parse_mode_error_display() {
        let e = ParseModeError("Burn it all".to_string());
        assert_eq!(e.to_string(), "Invalid mode: Burn it all");
    }

    #[test]
    fn git_spawn_error_display() {
        let e = GitError::Spawn {
            command: "git init".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
        };
        assert_eq!(e.to_string(), "Failed to run `git init`: not found");
    }
}
