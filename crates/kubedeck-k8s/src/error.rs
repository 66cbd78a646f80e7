/// Possible errors from talking to the cluster API.
///
/// Nothing in this crate retries; every failure surfaces to the caller
/// exactly once with its category.
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    /// The API server could not be reached at all (network or TLS).
    #[error("transport: {0}")]
    Transport(#[source] kube::Error),

    /// The cluster host could not be turned into an endpoint URL.
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    /// The bearer token was rejected (HTTP 401).
    #[error("unauthorized: the bearer token is invalid or expired")]
    Auth,

    /// The token lacks permission for the resource (HTTP 403).
    #[error("forbidden: the bearer token lacks permission for this resource")]
    Forbidden,

    /// Any other non-2xx answer, with the server's body verbatim.
    #[error("api status {code}: {body}")]
    Status { code: u16, body: String },

    /// A response carried a missing or malformed field.
    #[error("parse: {0}")]
    Parse(String),
}

impl From<kube::Error> for ApiError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(response) if response.code == 401 => ApiError::Auth,
            kube::Error::Api(response) if response.code == 403 => ApiError::Forbidden,
            kube::Error::Api(response) => ApiError::Status {
                code: response.code,
                body: response.message,
            },
            other => ApiError::Transport(other),
        }
    }
}

impl ApiError {
    /// True for the 401 case that should purge a stored credential.
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth)
    }

    /// Process exit code for this error category.
    pub fn exit_code(&self) -> i32 {
        match self {
            ApiError::Transport(_) | ApiError::Endpoint(_) => 1,
            ApiError::Auth => 2,
            ApiError::Forbidden => 3,
            ApiError::Status { .. } => 4,
            ApiError::Parse(_) => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kube::core::ErrorResponse;

    fn api_error(code: u16) -> kube::Error {
        kube::Error::Api(ErrorResponse {
            status: "Failure".to_string(),
            message: "denied".to_string(),
            reason: String::new(),
            code,
        })
    }

    #[test]
    fn test_status_code_mapping() {
        assert!(matches!(ApiError::from(api_error(401)), ApiError::Auth));
        assert!(matches!(ApiError::from(api_error(403)), ApiError::Forbidden));
        assert!(matches!(
            ApiError::from(api_error(409)),
            ApiError::Status { code: 409, .. }
        ));
    }

    #[test]
    fn test_exit_codes_are_distinct_per_category() {
        let codes = [
            ApiError::from(api_error(500)).exit_code(),
            ApiError::Auth.exit_code(),
            ApiError::Forbidden.exit_code(),
            ApiError::Parse("missing field".to_string()).exit_code(),
        ];
        let mut unique = codes.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), codes.len());
        assert!(codes.iter().all(|code| *code != 0));
    }
}
