use thiserror::Error;

/// Cómo rechazó el servidor una petición. Mismos estados que el front-end
/// web publica en su bus de errores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Unknown,
}

impl Rejection {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Rejection::BadRequest,
            401 => Rejection::Unauthorized,
            403 => Rejection::Forbidden,
            404 => Rejection::NotFound,
            _ => Rejection::Unknown,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("el servidor rechazó la petición ({kind:?}, estado {status}): {body}")]
    Rejected {
        status: u16,
        kind: Rejection,
        body: String,
    },

    #[error("error de transporte: {0}")]
    Transport(String),

    #[error("respuesta no decodificable: {0}")]
    Decode(String),

    #[error("la operación {0} no trae especificación")]
    MissingSpecification(i64),

    #[error("URL de servidor inválida: {0}")]
    BadUrl(String),
}

impl ApiError {
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        ApiError::Rejected {
            status,
            kind: Rejection::from_status(status),
            body: body.into(),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        ApiError::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_rejections() {
        assert_eq!(Rejection::from_status(400), Rejection::BadRequest);
        assert_eq!(Rejection::from_status(401), Rejection::Unauthorized);
        assert_eq!(Rejection::from_status(403), Rejection::Forbidden);
        assert_eq!(Rejection::from_status(404), Rejection::NotFound);
        assert_eq!(Rejection::from_status(500), Rejection::Unknown);
    }

    #[test]
    fn rejected_keeps_server_body() {
        let err = ApiError::rejected(404, "no existe la operación");
        match err {
            ApiError::Rejected { status, kind, body } => {
                assert_eq!(status, 404);
                assert_eq!(kind, Rejection::NotFound);
                assert_eq!(body, "no existe la operación");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
}
