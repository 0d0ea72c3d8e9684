/// Status codes the core itself ever emits (§6), plus a `Raw` escape
/// hatch for handlers that want to report arbitrary codes through the
/// same writer path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Continue,
    SwitchingProtocols,
    Ok,
    PartialContent,
    MovedPermanently,
    TemporaryRedirect,
    BadRequest,
    Forbidden,
    NotFound,
    MethodNotAllowed,
    RequestEntityTooLarge,
    RangeNotSatisfiable,
    InternalServerError,
    ServiceUnavailable,
    Raw(u16, &'static str),
}

impl Status {
    pub fn code(&self) -> u16 {
        match *self {
            Status::Continue => 100,
            Status::SwitchingProtocols => 101,
            Status::Ok => 200,
            Status::PartialContent => 206,
            Status::MovedPermanently => 301,
            Status::TemporaryRedirect => 307,
            Status::BadRequest => 400,
            Status::Forbidden => 403,
            Status::NotFound => 404,
            Status::MethodNotAllowed => 405,
            Status::RequestEntityTooLarge => 413,
            Status::RangeNotSatisfiable => 416,
            Status::InternalServerError => 500,
            Status::ServiceUnavailable => 503,
            Status::Raw(code, _) => code,
        }
    }

    pub fn reason(&self) -> &str {
        match *self {
            Status::Continue => "Continue",
            Status::SwitchingProtocols => "Switching Protocols",
            Status::Ok => "OK",
            Status::PartialContent => "Partial Content",
            Status::MovedPermanently => "Moved Permanently",
            Status::TemporaryRedirect => "Temporary Redirect",
            Status::BadRequest => "Bad Request",
            Status::Forbidden => "Forbidden",
            Status::NotFound => "Not Found",
            Status::MethodNotAllowed => "Method Not Allowed",
            Status::RequestEntityTooLarge => "Request Entity Too Large",
            Status::RangeNotSatisfiable => "Range Not Satisfiable",
            Status::InternalServerError => "Internal Server Error",
            Status::ServiceUnavailable => "Service Unavailable",
            Status::Raw(_, reason) => reason,
        }
    }
}

#[cfg(test)]
mod test {
    use super::Status;

    #[test]
    fn codes_match_spec_table() {
        assert_eq!(Status::Ok.code(), 200);
        assert_eq!(Status::RangeNotSatisfiable.code(), 416);
        assert_eq!(Status::Raw(599, "Teapot Overflow").code(), 599);
    }
}
