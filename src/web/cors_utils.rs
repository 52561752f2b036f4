// src/web/cors_utils.rs
use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::{Header, Status};
use rocket::{Request, Response};

/// Adds CORS headers; `*` in the allow-list opens the API to every origin
pub struct Cors {
    allowed_origins: Vec<String>,
}

impl Cors {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        Self { allowed_origins }
    }

    fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        origin
            .filter(|origin| self.allowed_origins.iter().any(|o| o == origin))
            .map(str::to_string)
    }
}

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, request: &'r Request<'_>, response: &mut Response<'r>) {
        let Some(origin) = self.allow_origin(request.headers().get_one("Origin")) else {
            return;
        };
        response.set_header(Header::new("Access-Control-Allow-Origin", origin));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "GET, POST, PATCH, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "Content-Type, Authorization"));
    }
}

/// Preflight requests for any path
#[rocket::options("/<_..>")]
pub async fn universal_options_handler() -> Status {
    Status::Ok
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_origin() {
        let open = Cors::new(vec!["*".to_string()]);
        assert_eq!(open.allow_origin(None).as_deref(), Some("*"));

        let strict = Cors::new(vec!["https://careers.example.com".to_string()]);
        assert_eq!(
            strict.allow_origin(Some("https://careers.example.com")).as_deref(),
            Some("https://careers.example.com")
        );
        assert_eq!(strict.allow_origin(Some("https://evil.example")), None);
        assert_eq!(strict.allow_origin(None), None);
    }
}
