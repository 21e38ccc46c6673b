use http::{header, Response, StatusCode};

pub type RawResponse = Response<Vec<u8>>;

/// Types that can be written out as a complete CGI response with `Output::respond`.
pub trait IntoResponse {
    fn response(self) -> RawResponse;
}

impl IntoResponse for RawResponse {
    fn response(self) -> RawResponse {
        self
    }
}

impl IntoResponse for u16 {
    fn response(self) -> RawResponse {
        let status = StatusCode::from_u16(self).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let mut res = Response::new(Vec::new());

        *res.status_mut() = status;

        res.headers_mut().insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("text/plain; charset=utf-8"),
        );

        res
    }
}

fn with_body(content_type: &'static str, body: Vec<u8>) -> RawResponse {
    let mut res = Response::new(body);

    res.headers_mut().insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static(content_type),
    );

    res
}

/// Creates a response with the content-type `text/plain`
pub struct Plain(pub String);

impl IntoResponse for Plain {
    fn response(self) -> RawResponse {
        with_body("text/plain; charset=utf-8", self.0.into_bytes())
    }
}

/// Creates a response with the content-type `text/html`
pub struct Html(pub String);

impl IntoResponse for Html {
    fn response(self) -> RawResponse {
        with_body("text/html; charset=utf-8", self.0.into_bytes())
    }
}

/// A `302 Found` pointing the browser at another location. The url is sent as given.
pub struct Redirect(pub String);

impl IntoResponse for Redirect {
    fn response(self) -> RawResponse {
        let mut res = Response::new(Vec::new());

        *res.status_mut() = StatusCode::FOUND;

        // Invalid header bytes leave the response without a location
        if let Ok(location) = header::HeaderValue::from_str(&self.0) {
            res.headers_mut().insert(header::LOCATION, location);
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes() {
        assert_eq!(404u16.response().status(), 404);
        assert_eq!(1000u16.response().status(), 500);
    }

    #[test]
    fn html_sets_content_type() {
        let res = Html(String::from("<p>hi</p>")).response();

        assert_eq!(
            res.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(res.body(), b"<p>hi</p>");
    }

    #[test]
    fn redirect_location() {
        let res = Redirect(String::from("http://www.linux.org")).response();

        assert_eq!(res.status(), StatusCode::FOUND);
        assert_eq!(
            res.headers().get(header::LOCATION).unwrap(),
            "http://www.linux.org"
        );
    }
}
