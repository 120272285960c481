//! HTML pages rendered with minijinja.

use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use log::error;
use minijinja::Environment;
use std::sync::LazyLock;

const TEMPLATES: [(&str, &str); 6] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("landing.html", include_str!("../../templates/landing.html")),
    ("register.html", include_str!("../../templates/register.html")),
    ("verify_email.html", include_str!("../../templates/verify_email.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("index.html", include_str!("../../templates/index.html")),
];

static ENVIRONMENT: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    for (name, source) in TEMPLATES {
        if let Err(e) = env.add_template(name, source) {
            error!("template {name} does not compile: {e}");
        }
    }
    env
});

pub fn render(name: &str, context: minijinja::Value) -> Response {
    let rendered = ENVIRONMENT
        .get_template(name)
        .and_then(|template| template.render(context));

    match rendered {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("failed to render {name}: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "page could not be rendered").into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn every_page_renders() {
        for (name, _) in TEMPLATES {
            let rendered = ENVIRONMENT
                .get_template(name)
                .and_then(|t| {
                    t.render(context! {
                        error => "Enter code",
                        email => "farmer@example.in",
                        user => "ravi",
                        current_session_id => 1,
                        current_session_name => "Chat",
                        chat_sessions => Vec::<i32>::new(),
                        current_messages => Vec::<i32>::new(),
                    })
                });
            assert!(rendered.is_ok(), "{name}: {rendered:?}");
        }
    }

    #[test]
    fn user_input_is_escaped() {
        let html = ENVIRONMENT
            .get_template("login.html")
            .unwrap()
            .render(context! { error => "<script>" })
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
    }
}
