use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use handlebars::{Handlebars, TemplateError};
use serde_json::Value;

/// Name and source of every page template
const TEMPLATES: [(&str, &str); 5] = [
    ("home", include_str!("./static/home.html")),
    ("dashboard", include_str!("./static/dashboard.html")),
    ("form", include_str!("./static/form.html")),
    ("report", include_str!("./static/report.html")),
    ("confirmation", include_str!("./static/confirmation.html")),
];

/// Build the template registry
///
/// Templates are compiled into the binary, so a failure here is a bug in a
/// template and is reported at startup.
pub fn templates() -> Result<Handlebars<'static>, TemplateError> {
    let mut registry = Handlebars::new();
    registry.register_partial("head", include_str!("./static/layout_head.html"))?;
    for (name, source) in TEMPLATES {
        registry.register_template_string(name, source)?;
    }
    Ok(registry)
}

/// Render a page, falling back to a plain 500 if rendering fails
pub fn render(registry: &Handlebars<'static>, name: &str, data: &Value) -> Response {
    match registry.render(name, data) {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            log::error!("Failed to render page '{}': {}", name, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
