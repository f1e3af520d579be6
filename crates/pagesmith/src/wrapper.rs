//! Content wrapper: turns a body plus a parent template name into a child
//! template that extends the parent.

/// Block the wrapped body is placed in. Layouts expose the page body with
/// `{% block content %}{% endblock %}`.
pub const CONTENT_BLOCK: &str = "content";

/// Wraps `body` so that it renders inside the `content` block of `template`.
///
/// The body is inserted verbatim; template syntax inside it is evaluated as
/// part of the child template.
pub fn wrap(body: &str, template: &str) -> String {
    format!(
        "{{% extends \"{}\" %}}{{% block {} %}}{}{{% endblock %}}",
        escape_name(template),
        CONTENT_BLOCK,
        body
    )
}

fn escape_name(name: &str) -> String {
    name.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::{context, Environment};

    #[test]
    fn test_wrap_shape() {
        assert_eq!(
            wrap("<p>Hi</p>", "layout.html"),
            "{% extends \"layout.html\" %}{% block content %}<p>Hi</p>{% endblock %}"
        );
    }

    #[test]
    fn test_wrap_escapes_quotes() {
        assert_eq!(
            wrap("", "we\"ird.html"),
            "{% extends \"we\\\"ird.html\" %}{% block content %}{% endblock %}"
        );
    }

    #[test]
    fn test_passthrough_layout_renders_body_unchanged() {
        let mut env = Environment::new();
        env.add_template("pass.html", "{% block content %}{% endblock %}")
            .unwrap();
        let body = "Hello {{ who }}!";
        let wrapped = env.render_str(&wrap(body, "pass.html"), context! { who => "you" });
        let plain = env.render_str(body, context! { who => "you" });
        assert_eq!(wrapped.unwrap(), plain.unwrap());
    }

    #[test]
    fn test_layout_surrounds_body() {
        let mut env = Environment::new();
        env.add_template("layout.html", "<main>{% block content %}{% endblock %}</main>")
            .unwrap();
        let out = env
            .render_str(&wrap("<p>Hi</p>", "layout.html"), context! {})
            .unwrap();
        assert_eq!(out, "<main><p>Hi</p></main>");
    }
}
