//! End-to-end runs over on-disk fixtures.

use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use pagesmith::{
    ContentFile, FileStat, Pipeline, PipelineConfig, PluginErrorKind, RenderError, Settings,
    TransformStatus, Value,
};
use serde_json::{json, Map};
use serial_test::serial;
use tempfile::TempDir;

struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, name: &str, content: &str) -> &Self {
        let path = self.root().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
        self
    }

    fn config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_root(self.root())
            .with_path(self.root().join("templates"))
    }
}

fn meta(value: serde_json::Value) -> Map<String, serde_json::Value> {
    match value {
        serde_json::Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn output(file: &Option<ContentFile>) -> String {
    file.as_ref().and_then(|f| f.text()).unwrap_or_default()
}

#[test]
fn layout_wraps_body() {
    let site = Site::new();
    site.write("templates/layout.njk", "{% block content %}{% endblock %}");

    let pipeline = Pipeline::new(site.config());
    let file = ContentFile::new("index.html", "<p>Hi</p>")
        .with_meta(meta(json!({"template": "layout.njk"})));

    let out = pipeline.process(file);
    assert_eq!(out.status, TransformStatus::Rendered);
    assert!(out.errors.is_empty());
    assert_eq!(output(&out.file), "<p>Hi</p>");
}

#[test]
fn layout_sees_file_context() {
    let site = Site::new();
    site.write(
        "templates/layout.html",
        "<title>{{ title }} | {{ global.site }}</title>{% block content %}{% endblock %}",
    );

    let config = site.config().with_variable("site", json!("Example"));
    let pipeline = Pipeline::new(config);
    let file = ContentFile::new("index.html", "<h1>{{ title }}</h1>")
        .with_meta(meta(json!({"template": "layout.html", "title": "Home"})));

    let out = pipeline.process(file);
    assert_eq!(
        output(&out.file),
        "<title>Home | Example</title><h1>Home</h1>"
    );
}

#[test]
fn no_metadata_passes_through() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());

    let out = pipeline.process(ContentFile::new("index.html", "{{ untouched }}"));
    assert_eq!(out.status, TransformStatus::PassedThrough);
    assert_eq!(output(&out.file), "{{ untouched }}");
}

#[test]
fn non_html_passes_through_byte_for_byte() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());
    let raw = "# {{ title }}\r\n\u{00e9}";

    let out = pipeline.process(
        ContentFile::new("post.md", raw).with_meta(meta(json!({"title": "x"}))),
    );
    assert_eq!(out.status, TransformStatus::PassedThrough);
    assert_eq!(out.file.unwrap().contents.as_bytes().unwrap(), raw.as_bytes());
}

#[test]
fn missing_path_reports_exactly_one_error() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());

    let file = ContentFile::new("index.html", "[{{ 'nope.md' | body }}]").with_meta(Map::new());
    let out = pipeline.process(file);

    assert_eq!(out.status, TransformStatus::Rendered);
    assert_eq!(output(&out.file), "[]");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].kind, PluginErrorKind::Filter);
    assert_eq!(out.errors[0].plugin, "pagesmith");
    assert!(out.errors[0].message.contains("nope.md"));
    assert_eq!(out.errors[0].path.as_deref(), Some(Path::new("index.html")));
    assert_eq!(pipeline.errors().pending(), 0);
}

#[test]
fn attributes_of_other_files() {
    let site = Site::new();
    site.write("posts/a.md", "---\ntitle: First\ntags: [x, y]\n---\nbody");
    site.write("posts/plain.md", "no front matter");
    let pipeline = Pipeline::new(site.config());

    let source = "{{ 'posts/a.md' | attributes('title') }}|\
                  {{ ('posts/a.md' | attributes).tags | join(',') }}|\
                  {{ 'posts/plain.md' | attributes | length }}|\
                  {% if 'posts/a.md' | attributes('nope') is undefined %}undef{% endif %}";
    let out = pipeline.process(ContentFile::new("index.html", source).with_meta(Map::new()));
    assert!(out.errors.is_empty(), "{:?}", out.errors);
    assert_eq!(output(&out.file), "First|x,y|0|undef");
}

#[test]
fn render_converts_markdown_but_not_html() {
    let site = Site::new();
    site.write("parts/note.md", "---\nwho: Ada\n---\n*{{ who }}*");
    site.write("parts/note.html", "---\nwho: Ada\n---\n*{{ who }}*");
    let pipeline = Pipeline::new(site.config());

    let out = pipeline.process(
        ContentFile::new("index.html", "{{ 'parts/note.md' | render }}").with_meta(Map::new()),
    );
    assert_eq!(output(&out.file).trim(), "<p><em>Ada</em></p>");

    let out = pipeline.process(
        ContentFile::new("index.html", "{{ 'parts/note.html' | render }}").with_meta(Map::new()),
    );
    assert_eq!(output(&out.file), "*Ada*");
}

#[test]
fn render_cycle_is_reported_not_fatal() {
    let site = Site::new();
    site.write("a.html", "A{{ 'b.html' | render }}");
    site.write("b.html", "B{{ 'index.html' | render }}");
    site.write("index.html", "unused on disk");
    let pipeline = Pipeline::new(site.config());

    let out = pipeline.process(
        ContentFile::new(site.root().join("index.html"), "I{{ 'a.html' | render }}")
            .with_meta(Map::new()),
    );
    assert_eq!(out.status, TransformStatus::Rendered);
    assert_eq!(output(&out.file), "IAB");
    assert_eq!(out.errors.len(), 1);
    assert!(out.errors[0].message.contains("cyclic reference"));
}

#[test]
fn directive_free_template_is_unchanged() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());
    let body = "<html>\n  <body>plain</body>\n</html>\n";

    let out = pipeline.process(ContentFile::new("index.html", body).with_meta(Map::new()));
    assert_eq!(output(&out.file), body);
}

#[test]
fn metadata_published_beats_stat() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());
    let stat = FileStat::at(Utc.with_ymd_and_hms(2022, 2, 2, 0, 0, 0).unwrap());

    let out = pipeline.process(
        ContentFile::new("index.html", "{{ published }}|{{ updated | date('isoDate') }}")
            .with_stat(stat)
            .with_meta(meta(json!({"published": "2020-01-01"}))),
    );
    assert_eq!(output(&out.file), "2020-01-01|2022-02-02");
}

#[test]
fn syntax_error_keeps_original_contents() {
    let site = Site::new();
    let pipeline = Pipeline::new(site.config());

    let out = pipeline.process(ContentFile::new("index.html", "{% for %}").with_meta(Map::new()));
    assert_eq!(out.status, TransformStatus::Failed);
    assert_eq!(output(&out.file), "{% for %}");
    assert_eq!(out.errors[0].kind, PluginErrorKind::Template);
}

#[test]
fn caller_filters_and_tags() {
    let site = Site::new();
    let config = site
        .config()
        .with_filter("shout", |args: &[Value]| {
            Ok(Value::from(args[0].to_string().to_uppercase()))
        })
        .with_filter("explode", |_: &[Value]| Err(RenderError::custom("bang")))
        .with_tag(
            "year",
            pagesmith::FunctionTag::new(|_: &[Value]| Ok(Value::from(2024))),
        );
    let pipeline = Pipeline::new(config);

    let out = pipeline.process(
        ContentFile::new("index.html", "{{ 'hi' | shout }} {{ year() }}{{ 1 | explode }}")
            .with_meta(Map::new()),
    );
    assert_eq!(output(&out.file), "HI 2024");
    assert_eq!(out.errors.len(), 1);
    assert_eq!(out.errors[0].message, "explode: bang");
}

#[test]
fn settings_file_drives_a_run() {
    let site = Site::new();
    site.write("templates/base.html", "<main>{% block content %}{% endblock %}</main>");
    site.write(
        "pagesmith.yaml",
        "paths: [templates]\nroot: .\nvariables:\n  site: Example\n",
    );

    let settings = Settings::from_file(site.root().join("pagesmith.yaml")).unwrap();
    let pipeline = Pipeline::new(settings.into_config());
    let out = pipeline.process(
        ContentFile::new("index.html", "{{ global.site }}")
            .with_meta(meta(json!({"template": "base.html"}))),
    );
    assert_eq!(output(&out.file), "<main>Example</main>");
}

#[test]
fn from_path_then_render() {
    let site = Site::new();
    site.write("templates/layout.html", "[{% block content %}{% endblock %}]");
    site.write("index.html", "---\ntemplate: layout.html\nname: Ada\n---\nHi {{ name }}");
    let pipeline = Pipeline::new(site.config());

    let file = ContentFile::from_path(site.root().join("index.html")).unwrap();
    let out = pipeline.process(file);
    assert_eq!(output(&out.file), "[Hi Ada]");
}

#[test]
#[serial]
fn root_defaults_to_working_directory() {
    let site = Site::new();
    site.write("snippet.md", "snippet body");

    let previous = std::env::current_dir().unwrap();
    std::env::set_current_dir(site.root()).unwrap();
    let pipeline = Pipeline::new(PipelineConfig::new());
    std::env::set_current_dir(previous).unwrap();

    let out = pipeline.process(
        ContentFile::new("index.html", "{{ 'snippet.md' | body }}").with_meta(Map::new()),
    );
    assert_eq!(output(&out.file), "snippet body");
}
