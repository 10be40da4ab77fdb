use svg_delta::dom::SvgDocument;
use svg_delta::{DeltaComputer, DeltaConfig, prepare_svg};

const SVG_OPEN: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 10 10">"#;

fn ids(svg: &str) -> Vec<String> {
    let doc = SvgDocument::parse(svg).unwrap();
    doc.elements()
        .into_iter()
        .filter_map(|n| doc.element(n).and_then(|el| el.id()).map(str::to_string))
        .collect()
}

#[test]
fn anonymous_elements_get_per_tag_counters() {
    let svg = format!(
        r#"{SVG_OPEN}<g><path d="M 0 0"/><path d="M 1 1"/></g><rect width="1" height="1"/></svg>"#
    );
    let out = prepare_svg(&svg).unwrap();
    assert_eq!(ids(&out), ["g_0", "path_0", "path_1", "rect_0"]);
}

#[test]
fn existing_ids_are_kept() {
    let svg = format!(r#"{SVG_OPEN}<g id="line2d_1"><path id="keep" d="M 0 0"/></g></svg>"#);
    let out = prepare_svg(&svg).unwrap();
    assert_eq!(ids(&out), ["line2d_1", "keep"]);
}

#[test]
fn structural_tags_are_not_numbered() {
    let svg = format!(
        r#"{SVG_OPEN}<title>t</title><defs><style>path {{ fill: none }}</style></defs><path d="M 0 0"/></svg>"#
    );
    let out = prepare_svg(&svg).unwrap();
    assert_eq!(ids(&out), ["path_0"]);
}

#[test]
fn producer_id_namespace_switches_prefix() {
    let svg = format!(r#"{SVG_OPEN}<path id="path_7" d="M 0 0"/><path d="M 1 1"/></svg>"#);
    let out = prepare_svg(&svg).unwrap();
    assert_eq!(ids(&out), ["path_7", "mb_auto_path_0"]);
}

#[test]
fn configured_prefix_is_used() {
    let computer = DeltaComputer::new(DeltaConfig {
        auto_id_prefix: "anon_".to_string(),
        ..DeltaConfig::default()
    })
    .unwrap();
    let svg = format!(r#"{SVG_OPEN}<rect id="rect_1"/><rect/></svg>"#);
    let out = computer.prepare(&svg).unwrap();
    assert_eq!(ids(&out), ["rect_1", "anon_rect_0"]);
}

#[test]
fn preparing_twice_changes_nothing() {
    let svg = format!(
        r#"{SVG_OPEN}<metadata><x/></metadata><g id="axes_1"><path d="M 0 0 L 1 1"/><text x="1">a &amp; b</text></g></svg>"#
    );
    let once = prepare_svg(&svg).unwrap();
    let twice = prepare_svg(&once).unwrap();
    assert_eq!(once, twice);
    assert!(!once.contains("metadata"));
    assert!(once.contains("a &amp; b"));
}

#[test]
fn url_references_are_left_alone() {
    let svg = format!(
        r##"{SVG_OPEN}<defs><clipPath id="p0123456789"><rect/></clipPath></defs><path clip-path="url(#p0123456789)" d="M 0 0"/></svg>"##
    );
    let out = prepare_svg(&svg).unwrap();
    assert!(out.contains(r##"clip-path="url(#p0123456789)""##));
    assert_eq!(ids(&out), ["p0123456789", "rect_0", "path_0"]);
}

#[test]
fn existing_path_0_forces_alternate_namespace() {
    let original = r#"<path id="path_0" d="M 0 0 L 5 5" style="fill: none; stroke: #1f77b4"/>"#;
    let svg = format!(r#"{SVG_OPEN}{original}<path d="M 1 1"/></svg>"#);
    let out = prepare_svg(&svg).unwrap();
    assert_eq!(ids(&out), ["path_0", "mb_auto_path_0"]);
    assert!(out.contains(original), "{out}");
    assert!(out.contains(r#"<path d="M 1 1" id="mb_auto_path_0"/>"#), "{out}");
}
