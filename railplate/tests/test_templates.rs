use railplate::pagination::{page_param, paginate, DEFAULT_PAGE_SIZE};
use railplate::{context, render, render_or_fallback, ErrorKind, Template, Value};

use similar_asserts::assert_eq;

fn units(count: usize) -> Value {
    Value::from_serialize(&serde_json::json!({
        "results": (0..count).map(|id| serde_json::json!({"id": id})).collect::<Vec<_>>(),
    }))
}

#[test]
fn test_emit_path() {
    let out = render(
        "<h1><%= unit.railroad %> <%= unit.road_number %></h1>",
        context! { unit => context! { railroad => "UP", road_number => 844 } },
    )
    .unwrap();
    assert_eq!(out, "<h1>UP 844</h1>");
}

#[test]
fn test_missing_path_renders_empty() {
    let out = render("<%= a.b.c %>", context! { a => context! {} }).unwrap();
    assert_eq!(out, "");
    let out = render("<%= never.seen.anywhere.at.all %>", context! {}).unwrap();
    assert_eq!(out, "");
}

#[test]
fn test_conditional_branch_selection() {
    let tmpl =
        Template::new("<% if (units.length > 1) { %>X<% } else { %>Y<% } %>").unwrap();
    assert_eq!(tmpl.render(context! { units => units(2) }).unwrap(), "X");
    assert_eq!(tmpl.render(context! { units => units(1) }).unwrap(), "Y");
}

#[test]
fn test_bare_conditional_drops_false_body() {
    let tmpl = Template::new("<% if (unit.retired) { %>retired<% } %>active").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { retired => true } })
            .unwrap(),
        "retiredactive"
    );
    assert_eq!(
        tmpl.render(context! { unit => context! {} }).unwrap(),
        "active"
    );
}

#[test]
fn test_loop_concatenation_order() {
    let out = render(
        "<% photos.forEach((photo, i) => { %><%= photo.id %>,<% }) %>",
        context! {
            photos => vec![
                context!(id => 1),
                context!(id => 2),
                context!(id => 3),
            ]
        },
    )
    .unwrap();
    assert_eq!(out, "1,2,3,");
}

#[test]
fn test_loop_index_binding() {
    let out = render(
        "<% photos.forEach((photo, i) => { %><%= i %>:<%= photo.id %> <% }) %>",
        context! { photos => vec![context!(id => 7), context!(id => 8)] },
    )
    .unwrap();
    assert_eq!(out, "0:7 1:8 ");
}

#[test]
fn test_record_set_unwrapping() {
    let tmpl = Template::new("<% units.forEach((unit, i) => { %><%= unit.id %>;<% }) %>").unwrap();
    let wrapped = tmpl
        .render(context! { units => Value::from_serialize(&serde_json::json!({"results": [{"id": 5}]})) })
        .unwrap();
    let bare = tmpl
        .render(context! { units => vec![context!(id => 5)] })
        .unwrap();
    assert_eq!(wrapped, bare);
    assert_eq!(wrapped, "5;");
}

#[test]
fn test_loop_bindings_shadow_outer_fields() {
    let out = render(
        "<%= photo %>|<% photos.forEach((photo, i) => { %><%= photo %><% }) %>|<%= photo %>",
        context! { photo => "outer", photos => vec!["a", "b"] },
    )
    .unwrap();
    assert_eq!(out, "outer|ab|outer");
}

#[test]
fn test_nested_loops() {
    let out = render(
        "<% units.forEach((unit, i) => { %><% unit.photos.forEach((photo, j) => { %><%= unit.id %>/<%= photo %> <% }) %><% }) %>",
        context! {
            units => vec![
                context!(id => 1, photos => vec!["a", "b"]),
                context!(id => 2, photos => vec!["c"]),
            ]
        },
    )
    .unwrap();
    assert_eq!(out, "1/a 1/b 2/c ");
}

#[test]
fn test_conditional_inside_loop() {
    let out = render(
        "<% photos.forEach((photo, i) => { %><% if (photo.featured) { %>[<%= photo.id %>]<% } else { %><%= photo.id %><% } %><% }) %>",
        context! {
            photos => vec![
                context!(id => 1, featured => false),
                context!(id => 2, featured => true),
                context!(id => 3, featured => false),
            ]
        },
    )
    .unwrap();
    assert_eq!(out, "1[2]3");
}

#[test]
fn test_non_list_loop_target_renders_empty() {
    let out = render(
        "a<% unit.forEach((x, i) => { %>never<% }) %>b",
        context! { unit => context! { id => 1 } },
    )
    .unwrap();
    assert_eq!(out, "ab");
    let out = render(
        "a<% missing.forEach((x, i) => { %>never<% }) %>b",
        context! {},
    )
    .unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn test_helper_passthrough_defaults() {
    let tmpl = Template::new("<%= formatRailroadName(unit.railroad) %>").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { railroad => "BNSF" } })
            .unwrap(),
        "BNSF Railway"
    );
    assert_eq!(
        tmpl.render(context! { unit => context! { railroad => "ZZ" } })
            .unwrap(),
        "ZZ"
    );
    assert_eq!(tmpl.render(context! { unit => context! {} }).unwrap(), "");
}

#[test]
fn test_model_helper_in_template() {
    let tmpl = Template::new("<%= formatModelName(unit.model) %>").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { model => "ES44DC" } })
            .unwrap(),
        "GE ES44DC"
    );
    assert_eq!(
        tmpl.render(context! { unit => context! {} }).unwrap(),
        "Unknown"
    );
}

#[test]
fn test_url_encode_helper() {
    let out = render(
        "/search?q=<%= encodeURIComponent(query) %>",
        context! { query => "UP 844 & friends" },
    )
    .unwrap();
    assert_eq!(out, "/search?q=UP%20844%20%26%20friends");
}

#[test]
fn test_unknown_helper_renders_empty() {
    let out = render("a<%= mystery(unit.id) %>b", context! { unit => context! { id => 1 } })
        .unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn test_clock_year_shape() {
    let out = render("<%= new Date().getFullYear() %>", context! {}).unwrap();
    assert_eq!(out.len(), 4);
    assert!(out.parse::<i32>().unwrap() >= 2024);
}

#[test]
fn test_comments_are_skipped() {
    let out = render("a<%# this never shows %>b", context! {}).unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn test_unrecognized_marker_renders_empty() {
    let out = render("a<% include header %>b", context! {}).unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn test_placeholder_with_trailing_garbage_renders_empty() {
    let out = render("a<%= unit road %>b", context! { unit => "x", road => "y" }).unwrap();
    assert_eq!(out, "ab");
}

#[test]
fn test_condition_connectives_are_flat() {
    // `&&` arrives first, so the whole chain is conjunctive; the later
    // `||` does not create precedence
    let tmpl = Template::new("<% if (a == 1 && b || c) { %>X<% } %>").unwrap();
    assert_eq!(
        tmpl.render(context! { a => 1, b => 2, c => 0 }).unwrap(),
        ""
    );
    assert_eq!(
        tmpl.render(context! { a => 1, b => 2, c => 3 }).unwrap(),
        "X"
    );
}

#[test]
fn test_condition_string_comparison() {
    let tmpl = Template::new("<% if (unit.status === \"retired\") { %>R<% } %>").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { status => "retired" } })
            .unwrap(),
        "R"
    );
    assert_eq!(
        tmpl.render(context! { unit => context! { status => "active" } })
            .unwrap(),
        ""
    );
}

#[test]
fn test_loose_comparison_coerces_numeric_strings() {
    let tmpl = Template::new("<% if (unit.id == 5) { %>five<% } %>").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { id => "5" } })
            .unwrap(),
        "five"
    );
    let tmpl = Template::new("<% if (unit.id === 5) { %>five<% } %>").unwrap();
    assert_eq!(
        tmpl.render(context! { unit => context! { id => "5" } })
            .unwrap(),
        ""
    );
}

#[test]
fn test_length_check_truthiness() {
    let tmpl = Template::new("<% if (photos.length) { %>has photos<% } %>").unwrap();
    assert_eq!(
        tmpl.render(context! { photos => vec![context!(id => 1)] })
            .unwrap(),
        "has photos"
    );
    assert_eq!(
        tmpl.render(context! { photos => Vec::<Value>::new() })
            .unwrap(),
        ""
    );
}

#[test]
fn test_idempotence_on_resolved_output() {
    let ctx = context! {
        unit => context! { railroad => "CSX", road_number => 5292 },
        photos => vec![context!(id => 1), context!(id => 2)],
    };
    let source = "<h1><%= unit.railroad %> <%= unit.road_number %></h1><% photos.forEach((photo, i) => { %><%= photo.id %><% }) %>";
    let once = render(source, &ctx).unwrap();
    let twice = render(&once, &ctx).unwrap();
    assert_eq!(once, twice);
    assert_eq!(once, "<h1>CSX 5292</h1>12");
}

#[test]
fn test_unbalanced_conditional_is_render_error() {
    let err = render(
        "<% if (unit.retired) { %>retired",
        context! { unit => context! {} },
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::SyntaxError);
}

#[test]
fn test_fallback_contract() {
    let primary = context! { id => 17, name => "UP 844", railroad => "UP" };
    let out = render_or_fallback(
        "<% if (unit) { %>never closed",
        context! { unit => context! {} },
        &primary,
    );
    assert!(out.contains("UP 844"));
    assert!(out.contains("17"));
    assert!(out.contains("<a href=\"/\">"));

    // a healthy template never falls back
    let out = render_or_fallback("<%= name %>", &primary, &primary);
    assert_eq!(out, "UP 844");
}

#[test]
fn test_locomotive_detail_page() {
    let photos = Value::from_serialize(
        &(1..=120)
            .map(|id| serde_json::json!({"id": id, "title": format!("Photo {id}")}))
            .collect::<Vec<_>>(),
    );
    let query = context! { page => "3" };
    let page = paginate(&photos, DEFAULT_PAGE_SIZE, page_param(&query));
    let ctx = context! {
        unit => context! { railroad => "BNSF", road_number => 3941, model => "ES44C4" },
        units => units(2),
        page => Value::from(page),
    };

    let source = "<h1><%= formatRailroadName(unit.railroad) %> <%= unit.road_number %></h1>\n\
<p>Model: <%= formatModelName(unit.model) %></p>\n\
<% if (units.length > 1) { %><p>One of <%= units.length %> units on file.</p><% } %>\n\
<ul>\n\
<% page.items.forEach((photo, i) => { %><li><a href=\"/photo/<%= photo.id %>\"><%= photo.title %></a></li>\n\
<% }) %></ul>\n\
<p>Page <%= page.page %> of <%= page.totalPages %></p>\n";

    let out = render(source, &ctx).unwrap();
    assert!(out.starts_with("<h1>BNSF Railway 3941</h1>\n"));
    assert!(out.contains("<p>Model: GE ES44C4</p>"));
    assert!(out.contains("<p>One of 2 units on file.</p>"));
    assert!(out.contains("<li><a href=\"/photo/101\">Photo 101</a></li>"));
    assert!(out.contains("<li><a href=\"/photo/120\">Photo 120</a></li>"));
    assert!(!out.contains("Photo 100<"));
    assert_eq!(out.matches("<li>").count(), 20);
    assert!(out.ends_with("<p>Page 3 of 3</p>\n"));
}

#[test]
fn test_single_binding_loop() {
    let out = render(
        "<% photos.forEach((photo) => { %><%= photo.id %><% }) %>",
        context! { photos => vec![context!(id => 4), context!(id => 5)] },
    )
    .unwrap();
    assert_eq!(out, "45");
}

#[test]
fn test_simple_snapshot() {
    let out = render(
        "<%= formatRailroadName(unit.railroad) %>",
        context! { unit => context! { railroad => "BNSF" } },
    )
    .unwrap();
    insta::assert_snapshot!(out, @"BNSF Railway");
}
