//! Test fixtures for integration tests

/// Seed page of the example.com scenario: eight distinct same-site links,
/// one duplicate, one fragment variant and two non-http links
pub const EXAMPLE_SEED_HTML: &str = r#"
<!DOCTYPE html>
<html>
<head><title>Example Domain</title></head>
<body>
    <a href="/1">one</a>
    <a href="/2">two</a>
    <a href="/3">three</a>
    <a href="/4">four</a>
    <a href="/5">five</a>
    <a href="/6">six</a>
    <a href="/7">seven</a>
    <a href="/8">eight</a>
    <a href="/1">one again</a>
    <a href="/2#top">two, top</a>
    <a href="mailto:admin@example.com">mail</a>
    <a href="javascript:void(0)">noop</a>
</body>
</html>
"#;

/// A leaf page without links
pub const LEAF_HTML: &str = "<html><head><title>Leaf</title></head><body><p>end</p></body></html>";

/// Two pages linking to each other and to a shared third page
pub const PAGE_A_HTML: &str = r#"<title>A</title><a href="/b">b</a><a href="/shared">s</a>"#;
pub const PAGE_B_HTML: &str = r#"<title>B</title><a href="/a">a</a><a href="/shared">s</a>"#;
