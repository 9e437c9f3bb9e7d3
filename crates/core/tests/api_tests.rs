//! Library API integration tests
use lectern_core::*;
use time::macros::datetime;

fn get_fixture_path(name: &str) -> String {
    format!("{}/../../tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
}

fn read_fixture(name: &str) -> String {
    std::fs::read_to_string(get_fixture_path(name)).unwrap()
}

const ARTICLE_URL: &str = "https://www.journal.test/2024/night-trains";

#[test]
fn test_extract_web_article() {
    let article = Pipeline::new().extract_web(&read_fixture("article.html"), ARTICLE_URL).unwrap();

    assert_eq!(article.title, "Night Trains Are Back");
    assert_eq!(article.author.as_deref(), Some("Marta Lindqvist"));
    assert_eq!(article.canonical_url, ARTICLE_URL);
    assert_eq!(article.source_name().as_deref(), Some("journal.test"));

    let md = &article.content_markdown;
    assert!(md.contains("sleeper services are returning"));
    assert!(md.contains("more routes are planned"));
    assert!(!md.contains("Destinations"));
    assert!(!md.contains("All rights reserved"));
    assert!(!md.contains("pixel.test"));
    assert!(md.contains("https://rail.test/report?id=42"));
    assert!(!md.contains("utm_"));
    assert_eq!(md.matches("https://www.journal.test/images/sleeper-cabin.jpg").count(), 1);
    assert!(!md.contains("\n\n\n"));
}

#[test]
fn test_reinjected_image_follows_anchor_paragraph() {
    let html = read_fixture("article.html");
    let base = url::Url::parse(ARTICLE_URL).unwrap();
    let images = collect(&html, &ImageRecoveryConfig::default(), Some(&base));

    assert_eq!(images.len(), 1);
    assert_eq!(images[0].src, "https://www.journal.test/images/sleeper-cabin.jpg");
    assert_eq!(images[0].caption, "A refurbished two-berth cabin on the Vienna to Hamburg line");
    assert!(images[0].anchor.ends_with("could replace a hotel stay."));

    let content = "<div>\
        <p>The revival started quietly, with a handful of routes between Vienna, Munich, and Zurich. Travellers \
        who wanted to avoid short flights discovered that a night on the rails could replace a hotel stay.</p>\
        <p>Cabins now come with proper mattresses.</p></div>";
    let reinjection = reinject(content, &images);

    assert_eq!(reinjection.placements, vec![(images[0].src.clone(), Placement::Anchored)]);
    let out = &reinjection.content_html;
    let anchor = out.find("hotel stay.</p>").unwrap();
    let image = out.find("sleeper-cabin.jpg").unwrap();
    let next = out.find("Cabins now come").unwrap();
    assert!(anchor < image && image < next);
    assert!(out.contains("<em>A refurbished two-berth cabin on the Vienna to Hamburg line</em>"));

    let again = reinject(out, &images);
    assert!(again.placements.is_empty());
    assert_eq!(again.content_html.matches("sleeper-cabin.jpg").count(), 1);
}

#[test]
fn test_unmatched_image_is_appended() {
    let images = vec![ContentImage {
        src: "https://cdn.test/lost.png".to_string(),
        alt: "Lost".to_string(),
        caption: String::new(),
        anchor: "text that appears nowhere".to_string(),
    }];
    let reinjection = reinject("<p>First.</p><p>Last.</p>", &images);

    assert_eq!(reinjection.placements[0].1, Placement::Appended);
    let out = reinjection.content_html;
    assert!(out.find("Last.").unwrap() < out.find("lost.png").unwrap());
}

#[test]
fn test_sanitize_is_idempotent_on_fixtures() {
    let config = SanitizeConfig::default();
    for name in ["article.html"] {
        let once = sanitize_html(&read_fixture(name), &config);
        let twice = sanitize_html(&once, &config);
        assert_eq!(once, twice, "{name}");
    }
}

#[test]
fn test_html_newsletter() {
    let raw = std::fs::read(get_fixture_path("newsletter.eml")).unwrap();
    let article = Pipeline::new().parse_email(&raw).unwrap();

    assert_eq!(article.title, "Issue 112: Rivers, rails and rooftops");
    assert_eq!(article.author.as_deref(), Some("The Morning Dispatch"));
    assert_eq!(article.canonical_url, "");

    let origin = article.email.as_ref().unwrap();
    assert_eq!(origin.sender_email, "dispatch@news.test");
    assert_eq!(origin.published_at, Some(datetime!(2024-04-15 05:30 UTC)));

    let md = &article.content_markdown;
    assert!(md.contains("Rivers, rails and rooftops"));
    assert!(md.contains("Rooftop gardens"));
    assert!(md.contains("https://news.test/rail?id=9"));
    assert!(!md.contains("utm_source"));
    assert!(!md.contains("mc_cid"));
    assert!(!md.contains("trans_1x1"));
    assert!(!md.contains("open.substack.com"));
    assert!(!md.contains("Plain text edition"));
}

#[test]
fn test_plain_text_email() {
    let article = Pipeline::new().parse_email_file(get_fixture_path("plain.eml")).unwrap();

    assert_eq!(article.title, "Notes from the trip");
    assert!(article.content_markdown.contains("Hello <world>"));
    assert!(article.content_markdown.contains("three days & slept"));

    let origin = article.email.unwrap();
    assert_eq!(origin.sender_name, "carlos");
    assert_eq!(origin.sender_email, "carlos@example.org");
}

#[test]
fn test_empty_email_is_malformed() {
    let err = Pipeline::new().parse_email_file(get_fixture_path("empty.eml")).unwrap_err();
    assert!(err.is_malformed_content());
    assert!(!err.is_fetch_failure());
}

#[test]
fn test_batch_import_isolates_failures() {
    let dir = tempfile::tempdir().unwrap();
    for name in ["newsletter.eml", "plain.eml", "empty.eml"] {
        std::fs::copy(get_fixture_path(name), dir.path().join(name)).unwrap();
    }

    let report = Pipeline::new().import_email_dir(dir.path()).unwrap();

    assert_eq!(report.total(), 3);
    assert_eq!(report.processed.len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(report.failed[0].0.ends_with("empty.eml"));
    assert!(!report.all_failed());
}

#[test]
fn test_speech_segments_from_markdown() {
    let markdown = read_fixture("sample.md");
    let prepared = prepare(&markdown);

    assert!(!prepared.contains("```"));
    assert!(!prepared.contains("route: Vienna"));
    assert!(!prepared.contains("**"));
    assert!(!prepared.contains("]("));
    assert!(!prepared.contains("\n> "));
    assert!(prepared.starts_with("Night Trains Are Back"));
    assert!(prepared.contains("A two-berth sleeper cabin"));
    assert!(prepared.contains("Read the full industry report for details."));
    assert!(prepared.contains("Travel slower, arrive rested."));

    let segments = chunk(&prepared, 80);
    assert!(segments.iter().all(|s| s.chars().count() <= 80));
    let joined: String = segments.join(" ").split_whitespace().collect::<Vec<_>>().join(" ");
    let expected: String = prepared.split_whitespace().collect::<Vec<_>>().join(" ");
    assert_eq!(joined, expected);
}

#[test]
fn test_render_document_front_matter() {
    let raw = std::fs::read(get_fixture_path("newsletter.eml")).unwrap();
    let article = Pipeline::new().parse_email(&raw).unwrap();
    let doc = render_document(&article);

    assert!(doc.starts_with("+++\ntitle = \"Issue 112: Rivers, rails and rooftops\"\n"));
    assert!(doc.contains("source = \"The Morning Dispatch\""));
    assert!(doc.contains("published = \"2024-04-15T07:30:00+02:00\""));
    assert!(doc.contains(&format!("word_count = {}", article.word_count)));
    assert!(doc.ends_with(&format!("{}\n", article.content_markdown)));
    assert!(article.slug().starts_with("2024-04-15_issue-112-rivers-rails-and-rooftops"));
}

#[test]
fn test_config_file_drives_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"speech": {"max_chunk_chars": 50}, "fetch": {"timeout": 5}}"#).unwrap();

    let config = PipelineConfig::load(&path).unwrap();
    assert_eq!(config.fetch.timeout, 5);
    assert_eq!(config.fetch.max_redirects, 10);

    let pipeline = Pipeline::with_config(config);
    let article = pipeline.extract_web(&read_fixture("article.html"), ARTICLE_URL).unwrap();
    let segments = pipeline.speech_segments(&article);
    assert!(segments.len() > 5);
    assert!(segments.iter().all(|s| s.chars().count() <= 50));
}
