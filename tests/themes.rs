use std::fs;

use bank_reviews::{
    config::Settings,
    data::{io, record::CleanReview},
    nlp::{
        self,
        keywords::{preprocess, KeywordExtractor},
        themes::{annotate_themes, ThemeRule, ThemeTable, ThemedReview, FALLBACK_THEME},
    },
};
use chrono::NaiveDate;

fn review(text: &str) -> CleanReview {
    CleanReview {
        review: text.to_string(),
        rating: Some(3),
        date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
        bank: "Dashen".to_string(),
        source: "play-store".to_string(),
    }
}

#[test]
fn reviews_get_keywords_and_themes() {
    let reviews = vec![
        review("The app crashes every time I login"),
        review("Transfer delayed for two days, transfer failed again"),
        review("Lovely colours"),
        review("😀😀"),
    ];
    let themed = annotate_themes(reviews, &KeywordExtractor::default(), &ThemeTable::default());

    assert_eq!(themed.len(), 4);
    assert_eq!(themed[0].themes, vec!["Account Access", "App Reliability"]);
    assert_eq!(themed[1].keywords[0], "transfer");
    assert_eq!(themed[1].themes, vec!["Transaction Performance"]);
    assert_eq!(themed[2].themes, vec![FALLBACK_THEME]);
    assert!(themed[3].keywords.is_empty());
    assert_eq!(themed[3].themes, vec![FALLBACK_THEME]);
    assert!(themed.iter().all(|r| r.keywords.len() <= 5));
}

#[test]
fn keyword_count_respects_top_n() {
    let docs = vec![preprocess(
        "fees transfer login support design balance statement notification",
    )];
    let keywords = KeywordExtractor::new(3, 1000).extract(&docs);
    assert_eq!(keywords[0].len(), 3);
    let terms: Vec<&str> = keywords[0].iter().map(|k| k.term.as_str()).collect();
    assert_eq!(terms, vec!["balance", "design", "fees"]);
}

#[test]
fn vocabulary_cap_limits_candidate_terms() {
    let docs: Vec<String> = ["login login slow", "login fees", "login"]
        .iter()
        .map(|d| preprocess(d))
        .collect();
    let keywords = KeywordExtractor::new(5, 1).extract(&docs);
    assert!(keywords.iter().flatten().all(|k| k.term == "login"));
}

#[test]
fn theme_table_can_be_loaded_from_json() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("themes.json");
    fs::write(
        &path,
        r#"[{"keyword": "fee", "theme": "Pricing"}, {"keyword": "login", "theme": "Access"}]"#,
    )
    .unwrap();

    let table = ThemeTable::from_json_file(&path).unwrap();
    assert_eq!(table.rules()[0], ThemeRule::new("fee", "Pricing"));
    assert_eq!(table.assign(&["fees", "logins"]), vec!["Pricing", "Access"]);

    fs::write(&path, "[]").unwrap();
    assert!(ThemeTable::from_json_file(&path).is_err());
}

#[tokio::test]
async fn theme_stage_writes_list_cells() {
    let dir = tempfile::tempdir().unwrap();
    let settings = Settings::with_dirs(dir.path().join("data"), dir.path().join("outputs"));
    let input = settings.processed_reviews_path();
    io::save(
        &[
            review("Customer support never helps"),
            review("Nice interface design"),
        ],
        &input,
    )
    .unwrap();

    let output = settings.themed_reviews_path();
    let written = nlp::run_themes(&settings, &input, &output).await.unwrap();
    assert_eq!(written, 2);

    let rows: Vec<ThemedReview> = io::read_rows(&output, &["keywords", "themes"]).unwrap();
    assert_eq!(rows[0].themes, vec!["Customer Support"]);
    assert_eq!(rows[1].themes, vec!["User Experience"]);
    assert!(rows[1].keywords.contains(&"interface".to_string()));

    let text = fs::read_to_string(&output).unwrap();
    assert!(text.contains("\"Customer Support\"") || text.contains(",Customer Support"));
}
