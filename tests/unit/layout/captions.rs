use super::*;
use crate::layout::text::FixedAdvanceShaper;

fn settings() -> CaptionSettings {
    CaptionSettings {
        font_size: 100.0,
        ..CaptionSettings::default()
    }
}

fn words(texts: &[&str]) -> Vec<Word> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| Word::plain(format!("w{i}"), *t))
        .collect()
}

fn line_texts(layout: &CaptionLayout) -> Vec<Vec<String>> {
    layout
        .lines
        .iter()
        .map(|l| l.words.iter().map(|w| w.text.clone()).collect())
        .collect()
}

#[test]
fn greedy_fill_wraps_at_seventy_percent() {
    let mut shaper = FixedAdvanceShaper::default();
    let ws = words(&["aa", "aa", "aa", "aa", "aa", "aa"]);
    let layout = layout_caption(&ws, &settings(), 1000, &mut shaper).unwrap();
    assert_eq!(layout.lines.len(), 2);
    assert_eq!(layout.lines[0].words.len(), 4);
    assert_eq!(layout.lines[0].width, 550.0);
    assert_eq!(layout.lines[1].words.len(), 2);
    assert_eq!(layout.lines[1].width, 250.0);
    assert_eq!(layout.line_height, 130.0);
    assert_eq!(layout.total_height, 260.0);
    assert_eq!(layout.lines[1].words[0].index, 4);
}

#[test]
fn fit_check_is_strict() {
    let mut shaper = FixedAdvanceShaper::default();
    // "abcdef " advances 350; two of them are exactly 0.7 * 1000.
    let ws = words(&["abcdef", "abcdef"]);
    let layout = layout_caption(&ws, &settings(), 1000, &mut shaper).unwrap();
    assert_eq!(layout.lines.len(), 2);

    let layout = layout_caption(&ws, &settings(), 1001, &mut shaper).unwrap();
    assert_eq!(layout.lines.len(), 1);
    assert_eq!(layout.lines[0].width, 650.0);
}

#[test]
fn oversized_word_gets_its_own_line_without_empty_lines() {
    let mut shaper = FixedAdvanceShaper::default();
    let ws = words(&["supercalifragilistic", "hi"]);
    let layout = layout_caption(&ws, &settings(), 1000, &mut shaper).unwrap();
    assert_eq!(
        line_texts(&layout),
        vec![vec!["supercalifragilistic".to_owned()], vec!["hi".to_owned()]]
    );
    assert!(layout.lines.iter().all(|l| !l.words.is_empty()));
}

#[test]
fn uppercase_and_line_break_flags_apply() {
    let mut shaper = FixedAdvanceShaper::default();
    let mut ws = words(&["one", "two", "three"]);
    ws[0].is_line_break = Some(true);
    ws[2].display_text = "Three!".to_owned();
    let s = CaptionSettings {
        is_uppercase: true,
        ..settings()
    };
    let layout = layout_caption(&ws, &s, 4000, &mut shaper).unwrap();
    assert_eq!(
        line_texts(&layout),
        vec![
            vec!["ONE".to_owned()],
            vec!["TWO".to_owned(), "THREE!".to_owned()]
        ]
    );
}

#[test]
fn empty_word_list_has_no_lines() {
    let mut shaper = FixedAdvanceShaper::default();
    let layout = layout_caption(&[], &settings(), 1080, &mut shaper).unwrap();
    assert!(layout.lines.is_empty());
    assert_eq!(layout.total_height, 0.0);
}

#[test]
fn layout_is_deterministic() {
    let mut shaper = FixedAdvanceShaper::default();
    let ws = words(&["The", "quick", "brown", "fox", "jumps", "over", "the", "lazy", "dog"]);
    let a = layout_caption(&ws, &settings(), 1080, &mut shaper).unwrap();
    let b = layout_caption(&ws, &settings(), 1080, &mut shaper).unwrap();
    assert_eq!(a, b);
}

#[test]
fn cache_reuses_and_invalidates() {
    let mut shaper = FixedAdvanceShaper::default();
    let mut sentences = vec![
        Sentence::from_text("a", "hello there world"),
        Sentence::from_text("b", "second sentence"),
    ];
    let mut cache = LayoutCache::new();

    let s1 = cache
        .refresh(&sentences, &settings(), 1080, &mut shaper)
        .unwrap();
    assert_eq!(s1.rebuilt, 2);
    assert_eq!(cache.len(), 2);

    let s2 = cache
        .refresh(&sentences, &settings(), 1080, &mut shaper)
        .unwrap();
    assert_eq!(s2, RefreshStats { rebuilt: 0, reused: 2, dropped: 0 });

    sentences[1].words[0].display_text = "changed".to_owned();
    let s3 = cache
        .refresh(&sentences, &settings(), 1080, &mut shaper)
        .unwrap();
    assert_eq!(s3.rebuilt, 1);
    assert_eq!(cache.get("b").unwrap().lines[0].words[0].text, "changed");

    let bigger = CaptionSettings {
        font_size: 120.0,
        ..settings()
    };
    let s4 = cache.refresh(&sentences, &bigger, 1080, &mut shaper).unwrap();
    assert_eq!(s4.rebuilt, 2);
    assert!((cache.get("a").unwrap().line_height - 156.0).abs() < 1e-9);

    let s5 = cache.refresh(&sentences, &bigger, 2160, &mut shaper).unwrap();
    assert_eq!(s5.rebuilt, 2);

    sentences.remove(0);
    let s6 = cache.refresh(&sentences, &bigger, 2160, &mut shaper).unwrap();
    assert_eq!(s6.dropped, 1);
    assert!(cache.get("a").is_none());
}
