use super::*;

fn script() -> Vec<Sentence> {
    vec![
        Sentence::from_text("s1", "Hi there."),
        Sentence::from_text("s2", "This is a test."),
    ]
}

#[test]
fn two_sentences_without_audio() {
    let tl = Timeline::build(&script(), &DurationResolver::default());
    let items = tl.items();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].start_time, 0.0);
    assert_eq!(items[0].duration, 1.0);
    assert!((items[1].start_time - 1.5).abs() < 1e-12);
    assert!((items[1].duration - 1.6).abs() < 1e-12);
    assert!((tl.total_duration() - 3.6).abs() < 1e-12);
    assert!(items.iter().all(|i| i.duration_source == DurationSource::Estimate));
}

#[test]
fn items_are_contiguous_with_gap() {
    let sentences: Vec<_> = (0..6)
        .map(|i| Sentence::from_text(format!("s{i}"), "w ".repeat(i * 2 + 1)))
        .collect();
    let tl = Timeline::build(&sentences, &DurationResolver::default());
    for pair in tl.items().windows(2) {
        let expect = pair[0].start_time + pair[0].duration + SENTENCE_GAP_SECS;
        assert!((pair[1].start_time - expect).abs() < 1e-9);
        assert!(pair[1].start_time > pair[0].start_time);
    }
}

#[test]
fn item_lookup_respects_half_open_intervals_and_gaps() {
    let tl = Timeline::from_durations(&script(), &[1.0, 1.6]).unwrap();
    assert_eq!(tl.item_at(0.0), Some(0));
    assert_eq!(tl.item_at(0.999), Some(0));
    assert_eq!(tl.item_at(1.0), None);
    assert_eq!(tl.item_at(1.2), None);
    assert_eq!(tl.last_started_at(1.2), Some(0));
    assert_eq!(tl.item_at(1.5), Some(1));
    assert_eq!(tl.item_at(3.2), None);
    assert_eq!(tl.item_at(-0.1), None);
    assert_eq!(tl.last_started_at(-0.1), None);
}

#[test]
fn from_durations_validates_input() {
    assert!(Timeline::from_durations(&script(), &[1.0]).is_err());
    assert!(Timeline::from_durations(&script(), &[1.0, 0.0]).is_err());
    assert!(Timeline::from_durations(&script(), &[1.0, f64::NAN]).is_err());
}

#[test]
fn empty_script_has_zero_duration() {
    let tl = Timeline::build(&[], &DurationResolver::default());
    assert!(tl.is_empty());
    assert_eq!(tl.total_duration(), 0.0);
    assert_eq!(tl.item_at(0.0), None);
}
