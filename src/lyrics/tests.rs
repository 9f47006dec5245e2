use super::*;

fn lyrics() -> SyncedLyrics {
    [(1000, "first"), (4500, "second"), (9000, "♪")]
        .into_iter()
        .map(|(t, l)| (TimeTag::from_millis(t), l.to_owned()))
        .collect()
}

#[test]
fn line_lookup() {
    let lrc = lyrics();
    assert_eq!(lrc.line_at(TimeTag::from_millis(0)), None);
    assert_eq!(lrc.line_at(TimeTag::from_millis(1000)), Some("first"));
    assert_eq!(lrc.line_at(TimeTag::from_millis(4499)), Some("first"));
    assert_eq!(lrc.line_at(TimeTag::from_millis(60_000)), Some("♪"));
}

#[test]
fn next_line() {
    let lrc = lyrics();
    assert_eq!(
        lrc.next_after(TimeTag::from_millis(0)),
        Some((TimeTag::from_millis(1000), "first"))
    );
    assert_eq!(
        lrc.next_after(TimeTag::from_millis(1000)),
        Some((TimeTag::from_millis(4500), "second"))
    );
    assert_eq!(lrc.next_after(TimeTag::from_millis(9000)), None);
}

#[test]
fn duration_between_tags() {
    let a = TimeTag::from_millis(1500);
    let b = TimeTag::from_millis(4000);
    assert_eq!(b.duration_from(&a), Duration::from_millis(2500));
    assert_eq!(a.duration_from(&b), Duration::ZERO);
}
