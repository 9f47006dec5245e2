//! Turns display state into the text shown on the remote display.

use thiserror::Error;

use crate::state::DisplayState;

pub const PLAY_GLYPH: &str = "\u{25B6}";
pub const PAUSE_GLYPH: &str = "\u{23F8}";
pub const MIC_GLYPH: &str = "\u{1F3A4}";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("unknown template field {{{0}}}")]
    UnknownField(String),
    #[error("unbalanced brace at byte {0}")]
    UnbalancedBrace(usize),
}

/// How an engine renders its state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Formatter {
    /// The bare lyric line
    Plain,
    /// Play status, song, artist and lyric laid out by a user template
    Rich { template: Option<String> },
}

/// Values available to a [`Formatter::Rich`] template
#[derive(Debug, Default, PartialEq, Eq)]
struct Fields<'a> {
    status: &'a str,
    name: &'a str,
    artist: &'a str,
    mic: &'a str,
    lyrics: &'a str,
}

impl<'a> Fields<'a> {
    fn get(&self, key: &str) -> Option<&'a str> {
        match key {
            "status" => Some(self.status),
            "name" => Some(self.name),
            "artist" => Some(self.artist),
            "mic" => Some(self.mic),
            "lyrics" => Some(self.lyrics),
            _ => None,
        }
    }

    fn default_layout(&self) -> String {
        format!(
            "{} {} - {}\n{} {}",
            self.status, self.name, self.artist, self.mic, self.lyrics
        )
        .trim()
        .to_owned()
    }
}

/// Substitute `{field}` placeholders. `{{` and `}}` produce literal braces.
fn render_template<'a>(
    template: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '{' if chars.next_if(|&(_, c)| c == '{').is_some() => out.push('{'),
            '}' if chars.next_if(|&(_, c)| c == '}').is_some() => out.push('}'),
            '}' => return Err(TemplateError::UnbalancedBrace(i)),
            '{' => {
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some((_, '}')) => break,
                        Some((j, '{')) => return Err(TemplateError::UnbalancedBrace(j)),
                        Some((_, c)) => key.push(c),
                        None => return Err(TemplateError::UnbalancedBrace(i)),
                    }
                }
                out.push_str(lookup(&key).ok_or(TemplateError::UnknownField(key))?);
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

impl Formatter {
    #[must_use]
    pub const fn rich(template: Option<String>) -> Self {
        Self::Rich { template }
    }

    /// Text for the next message, or `None` if nothing should be sent yet.
    #[must_use]
    pub fn format(&self, state: &DisplayState, explicit: Option<&str>) -> Option<String> {
        let track = state.track.as_ref()?;
        match self {
            Self::Plain => Some(state.resolve_lyric(explicit).to_owned()),
            Self::Rich { template } => {
                let lyric = if state.playing() {
                    match explicit {
                        Some(l) => l,
                        None => state.last_lyric.as_deref().unwrap_or_default(),
                    }
                } else {
                    ""
                };
                let fields = Fields {
                    status: if state.playing() { PLAY_GLYPH } else { PAUSE_GLYPH },
                    name: &track.name,
                    artist: track.first_artist(),
                    mic: if lyric.is_empty() { "" } else { MIC_GLYPH },
                    lyrics: lyric,
                };
                let Some(template) = template else {
                    return Some(fields.default_layout());
                };
                match render_template(template, |k| fields.get(k)) {
                    Ok(text) => Some(text.trim().to_owned()),
                    Err(e) => {
                        tracing::debug!(%e, %template, "Falling back to default chatbox layout");
                        Some(fields.default_layout())
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::tests::snapshot;

    fn playing_state(lyric: Option<&str>) -> DisplayState {
        let mut state = DisplayState::default();
        state.apply_song(snapshot("Song", true, lyric));
        state
    }

    #[test]
    fn no_track_suppresses_message() {
        let state = DisplayState::default();
        assert_eq!(Formatter::Plain.format(&state, Some("x")), None);
        assert_eq!(Formatter::rich(None).format(&state, Some("x")), None);
    }

    #[test]
    fn plain_uses_resolved_lyric() {
        let mut state = playing_state(Some("line"));
        assert_eq!(Formatter::Plain.format(&state, None).as_deref(), Some("line"));
        assert_eq!(Formatter::Plain.format(&state, Some("")).as_deref(), Some(""));
        state.apply_is_playing(false);
        assert_eq!(Formatter::Plain.format(&state, None).as_deref(), Some(""));
    }

    #[test]
    fn rich_default_layout() {
        let state = playing_state(Some("la la"));
        assert_eq!(
            Formatter::rich(None).format(&state, None).as_deref(),
            Some("\u{25B6} Song - Song artist\n\u{1F3A4} la la")
        );
    }

    #[test]
    fn rich_hides_lyric_when_paused() {
        let mut state = playing_state(Some("la la"));
        state.apply_is_playing(false);
        assert_eq!(
            Formatter::rich(None).format(&state, Some("ignored")).as_deref(),
            Some("\u{23F8} Song - Song artist")
        );
    }

    #[test]
    fn rich_explicit_blank_hides_mic() {
        let state = playing_state(Some("la la"));
        assert_eq!(
            Formatter::rich(None).format(&state, Some("")).as_deref(),
            Some("\u{25B6} Song - Song artist")
        );
    }

    #[test]
    fn rich_custom_template() {
        let state = playing_state(Some("la la"));
        let formatter = Formatter::rich(Some("  {{{status}}} {artist} | {name}\n{mic}{lyrics}  ".into()));
        assert_eq!(
            formatter.format(&state, None).as_deref(),
            Some("{\u{25B6}} Song artist | Song\n\u{1F3A4}la la")
        );
    }

    #[test]
    fn rich_unknown_field_falls_back() {
        let state = playing_state(Some("la la"));
        let expected = Formatter::rich(None).format(&state, None);
        for template in ["{status} {album}", "{name", "name}", "{}"] {
            assert_eq!(
                Formatter::rich(Some(template.into())).format(&state, None),
                expected,
                "{template}"
            );
        }
    }

    #[test]
    fn template_errors() {
        let lookup = |k: &str| (k == "a").then_some("A");
        assert_eq!(render_template("x{a}y", lookup), Ok("xAy".to_owned()));
        assert_eq!(
            render_template("{b}", lookup),
            Err(TemplateError::UnknownField("b".to_owned()))
        );
        assert_eq!(render_template("a}", lookup), Err(TemplateError::UnbalancedBrace(1)));
        assert_eq!(render_template("{a", lookup), Err(TemplateError::UnbalancedBrace(0)));
    }
}
