// src/utils/html.rs

/// Sanitises explanation prose before it is stored.
///
/// Explanations come from admins or the tutor and may be rendered as rich text,
/// so safe formatting tags survive while scripts and event handlers are removed.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
