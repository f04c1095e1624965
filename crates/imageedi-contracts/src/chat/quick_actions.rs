#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuickAction {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_ACTIONS: &[QuickAction] = &[
    QuickAction {
        label: "Sketch",
        prompt: "Convert this image into a pencil sketch.",
    },
    QuickAction {
        label: "Cyberpunk",
        prompt: "Apply a cyberpunk aesthetic with neon lights and dark tones.",
    },
    QuickAction {
        label: "Enhance",
        prompt: "Enhance the details and clarity of this image.",
    },
    QuickAction {
        label: "Oil Painting",
        prompt: "Transform this image into a classic oil painting style.",
    },
    QuickAction {
        label: "Surprise Me",
        prompt: "Make a creative and random artistic change to this image.",
    },
];

/// Case-insensitive lookup; `oil_painting` and `oil painting` both match.
pub fn find_quick_action(label: &str) -> Option<&'static QuickAction> {
    let wanted = normalize_label(label);
    if wanted.is_empty() {
        return None;
    }
    QUICK_ACTIONS
        .iter()
        .find(|action| normalize_label(action.label) == wanted)
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_ascii_lowercase()
        .split(|ch: char| ch.is_whitespace() || ch == '_' || ch == '-')
        .filter(|part| !part.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::find_quick_action;

    #[test]
    fn finds_actions_by_loose_label() {
        let action = find_quick_action("oil_painting").map(|action| action.label);
        assert_eq!(action, Some("Oil Painting"));
        assert_eq!(
            find_quick_action("  SKETCH ").map(|action| action.prompt),
            Some("Convert this image into a pencil sketch.")
        );
        assert!(find_quick_action("surprise-me").is_some());
        assert!(find_quick_action("watercolor").is_none());
        assert!(find_quick_action("").is_none());
    }
}
