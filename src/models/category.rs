use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub color: Option<String>,
}

/// §4.14: fixed 14-entry display-name map; anything else falls back to title-case.
pub fn display_name(category_id: &str) -> String {
    const NAMES: &[(&str, &str)] = &[
        ("politics", "Politics"),
        ("business", "Business"),
        ("technology", "Technology"),
        ("sports", "Sports"),
        ("entertainment", "Entertainment"),
        ("health", "Health"),
        ("science", "Science"),
        ("world", "World"),
        ("africa", "Africa"),
        ("opinion", "Opinion"),
        ("lifestyle", "Lifestyle"),
        ("education", "Education"),
        ("environment", "Environment"),
        ("crime", "Crime"),
    ];
    NAMES
        .iter()
        .find(|(id, _)| *id == category_id)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| title_case(category_id))
}

fn title_case(s: &str) -> String {
    s.split(|c: char| c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
