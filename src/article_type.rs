use serde::{Deserialize, Serialize};

/// Kind of article to write.
///
/// Unrecognised tags deserialize to [`ArticleType::General`] rather than
/// failing, so the resolver below never needs an error path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ArticleType {
    Blog,
    Tutorial,
    Review,
    Opinion,
    #[default]
    General,
}

impl ArticleType {
    pub const ALL: [ArticleType; 5] = [
        ArticleType::Blog,
        ArticleType::Tutorial,
        ArticleType::Review,
        ArticleType::Opinion,
        ArticleType::General,
    ];

    /// Normalize a free-form tag, falling back to `General`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.trim().to_ascii_lowercase().as_str() {
            "blog" => ArticleType::Blog,
            "tutorial" => ArticleType::Tutorial,
            "review" => ArticleType::Review,
            "opinion" => ArticleType::Opinion,
            _ => ArticleType::General,
        }
    }

    /// Category label used inside prompts.
    pub fn describe(self) -> &'static str {
        match self {
            ArticleType::Blog => "blog post",
            ArticleType::Tutorial => "step-by-step tutorial",
            ArticleType::Review => "critical review",
            ArticleType::Opinion => "opinion piece",
            ArticleType::General => "general article",
        }
    }
}

impl From<String> for ArticleType {
    fn from(tag: String) -> Self {
        ArticleType::from_tag(&tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_type_has_label() {
        for ty in ArticleType::ALL {
            assert!(!ty.describe().is_empty());
        }
    }

    #[test]
    fn test_from_tag_normalizes() {
        assert_eq!(ArticleType::from_tag("Tutorial"), ArticleType::Tutorial);
        assert_eq!(ArticleType::from_tag(" review "), ArticleType::Review);
        assert_eq!(ArticleType::from_tag("poem"), ArticleType::General);
        assert_eq!(ArticleType::from_tag(""), ArticleType::General);
    }

    #[test]
    fn test_unknown_tag_deserializes_to_general() {
        let ty: ArticleType = serde_json::from_str("\"listicle\"").unwrap();
        assert_eq!(ty, ArticleType::General);
        let ty: ArticleType = serde_json::from_str("\"blog\"").unwrap();
        assert_eq!(ty, ArticleType::Blog);
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ArticleType::Opinion).unwrap(),
            "\"opinion\""
        );
    }
}
