//! Directive values and the input normalization performed at the API boundary.

/// Stored value of an enabled directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveValue {
    /// Value of a boolean-grammar directive
    Flag(bool),
    /// Source expressions or tokens in insertion order. May contain
    /// duplicates; they are removed on read.
    Sources(Vec<String>),
}

/// Value accepted by [`Policy::set_directive`](crate::Policy::set_directive)
/// and [`Policy::append_directive`](crate::Policy::append_directive).
///
/// Strings are split on runs of whitespace, so `"'self' https:"` and
/// `vec!["'self'", "https:"]` are equivalent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectiveInput {
    Flag(bool),
    Sources(Vec<String>),
}

impl DirectiveInput {
    /// An empty source list.
    pub fn empty() -> Self {
        DirectiveInput::Sources(Vec::new())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, DirectiveInput::Sources(s) if s.is_empty())
    }

    fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        DirectiveInput::Sources(split_tokens(tokens))
    }
}

/// Split every item on whitespace and flatten into one token list.
pub(crate) fn split_tokens<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .flat_map(|item| {
            item.as_ref()
                .split_whitespace()
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .collect()
}

impl From<bool> for DirectiveInput {
    fn from(value: bool) -> Self {
        DirectiveInput::Flag(value)
    }
}

impl From<&str> for DirectiveInput {
    fn from(value: &str) -> Self {
        Self::from_tokens([value])
    }
}

impl From<String> for DirectiveInput {
    fn from(value: String) -> Self {
        Self::from_tokens([value])
    }
}

impl From<&String> for DirectiveInput {
    fn from(value: &String) -> Self {
        Self::from_tokens([value])
    }
}

impl From<Vec<String>> for DirectiveInput {
    fn from(value: Vec<String>) -> Self {
        Self::from_tokens(value)
    }
}

impl From<Vec<&str>> for DirectiveInput {
    fn from(value: Vec<&str>) -> Self {
        Self::from_tokens(value)
    }
}

impl From<&[String]> for DirectiveInput {
    fn from(value: &[String]) -> Self {
        Self::from_tokens(value)
    }
}

impl From<&[&str]> for DirectiveInput {
    fn from(value: &[&str]) -> Self {
        Self::from_tokens(value)
    }
}

impl<const N: usize> From<[&str; N]> for DirectiveInput {
    fn from(value: [&str; N]) -> Self {
        Self::from_tokens(value)
    }
}

impl<const N: usize> From<[String; N]> for DirectiveInput {
    fn from(value: [String; N]) -> Self {
        Self::from_tokens(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_is_split_on_whitespace() {
        assert_eq!(
            DirectiveInput::from("  'self'\thttps://a.com \n data: "),
            DirectiveInput::Sources(vec![
                "'self'".to_string(),
                "https://a.com".to_string(),
                "data:".to_string(),
            ])
        );
    }

    #[test]
    fn test_list_items_are_normalized() {
        let input = DirectiveInput::from(vec!["'self' blob:", "", "a.com"]);
        assert_eq!(
            input,
            DirectiveInput::Sources(vec![
                "'self'".to_string(),
                "blob:".to_string(),
                "a.com".to_string(),
            ])
        );
    }

    #[test]
    fn test_empty_inputs() {
        assert!(DirectiveInput::from("   ").is_empty());
        assert!(DirectiveInput::from(Vec::<String>::new()).is_empty());
        assert!(DirectiveInput::empty().is_empty());
        assert!(!DirectiveInput::from(false).is_empty());
    }
}
