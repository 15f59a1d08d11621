use std::fmt;

/// Full name of a record, enum or fixed schema.
///
/// Two names are equal when both the short name and the namespace are equal,
/// so `Name::qualify("a.b.C", None)` equals `Name::new("C", Some("a.b"))`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name {
    pub name: String,
    pub namespace: Option<String>,
}

impl Name {
    pub fn new(name: impl Into<String>, namespace: Option<&str>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.filter(|ns| !ns.is_empty()).map(str::to_string),
        }
    }

    /// Qualify `raw` against `enclosing`.
    ///
    /// A dotted name is used verbatim; a bare name inherits `enclosing`.
    pub fn qualify(raw: &str, enclosing: Option<&str>) -> Self {
        match raw.rsplit_once('.') {
            Some((namespace, name)) => Self::new(name, Some(namespace)),
            None => Self::new(raw, enclosing),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn fullname(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}.{}", self.name),
            None => self.name.clone(),
        }
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{ns}.{}", self.name),
            None => f.write_str(&self.name),
        }
    }
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Dot-separated identifiers.
pub fn is_valid_fullname(s: &str) -> bool {
    s.split('.').all(is_valid_identifier)
}

/// Like [`is_valid_fullname`], but the empty string (null namespace) is allowed.
pub fn is_valid_namespace(s: &str) -> bool {
    s.is_empty() || is_valid_fullname(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qualify_uses_dotted_name_verbatim() {
        let name = Name::qualify("a.b.C", Some("x.y"));
        assert_eq!(name, Name::new("C", Some("a.b")));
        assert_eq!(name.fullname(), "a.b.C");
    }

    #[test]
    fn qualify_inherits_enclosing_namespace() {
        assert_eq!(Name::qualify("C", Some("x")).to_string(), "x.C");
        assert_eq!(Name::qualify("C", Some("")).namespace(), None);
        assert_eq!(Name::qualify("C", None).to_string(), "C");
    }

    #[test]
    fn identifier_rules() {
        assert!(is_valid_identifier("_a1"));
        assert!(!is_valid_identifier("1a"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("a-b"));
        assert!(is_valid_fullname("org.example.Rec"));
        assert!(!is_valid_fullname("org..Rec"));
        assert!(is_valid_namespace(""));
    }
}
