use crate::error::TemplateError;

/// What a `#{...}` placeholder accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placeholder {
    /// `#{}` or `#{any()}`
    Any,
    /// `#{any(T)}`: the argument must be assignable to `T`.
    AnyOf(String),
    /// `#{anyArray()}`
    AnyArray,
}

impl Placeholder {
    pub(crate) fn describe(&self) -> String {
        match self {
            Self::Any => "any()".to_string(),
            Self::AnyOf(ty) => format!("any({ty})"),
            Self::AnyArray => "anyArray()".to_string(),
        }
    }
}

/// Name of the parameter standing in for placeholder `index`.
pub(crate) fn parameter_name(index: usize) -> String {
    format!("__p{index}__")
}

/// Inverse of [`parameter_name`].
pub(crate) fn parameter_index(name: &str) -> Option<usize> {
    name.strip_prefix("__p")?.strip_suffix("__")?.parse().ok()
}

/// Replace every placeholder in `code` by its parameter name, in order.
pub(crate) fn substitute(code: &str) -> Result<(String, Vec<Placeholder>), TemplateError> {
    let malformed = |offset: usize| TemplateError::MalformedPlaceholder {
        code: code.to_string(),
        offset,
    };

    let mut out = String::with_capacity(code.len());
    let mut placeholders = Vec::new();
    let mut rest = code;
    let mut consumed = 0;
    while let Some(start) = rest.find("#{") {
        out.push_str(&rest[..start]);
        let offset = consumed + start;
        let body_start = start + 2;
        let end = rest[body_start..].find('}').ok_or_else(|| malformed(offset))?;
        let body = rest[body_start..body_start + end].trim();
        let placeholder = match body {
            "" | "any()" => Placeholder::Any,
            "anyArray()" => Placeholder::AnyArray,
            other => {
                let ty = other
                    .strip_prefix("any(")
                    .and_then(|t| t.strip_suffix(')'))
                    .map(str::trim)
                    .filter(|t| !t.is_empty() && t.chars().all(|c| c.is_alphanumeric() || "._$[]".contains(c)))
                    .ok_or_else(|| malformed(offset))?;
                Placeholder::AnyOf(ty.to_string())
            }
        };
        out.push_str(&parameter_name(placeholders.len()));
        placeholders.push(placeholder);
        let next = body_start + end + 1;
        consumed += next;
        rest = &rest[next..];
    }
    out.push_str(rest);
    Ok((out, placeholders))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholders_become_parameters() {
        let template = "assertThat(#{any()}).as(#{any(java.lang.String)}).containsExactly(#{anyArray()}, #{})";
        let (code, placeholders) = substitute(template).unwrap();
        assert_eq!(code, "assertThat(__p0__).as(__p1__).containsExactly(__p2__, __p3__)");
        assert_eq!(
            placeholders,
            vec![
                Placeholder::Any,
                Placeholder::AnyOf("java.lang.String".into()),
                Placeholder::AnyArray,
                Placeholder::Any,
            ]
        );
    }

    #[test]
    fn malformed_placeholders_report_offset() {
        match substitute("foo(#{nope()})") {
            Err(TemplateError::MalformedPlaceholder { offset, .. }) => assert_eq!(offset, 4),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            substitute("foo(#{any()"),
            Err(TemplateError::MalformedPlaceholder { offset: 4, .. })
        ));
    }

    #[test]
    fn parameter_names_round_trip() {
        assert_eq!(parameter_index(&parameter_name(12)), Some(12));
        assert_eq!(parameter_index("__p__"), None);
        assert_eq!(parameter_index("p1"), None);
    }
}
