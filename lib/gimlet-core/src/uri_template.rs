//! URI templates of generated endpoints.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::{Error, Params, Result};

/// Characters escaped inside a single path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// An operation path with `{name}` placeholders, e.g. `/pets/{petId}`.
///
/// # Example
///
/// ```
/// use gimlet_core::UriTemplate;
///
/// let template = UriTemplate::new("/owners/{owner}/pets/{id}");
/// let uri = template.expand(&[("owner", "ann lee"), ("id", "7")]).expect("expand");
///
/// assert_eq!(uri, "/owners/ann%20lee/pets/7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UriTemplate(&'static str);

impl UriTemplate {
    /// Create a new URI template.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    /// Get the template string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        self.0
    }

    /// Substitute every placeholder with its percent-encoded value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if a placeholder has no value or a
    /// brace is left unclosed.
    pub fn expand(&self, values: &[(&str, &str)]) -> Result<String> {
        self.render(|name| {
            values
                .iter()
                .find_map(|(key, value)| (*key == name).then_some(*value))
        })
        .map(|(expanded, _)| expanded)
    }

    /// Expand from endpoint params, returning the params left for the query.
    ///
    /// Every param named by a placeholder goes into the path and is removed
    /// from the returned map.
    ///
    /// # Errors
    ///
    /// Same as [`expand`](Self::expand).
    pub fn expand_params(&self, mut params: Params) -> Result<(String, Params)> {
        let (expanded, used) = self.render(|name| params.get(name).map(String::as_str))?;
        for name in used {
            params.remove(name);
        }
        Ok((expanded, params))
    }

    fn render<'v>(
        &self,
        lookup: impl Fn(&str) -> Option<&'v str>,
    ) -> Result<(String, Vec<&'static str>)> {
        let mut expanded = String::with_capacity(self.0.len());
        let mut used = Vec::new();
        let mut rest = self.0;

        while let Some(start) = rest.find('{') {
            let (head, tail) = rest.split_at(start);
            expanded.push_str(head);

            let end = tail.find('}').ok_or_else(|| {
                Error::configuration(format!("unclosed placeholder in {:?}", self.0))
            })?;
            let name = tail.get(1..end).unwrap_or_default();
            let value = lookup(name).ok_or_else(|| {
                Error::configuration(format!("missing value for {{{name}}} in {:?}", self.0))
            })?;

            expanded.extend(utf8_percent_encode(value, PATH_SEGMENT));
            used.push(name);
            rest = tail.get(end + 1..).unwrap_or_default();
        }

        expanded.push_str(rest);
        Ok((expanded, used))
    }
}

impl std::fmt::Display for UriTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for UriTemplate {
    fn as_ref(&self) -> &str {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_without_placeholders() {
        let template = UriTemplate::new("/pets");
        assert_eq!(template.expand(&[]).expect("expand"), "/pets");
    }

    #[test]
    fn expand_encodes_segment_separators() {
        let template = UriTemplate::new("/files/{path}/raw");
        assert_eq!(
            template.expand(&[("path", "a/b?c")]).expect("expand"),
            "/files/a%2Fb%3Fc/raw"
        );
    }

    #[test]
    fn expand_missing_value_is_configuration_error() {
        let template = UriTemplate::new("/pets/{id}");
        let err = template.expand(&[("name", "x")]).expect_err("missing");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("{id}"), "{err}");
    }

    #[test]
    fn expand_unclosed_placeholder_is_configuration_error() {
        let template = UriTemplate::new("/pets/{id");
        assert!(template.expand(&[("id", "1")]).is_err());
    }

    #[test]
    fn expand_params_moves_placeholders_out_of_the_query() {
        let template = UriTemplate::new("/owners/{owner}/pets/{petId}");
        let params = Params::from([
            ("owner".to_string(), "ann".to_string()),
            ("petId".to_string(), "7".to_string()),
            ("fields".to_string(), "name".to_string()),
        ]);

        let (uri, rest) = template.expand_params(params).expect("expand");

        assert_eq!(uri, "/owners/ann/pets/7");
        assert_eq!(rest, Params::from([("fields".to_string(), "name".to_string())]));
    }

    #[test]
    fn expand_params_missing_value_is_configuration_error() {
        let template = UriTemplate::new("/pets/{petId}");
        let err = template
            .expand_params(Params::from([("limit".to_string(), "5".to_string())]))
            .expect_err("missing");
        assert!(err.is_configuration());
        assert!(err.to_string().contains("{petId}"), "{err}");
    }

    #[test]
    fn template_as_ref() {
        let template = UriTemplate::new("/users/{id}");
        let s: &str = template.as_ref();
        assert_eq!(s, "/users/{id}");
        assert_eq!(template.to_string(), "/users/{id}");
    }
}
