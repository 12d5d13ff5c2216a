use std::any::type_name;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use patchgate_core::{AppError, AppResult};

/// Route parameters of a single-resource request.
///
/// Parameters captured by a router and parameters synthesized for a batch
/// operation are read the same way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    values: BTreeMap<String, String>,
}

impl PathParams {
    /// Creates an empty parameter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a parameter.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    /// Returns the raw value of a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Parses a required parameter.
    pub fn parse<T>(&self, name: &str) -> AppResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        let value = self
            .get(name)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| AppError::bad_request(format!("route parameter ({name}) is required")))?;

        value.parse::<T>().map_err(|error| {
            AppError::bad_request(format!(
                "param {name}={value} is not a valid {}. err: {error}",
                short_type_name::<T>()
            ))
        })
    }

    /// Iterates parameters in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true when no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PathParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }
}

fn short_type_name<T>() -> &'static str {
    let name = type_name::<T>();
    name.rsplit("::").next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use patchgate_core::AppError;

    use super::PathParams;

    #[test]
    fn parses_typed_parameters() {
        let params = PathParams::from_iter([("id", "10"), ("active", "true")]);

        assert!(matches!(params.parse::<u64>("id"), Ok(10)));
        assert!(matches!(params.parse::<bool>("active"), Ok(true)));
        assert_eq!(params.get("id"), Some("10"));
    }

    #[test]
    fn missing_parameter_is_required() {
        let params = PathParams::new();

        let result = params.parse::<u64>("id");
        assert!(matches!(
            result,
            Err(error) if error.message() == Some("route parameter (id) is required")
        ));
    }

    #[test]
    fn invalid_parameter_names_the_type() {
        let params = PathParams::from_iter([("id", "ten")]);

        let Err(AppError::BadRequest { message, .. }) = params.parse::<i64>("id") else {
            panic!("expected a bad request");
        };
        assert!(message.starts_with("param id=ten is not a valid i64"));
    }
}
