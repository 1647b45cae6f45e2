//! Assembles the arguments of one call from the generated code's plan.

use super::error::RuntimeError;
use super::value::Value;

/// Arguments in the shape Python receives them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<Value>,
    /// Sorted by name.
    pub keywords: Vec<(String, Value)>,
}

/// Collects arguments in declaration order.
///
/// `None` leaves an argument out so the Python default applies. Once a
/// positional argument is left out, later ones can only be passed by
/// keyword.
#[derive(Debug, Default)]
pub struct CallArgs {
    positional: Vec<Value>,
    keywords: Vec<(String, Value)>,
    gap: Option<String>,
    error: Option<RuntimeError>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn positional(&mut self, name: &str, value: Option<Value>) -> &mut Self {
        match (value, &self.gap) {
            (None, None) => self.gap = Some(name.to_string()),
            (None, Some(_)) => {}
            (Some(value), None) => self.positional.push(value),
            (Some(value), Some(_)) => self.keywords.push((name.to_string(), value)),
        }
        self
    }

    pub fn positional_only(&mut self, name: &str, value: Option<Value>) -> &mut Self {
        match (value, &self.gap) {
            (None, None) => self.gap = Some(name.to_string()),
            (None, Some(_)) => {}
            (Some(value), None) => self.positional.push(value),
            (Some(_), Some(gap)) => {
                let message =
                    format!("`{name}` is positional-only and can't be passed after omitting `{gap}`");
                self.fail(message);
            }
        }
        self
    }

    pub fn keyword(&mut self, name: &str, value: Option<Value>) -> &mut Self {
        if let Some(value) = value {
            self.keywords.push((name.to_string(), value));
        }
        self
    }

    /// Extra positional arguments for `*args`.
    pub fn variadic(&mut self, values: impl IntoIterator<Item = Value>) -> &mut Self {
        let values: Vec<Value> = values.into_iter().collect();
        if values.is_empty() {
            return self;
        }
        match &self.gap {
            None => self.positional.extend(values),
            Some(gap) => {
                let message = format!("extra positional arguments need a value for `{gap}`");
                self.fail(message);
            }
        }
        self
    }

    /// Extra keyword arguments for `**kwargs`.
    pub fn variadic_keywords(
        &mut self,
        entries: impl IntoIterator<Item = (String, Value)>,
    ) -> &mut Self {
        self.keywords.extend(entries);
        self
    }

    pub fn finish(mut self) -> Result<Arguments, RuntimeError> {
        if let Some(error) = self.error {
            return Err(error);
        }

        self.keywords.sort_by(|a, b| a.0.cmp(&b.0));
        if let Some(pair) = self.keywords.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(RuntimeError::Arguments(format!(
                "`{}` is passed more than once",
                pair[0].0
            )));
        }

        Ok(Arguments {
            positional: self.positional,
            keywords: self.keywords,
        })
    }

    fn fail(&mut self, message: String) {
        self.error.get_or_insert(RuntimeError::Arguments(message));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Option<Value> {
        Some(Value::Int(v))
    }

    fn keywords(args: &Arguments) -> Vec<&str> {
        args.keywords.iter().map(|(k, _)| k.as_str()).collect()
    }

    #[test]
    fn test_positional_after_gap_becomes_keyword() {
        let mut call = CallArgs::new();
        call.positional("a", int(1))
            .positional("b", None)
            .positional("c", int(3))
            .keyword("d", int(4))
            .keyword("e", None);
        let args = call.finish().unwrap();

        assert_eq!(args.positional, vec![Value::Int(1)]);
        assert_eq!(keywords(&args), vec!["c", "d"]);
    }

    #[test]
    fn test_variadics() {
        let mut call = CallArgs::new();
        call.positional("a", int(1))
            .variadic(vec![Value::Int(2), Value::Int(3)])
            .variadic_keywords(vec![("z".to_string(), Value::None), ("y".to_string(), Value::None)]);
        let args = call.finish().unwrap();

        assert_eq!(args.positional.len(), 3);
        assert_eq!(keywords(&args), vec!["y", "z"]);
    }

    #[test]
    fn test_invalid_combinations() {
        let test_cases: Vec<(&str, Box<dyn Fn(&mut CallArgs)>)> = vec![
            (
                "positional-only",
                Box::new(|call: &mut CallArgs| {
                    call.positional_only("a", None).positional_only("b", int(2));
                }),
            ),
            (
                "need a value for `a`",
                Box::new(|call: &mut CallArgs| {
                    call.positional("a", None).variadic(vec![Value::None]);
                }),
            ),
            (
                "`k` is passed more than once",
                Box::new(|call: &mut CallArgs| {
                    call.keyword("k", int(1))
                        .variadic_keywords(vec![("k".to_string(), Value::None)]);
                }),
            ),
        ];

        for (expected, marshal) in test_cases {
            let mut call = CallArgs::new();
            marshal(&mut call);
            let err = call.finish().unwrap_err();
            assert!(err.to_string().contains(expected), "{err}");
        }
    }

    #[test]
    fn test_empty_variadic_after_gap_is_fine() {
        let mut call = CallArgs::new();
        call.positional("a", None).variadic(Vec::new());
        assert_eq!(call.finish().unwrap(), Arguments::default());
    }
}
