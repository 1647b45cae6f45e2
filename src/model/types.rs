//! The closed set of types a Python annotation can be mapped to.

use std::fmt;

/// Largest tuple the generated code can marshal as a Rust tuple.
pub const MAX_TUPLE_ARITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scalar {
    Integer,
    Float,
    Text,
    Boolean,
    Bytes,
    None,
}

impl Scalar {
    pub fn python_name(self) -> &'static str {
        match self {
            Scalar::Integer => "int",
            Scalar::Float => "float",
            Scalar::Text => "str",
            Scalar::Boolean => "bool",
            Scalar::Bytes => "bytes",
            Scalar::None => "None",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    Sequence,
    Mapping,
    Tuple,
    Set,
}

/// Number of type arguments a container accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(expected) => n == expected,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exactly(1) => write!(f, "1 type argument"),
            Arity::Exactly(n) => write!(f, "{n} type arguments"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi} type arguments"),
        }
    }
}

impl Container {
    pub fn arity(self) -> Arity {
        match self {
            Container::Sequence | Container::Set => Arity::Exactly(1),
            Container::Mapping => Arity::Exactly(2),
            Container::Tuple => Arity::Between(1, MAX_TUPLE_ARITY),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDescriptor {
    Scalar(Scalar),
    Generic(Container, Vec<TypeDescriptor>),
    Optional(Box<TypeDescriptor>),
    Union(Vec<TypeDescriptor>),
    Unknown,
}

impl TypeDescriptor {
    /// Builds a generic type, refusing argument lists the container can't hold.
    pub fn generic(container: Container, args: Vec<TypeDescriptor>) -> Option<Self> {
        container
            .arity()
            .accepts(args.len())
            .then(|| TypeDescriptor::Generic(container, args))
    }

    pub fn sequence_of(item: TypeDescriptor) -> Self {
        TypeDescriptor::Generic(Container::Sequence, vec![item])
    }

    pub fn mapping_of(key: TypeDescriptor, value: TypeDescriptor) -> Self {
        TypeDescriptor::Generic(Container::Mapping, vec![key, value])
    }

    pub fn optional(inner: TypeDescriptor) -> Self {
        TypeDescriptor::Optional(Box::new(inner))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, TypeDescriptor::Unknown)
    }

    /// Whether the Rust rendering of this type implements `Eq + Hash`,
    /// which decides between hashed and list-backed collections.
    pub fn is_hashable(&self) -> bool {
        match self {
            TypeDescriptor::Scalar(Scalar::Float) => false,
            TypeDescriptor::Scalar(_) => true,
            TypeDescriptor::Generic(Container::Tuple, items) => {
                items.iter().all(TypeDescriptor::is_hashable)
            }
            TypeDescriptor::Generic(..) => false,
            TypeDescriptor::Optional(inner) => inner.is_hashable(),
            TypeDescriptor::Union(_) | TypeDescriptor::Unknown => false,
        }
    }
}

/// Python spelling, used in diagnostics and generated docs.
impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, items: &[TypeDescriptor], sep: &str) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(sep)?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            TypeDescriptor::Scalar(s) => f.write_str(s.python_name()),
            TypeDescriptor::Generic(container, args) => {
                let name = match container {
                    Container::Sequence => "list",
                    Container::Mapping => "dict",
                    Container::Tuple => "tuple",
                    Container::Set => "set",
                };
                write!(f, "{name}[")?;
                join(f, args, ", ")?;
                f.write_str("]")
            }
            TypeDescriptor::Optional(inner) => write!(f, "{inner} | None"),
            TypeDescriptor::Union(items) => join(f, items, " | "),
            TypeDescriptor::Unknown => f.write_str("Any"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generic_checks_arity() {
        let int = TypeDescriptor::Scalar(Scalar::Integer);
        let cases = vec![
            (Container::Sequence, 1, true),
            (Container::Sequence, 2, false),
            (Container::Mapping, 2, true),
            (Container::Mapping, 3, false),
            (Container::Tuple, 0, false),
            (Container::Tuple, 8, true),
            (Container::Tuple, 9, false),
            (Container::Set, 1, true),
        ];

        for (container, n, ok) in cases {
            let built = TypeDescriptor::generic(container, vec![int.clone(); n]);
            assert_eq!(built.is_some(), ok, "{container:?} with {n} args");
        }
    }

    #[test]
    fn hashability_follows_rust_rendering() {
        let float = TypeDescriptor::Scalar(Scalar::Float);
        let text = TypeDescriptor::Scalar(Scalar::Text);

        assert!(text.is_hashable());
        assert!(!float.is_hashable());
        assert!(TypeDescriptor::Generic(Container::Tuple, vec![text.clone(), text.clone()]).is_hashable());
        assert!(!TypeDescriptor::Generic(Container::Tuple, vec![text.clone(), float]).is_hashable());
        assert!(!TypeDescriptor::sequence_of(text.clone()).is_hashable());
        assert!(TypeDescriptor::optional(text).is_hashable());
        assert!(!TypeDescriptor::Unknown.is_hashable());
    }

    #[test]
    fn displays_python_spelling() {
        let ty = TypeDescriptor::mapping_of(
            TypeDescriptor::Scalar(Scalar::Text),
            TypeDescriptor::optional(TypeDescriptor::sequence_of(TypeDescriptor::Unknown)),
        );
        assert_eq!(ty.to_string(), "dict[str, list[Any] | None]");
    }
}
