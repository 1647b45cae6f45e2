//! Maps parsed annotations onto `TypeDescriptor`s.
//!
//! The mapping is total: every input yields exactly one descriptor, and
//! anything unsupported becomes `Unknown`, at worst with a warning. Nothing
//! here looks at interpreter state.

use crate::model::types::MAX_TUPLE_ARITY;
use crate::model::{Annotation, Container, GeneratorError, Scalar, TypeDescriptor, TypeExpr};

/// Module prefixes whose members are resolved by their final name.
const KNOWN_MODULES: &[&str] = &["typing", "typing_extensions", "collections.abc", "builtins"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mapped {
    pub ty: TypeDescriptor,
    /// Warning-class diagnostics for degraded annotations.
    pub warnings: Vec<GeneratorError>,
}

pub fn map_annotation(annotation: Option<&Annotation>) -> Mapped {
    let Some(annotation) = annotation else {
        return Mapped {
            ty: TypeDescriptor::Unknown,
            warnings: Vec::new(),
        };
    };

    let mut mapper = Mapper {
        annotation,
        warnings: Vec::new(),
    };
    let ty = mapper.map(&annotation.expr);
    Mapped {
        ty,
        warnings: mapper.warnings,
    }
}

fn scalar(name: &str) -> Option<Scalar> {
    match name {
        "int" => Some(Scalar::Integer),
        "float" => Some(Scalar::Float),
        "str" => Some(Scalar::Text),
        "bool" => Some(Scalar::Boolean),
        "bytes" => Some(Scalar::Bytes),
        "None" | "NoneType" => Some(Scalar::None),
        _ => None,
    }
}

fn container(name: &str) -> Option<Container> {
    match name {
        "list" | "List" | "Sequence" | "MutableSequence" | "Iterable" | "Collection" => {
            Some(Container::Sequence)
        }
        "dict" | "Dict" | "Mapping" | "MutableMapping" => Some(Container::Mapping),
        "tuple" | "Tuple" => Some(Container::Tuple),
        "set" | "Set" | "frozenset" | "FrozenSet" | "AbstractSet" | "MutableSet" => {
            Some(Container::Set)
        }
        _ => None,
    }
}

fn resolve(path: &[String]) -> Option<&str> {
    let (last, prefix) = path.split_last()?;
    if prefix.is_empty() || KNOWN_MODULES.contains(&prefix.join(".").as_str()) {
        Some(last.as_str())
    } else {
        None
    }
}

struct Mapper<'a> {
    annotation: &'a Annotation,
    warnings: Vec<GeneratorError>,
}

impl<'a> Mapper<'a> {
    fn warn(&mut self, message: String) -> TypeDescriptor {
        self.warnings
            .push(GeneratorError::warning(message, self.annotation.span));
        TypeDescriptor::Unknown
    }

    fn map(&mut self, expr: &TypeExpr) -> TypeDescriptor {
        match expr {
            TypeExpr::NoneLiteral => TypeDescriptor::Scalar(Scalar::None),
            TypeExpr::Name(path) => match resolve(path) {
                Some(name) => self.named(name, None),
                None => TypeDescriptor::Unknown,
            },
            TypeExpr::Subscript { base, args } => match resolve(base) {
                Some(name) => self.named(name, Some(args.as_slice())),
                None => TypeDescriptor::Unknown,
            },
            TypeExpr::BitOr(members) => {
                let members = members.iter().map(|m| self.map(m)).collect();
                union(members)
            }
            TypeExpr::Str(_) => TypeDescriptor::Unknown,
            TypeExpr::Opaque(text) => {
                self.warn(format!("unsupported annotation `{text}`, treated as Any"))
            }
            TypeExpr::Ellipsis | TypeExpr::List(_) | TypeExpr::Tuple(_) => self.warn(format!(
                "`{}` is not a type, treated as Any",
                self.annotation.text
            )),
        }
    }

    fn named(&mut self, name: &str, args: Option<&[TypeExpr]>) -> TypeDescriptor {
        if let Some(scalar) = scalar(name) {
            return match args {
                None => TypeDescriptor::Scalar(scalar),
                Some(_) => self.warn(format!("`{name}` does not take type arguments")),
            };
        }
        if let Some(container) = container(name) {
            return self.container(name, container, args);
        }

        match (name, args) {
            ("Optional", Some([inner])) => {
                let inner = self.map(inner);
                union(vec![inner, TypeDescriptor::Scalar(Scalar::None)])
            }
            ("Optional", Some(args)) => self.warn(format!(
                "`Optional` expects 1 type argument, found {}",
                args.len()
            )),
            ("Union", Some(args)) if !args.is_empty() => {
                let members = args.iter().map(|a| self.map(a)).collect();
                union(members)
            }
            ("Annotated", Some([inner, ..])) => self.map(inner),
            _ => TypeDescriptor::Unknown,
        }
    }

    fn container(
        &mut self,
        name: &str,
        container: Container,
        args: Option<&[TypeExpr]>,
    ) -> TypeDescriptor {
        let Some(args) = args else {
            return match container {
                Container::Mapping => {
                    TypeDescriptor::mapping_of(TypeDescriptor::Unknown, TypeDescriptor::Unknown)
                }
                Container::Tuple | Container::Sequence => {
                    TypeDescriptor::sequence_of(TypeDescriptor::Unknown)
                }
                Container::Set => TypeDescriptor::Generic(Container::Set, vec![TypeDescriptor::Unknown]),
            };
        };

        if container == Container::Tuple {
            match args {
                [item, TypeExpr::Ellipsis] => return TypeDescriptor::sequence_of(self.map(item)),
                [TypeExpr::Tuple(items)] if items.is_empty() => {
                    return self.warn("empty tuple types are not supported".to_string());
                }
                _ if args.len() > MAX_TUPLE_ARITY => {
                    return self.warn(format!(
                        "tuples longer than {MAX_TUPLE_ARITY} elements are not supported, found {}",
                        args.len()
                    ));
                }
                _ => {}
            }
        }

        let mapped: Vec<_> = args.iter().map(|a| self.map(a)).collect();
        let found = mapped.len();
        match TypeDescriptor::generic(container, mapped) {
            Some(ty) => ty,
            None => self.warn(format!(
                "`{name}` expects {}, found {found}",
                container.arity()
            )),
        }
    }
}

/// Folds union members: flattens, drops duplicates, and turns a two-way
/// union with `None` into `Optional`.
fn union(members: Vec<TypeDescriptor>) -> TypeDescriptor {
    fn push(ty: TypeDescriptor, flat: &mut Vec<TypeDescriptor>) {
        if !flat.contains(&ty) {
            flat.push(ty);
        }
    }

    let mut flat: Vec<TypeDescriptor> = Vec::new();
    for member in members {
        match member {
            TypeDescriptor::Union(inner) => {
                for ty in inner {
                    push(ty, &mut flat);
                }
            }
            TypeDescriptor::Optional(inner) => {
                push(*inner, &mut flat);
                push(TypeDescriptor::Scalar(Scalar::None), &mut flat);
            }
            other => push(other, &mut flat),
        }
    }

    let none = TypeDescriptor::Scalar(Scalar::None);
    match flat.len() {
        0 => TypeDescriptor::Unknown,
        1 => flat.remove(0),
        2 if flat.contains(&none) => {
            let other = flat.into_iter().find(|ty| *ty != none).unwrap_or(TypeDescriptor::Unknown);
            TypeDescriptor::optional(other)
        }
        _ => TypeDescriptor::Union(flat),
    }
}
