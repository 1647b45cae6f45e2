//! Turns a parsed `def` into the method the wrapper exposes.

use crate::model::{
    ArgumentPlan, Conversion, FunctionDefinition, GeneratorError, MarshalPlan, MethodModel,
    MethodParameter, ParameterKind, Passing, Scalar, TypeDescriptor,
};
use crate::processor::naming;
use crate::processor::type_mapper::map_annotation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub method: MethodModel,
    /// Mapping degradations collected from every annotation.
    pub warnings: Vec<GeneratorError>,
}

pub fn build(definition: &FunctionDefinition) -> Built {
    let mut warnings = Vec::new();
    let mut parameters = Vec::with_capacity(definition.parameters.len());
    let mut taken: Vec<String> = Vec::new();

    for param in &definition.parameters {
        let mapped = map_annotation(param.annotation.as_ref());
        warnings.extend(mapped.warnings);

        let ty = match param.kind {
            ParameterKind::VariadicPositional => TypeDescriptor::sequence_of(mapped.ty),
            ParameterKind::VariadicKeyword => {
                TypeDescriptor::mapping_of(TypeDescriptor::Scalar(Scalar::Text), mapped.ty)
            }
            _ => mapped.ty,
        };

        let binding = unique_binding(&param.name, &taken);
        taken.push(binding.clone());

        parameters.push(MethodParameter {
            name: param.name.clone(),
            binding,
            ty,
            default: param.default.clone(),
            kind: param.kind,
        });
    }

    let returns = map_annotation(definition.returns.as_ref());
    warnings.extend(returns.warnings);

    let plan = MarshalPlan {
        arguments: parameters.iter().map(argument_plan).collect(),
        result: Conversion::for_type(&returns.ty),
    };

    Built {
        method: MethodModel {
            name: naming::method_name(&definition.name),
            source_name: definition.name.clone(),
            parameters,
            returns: returns.ty,
            plan,
        },
        warnings,
    }
}

fn argument_plan(param: &MethodParameter) -> ArgumentPlan {
    // Variadic items are converted one by one, so the plan describes the
    // element type rather than the collection.
    let element = match (&param.kind, &param.ty) {
        (ParameterKind::VariadicPositional, TypeDescriptor::Generic(_, args)) => &args[0],
        (ParameterKind::VariadicKeyword, TypeDescriptor::Generic(_, args)) => &args[1],
        _ => &param.ty,
    };

    ArgumentPlan {
        source_name: param.name.clone(),
        binding: param.binding.clone(),
        passing: Passing::from(param.kind),
        optional: param.default.is_some(),
        conversion: Conversion::for_type(element),
    }
}

/// Escaped binding for `name`, suffixed until it differs from every
/// binding already handed out in the same signature.
fn unique_binding(name: &str, taken: &[String]) -> String {
    let mut binding = naming::binding(name);
    while taken.contains(&binding) {
        binding.push('_');
    }
    binding
}
