use std::collections::{HashMap, HashSet};

use graphql_parser::schema::{
    Definition, Directive, Document, EnumValue, Field, InputValue, Type, TypeDefinition,
    TypeExtension,
};
use serde_json::Value;

use crate::{plan::plan_nodes::OperationKind, variables::value_from_ast::value_from_ast};

const INACCESSIBLE_DIRECTIVE: &str = "inaccessible";

#[derive(thiserror::Error, Debug, Clone)]
pub enum SchemaMetadataError {
    #[error("Failed to parse the supergraph SDL: {0}")]
    ParseError(String),
}

/// A variable or input field type, as written in the schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeNode {
    Named(String),
    List(Box<TypeNode>),
    NonNull(Box<TypeNode>),
}

impl TypeNode {
    pub fn is_non_null(&self) -> bool {
        matches!(self, TypeNode::NonNull(_))
    }

    pub fn inner_type_name(&self) -> &str {
        match self {
            TypeNode::Named(name) => name,
            TypeNode::List(inner) | TypeNode::NonNull(inner) => inner.inner_type_name(),
        }
    }
}

impl<'a> From<&Type<'a, String>> for TypeNode {
    fn from(ty: &Type<'a, String>) -> Self {
        match ty {
            Type::NamedType(name) => TypeNode::Named(name.clone()),
            Type::ListType(inner) => TypeNode::List(Box::new(inner.as_ref().into())),
            Type::NonNullType(inner) => TypeNode::NonNull(Box::new(inner.as_ref().into())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InputFieldDefinition {
    pub type_node: TypeNode,
    pub default_value: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct RootTypes {
    pub query: String,
    pub mutation: Option<String>,
    pub subscription: Option<String>,
}

impl Default for RootTypes {
    fn default() -> Self {
        RootTypes {
            query: "Query".to_string(),
            mutation: None,
            subscription: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct PossibleTypes {
    map: HashMap<String, HashSet<String>>,
}

impl PossibleTypes {
    /// Exact match, or `type_condition` is an abstract type with `type_name` as a member.
    pub fn entity_satisfies_type_condition(&self, type_name: &str, type_condition: &str) -> bool {
        if type_name == type_condition {
            true
        } else if let Some(possible_types_of_type) = self.map.get(type_condition) {
            possible_types_of_type.contains(type_name)
        } else {
            false
        }
    }
}

#[derive(Debug, Default)]
pub struct SchemaMetadata {
    pub possible_types: PossibleTypes,
    /// type name -> field name -> named return type
    pub type_fields: HashMap<String, HashMap<String, String>>,
    pub enum_values: HashMap<String, HashSet<String>>,
    pub input_object_fields: HashMap<String, HashMap<String, InputFieldDefinition>>,
    pub inaccessible_types: HashSet<String>,
    pub inaccessible_enum_values: HashMap<String, HashSet<String>>,
    pub root_types: RootTypes,
}

impl SchemaMetadata {
    pub fn from_sdl(sdl: &str) -> Result<Self, SchemaMetadataError> {
        let document = graphql_parser::parse_schema::<String>(sdl)
            .map_err(|err| SchemaMetadataError::ParseError(err.to_string()))?;

        Ok(Self::from_document(&document))
    }

    pub fn from_document(document: &Document<'_, String>) -> Self {
        let mut builder = MetadataBuilder::default();

        for definition in &document.definitions {
            match definition {
                Definition::SchemaDefinition(schema_definition) => {
                    builder.query_root = schema_definition.query.clone();
                    builder.mutation_root = schema_definition.mutation.clone();
                    builder.subscription_root = schema_definition.subscription.clone();
                }
                Definition::TypeDefinition(type_definition) => builder.add_type(type_definition),
                Definition::TypeExtension(type_extension) => builder.add_extension(type_extension),
                Definition::DirectiveDefinition(_) => {}
            }
        }

        builder.build()
    }

    pub fn root_type_name(&self, operation_kind: OperationKind) -> Option<&str> {
        match operation_kind {
            OperationKind::Query => Some(self.root_types.query.as_str()),
            OperationKind::Mutation => self.root_types.mutation.as_deref(),
            OperationKind::Subscription => self.root_types.subscription.as_deref(),
        }
    }

    pub fn field_type(&self, type_name: &str, field_name: &str) -> Option<&str> {
        self.type_fields
            .get(type_name)
            .and_then(|fields| fields.get(field_name))
            .map(String::as_str)
    }

    pub fn is_inaccessible_type(&self, type_name: &str) -> bool {
        self.inaccessible_types.contains(type_name)
    }

    pub fn is_inaccessible_enum_value(&self, enum_name: &str, value: &str) -> bool {
        self.inaccessible_enum_values
            .get(enum_name)
            .is_some_and(|values| values.contains(value))
    }
}

#[derive(Default)]
struct MetadataBuilder {
    direct_possible_types: HashMap<String, Vec<String>>,
    metadata: SchemaMetadata,
    query_root: Option<String>,
    mutation_root: Option<String>,
    subscription_root: Option<String>,
}

impl MetadataBuilder {
    fn add_type(&mut self, type_definition: &TypeDefinition<'_, String>) {
        match type_definition {
            TypeDefinition::Object(object_type) => {
                self.add_composite(
                    &object_type.name,
                    &object_type.fields,
                    &object_type.implements_interfaces,
                    &object_type.directives,
                );
            }
            TypeDefinition::Interface(interface_type) => {
                self.add_composite(
                    &interface_type.name,
                    &interface_type.fields,
                    &interface_type.implements_interfaces,
                    &interface_type.directives,
                );
            }
            TypeDefinition::Union(union_type) => {
                self.add_union(&union_type.name, &union_type.types, &union_type.directives);
            }
            TypeDefinition::Enum(enum_type) => {
                self.add_enum(&enum_type.name, &enum_type.values);
            }
            TypeDefinition::InputObject(input_type) => {
                self.add_input_object(&input_type.name, &input_type.fields);
            }
            TypeDefinition::Scalar(_) => {}
        }
    }

    fn add_extension(&mut self, type_extension: &TypeExtension<'_, String>) {
        match type_extension {
            TypeExtension::Object(object_ext) => {
                self.add_composite(
                    &object_ext.name,
                    &object_ext.fields,
                    &object_ext.implements_interfaces,
                    &object_ext.directives,
                );
            }
            TypeExtension::Interface(interface_ext) => {
                self.add_composite(
                    &interface_ext.name,
                    &interface_ext.fields,
                    &interface_ext.implements_interfaces,
                    &interface_ext.directives,
                );
            }
            TypeExtension::Union(union_ext) => {
                self.add_union(&union_ext.name, &union_ext.types, &union_ext.directives);
            }
            TypeExtension::Enum(enum_ext) => {
                self.add_enum(&enum_ext.name, &enum_ext.values);
            }
            TypeExtension::InputObject(input_ext) => {
                self.add_input_object(&input_ext.name, &input_ext.fields);
            }
            TypeExtension::Scalar(_) => {}
        }
    }

    fn add_composite(
        &mut self,
        name: &str,
        fields: &[Field<'_, String>],
        implements_interfaces: &[String],
        directives: &[Directive<'_, String>],
    ) {
        let type_fields = self
            .metadata
            .type_fields
            .entry(name.to_string())
            .or_default();
        for field in fields {
            type_fields.insert(field.name.clone(), named_type(&field.field_type).to_string());
        }

        for interface_name in implements_interfaces {
            self.direct_possible_types
                .entry(interface_name.clone())
                .or_default()
                .push(name.to_string());
        }

        if is_inaccessible(directives) {
            self.metadata.inaccessible_types.insert(name.to_string());
        }
    }

    fn add_union(&mut self, name: &str, members: &[String], directives: &[Directive<'_, String>]) {
        self.direct_possible_types
            .entry(name.to_string())
            .or_default()
            .extend(members.iter().cloned());

        if is_inaccessible(directives) {
            self.metadata.inaccessible_types.insert(name.to_string());
        }
    }

    fn add_enum(&mut self, name: &str, values: &[EnumValue<'_, String>]) {
        let enum_values = self
            .metadata
            .enum_values
            .entry(name.to_string())
            .or_default();
        for value in values {
            enum_values.insert(value.name.clone());
            if is_inaccessible(&value.directives) {
                self.metadata
                    .inaccessible_enum_values
                    .entry(name.to_string())
                    .or_default()
                    .insert(value.name.clone());
            }
        }
    }

    fn add_input_object(&mut self, name: &str, fields: &[InputValue<'_, String>]) {
        let input_fields = self
            .metadata
            .input_object_fields
            .entry(name.to_string())
            .or_default();
        for field in fields {
            input_fields.insert(
                field.name.clone(),
                InputFieldDefinition {
                    type_node: (&field.value_type).into(),
                    default_value: field.default_value.as_ref().map(value_from_ast),
                },
            );
        }
    }

    fn build(mut self) -> SchemaMetadata {
        let mut resolved: HashMap<String, HashSet<String>> = HashMap::new();
        for (abstract_type, direct_members) in &self.direct_possible_types {
            let mut members: HashSet<String> = HashSet::new();
            let mut queue: Vec<&str> = direct_members.iter().map(String::as_str).collect();
            // interfaces implementing interfaces make this transitive
            while let Some(member) = queue.pop() {
                if members.insert(member.to_string()) {
                    if let Some(nested) = self.direct_possible_types.get(member) {
                        queue.extend(nested.iter().map(String::as_str));
                    }
                }
            }
            resolved.insert(abstract_type.clone(), members);
        }
        self.metadata.possible_types = PossibleTypes { map: resolved };

        let type_exists = |name: &str| self.metadata.type_fields.contains_key(name);
        self.metadata.root_types = RootTypes {
            query: self.query_root.clone().unwrap_or_else(|| "Query".to_string()),
            mutation: self
                .mutation_root
                .clone()
                .or_else(|| type_exists("Mutation").then(|| "Mutation".to_string())),
            subscription: self
                .subscription_root
                .clone()
                .or_else(|| type_exists("Subscription").then(|| "Subscription".to_string())),
        };

        self.metadata
    }
}

fn named_type<'a>(ty: &'a Type<'_, String>) -> &'a str {
    match ty {
        Type::NamedType(name) => name,
        Type::ListType(inner) | Type::NonNullType(inner) => named_type(inner),
    }
}

fn is_inaccessible(directives: &[Directive<'_, String>]) -> bool {
    directives
        .iter()
        .any(|directive| directive.name == INACCESSIBLE_DIRECTIVE)
}
