#[derive(thiserror::Error, Debug, Clone)]
pub enum ProjectionError {
    #[error("Field named '{0}' was not found in definition name '{1}'")]
    FieldDefinitionNotFound(String, String),
    #[error("Unknown fragment \"{0}\"")]
    FragmentNotFound(String),
    #[error("Schema does not define a root type for {0} operations")]
    UnknownRootType(String),
}
