pub const TYPENAME_FIELD_NAME: &str = "__typename";
pub const ENTITIES_FIELD_NAME: &str = "_entities";
pub const REPRESENTATIONS_VARIABLE_NAME: &str = "representations";
pub const DOWNSTREAM_SERVICE_ERROR_CODE: &str = "DOWNSTREAM_SERVICE_ERROR";
