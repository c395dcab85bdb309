use std::fmt::{self, Display};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

const LIST_SEGMENT: &str = "@";
const TYPE_CONDITION_PREFIX: &str = "... on ";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryPlan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum PlanNode {
    Sequence(SequenceNode),
    Parallel(ParallelNode),
    Flatten(FlattenNode),
    Fetch(FetchNode),
    Condition(ConditionNode),
    Subscription(SubscriptionNode),
}

impl PlanNode {
    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::Sequence(_) => "Sequence",
            PlanNode::Parallel(_) => "Parallel",
            PlanNode::Flatten(_) => "Flatten",
            PlanNode::Fetch(_) => "Fetch",
            PlanNode::Condition(_) => "Condition",
            PlanNode::Subscription(_) => "Subscription",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceNode {
    pub nodes: Vec<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParallelNode {
    pub nodes: Vec<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlattenNode {
    pub path: FlattenNodePath,
    pub node: Box<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionNode {
    pub condition: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub if_clause: Option<Box<PlanNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub else_clause: Option<Box<PlanNode>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionNode {
    pub primary: Box<PlanNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchNode {
    pub service_name: String,
    pub operation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_kind: Option<OperationKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requires: Option<Vec<RequiresSelection>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variable_usages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_rewrites: Option<Vec<FetchRewrite>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_rewrites: Option<Vec<FetchRewrite>>,
}

impl FetchNode {
    pub fn operation_kind(&self) -> OperationKind {
        self.operation_kind.unwrap_or_default()
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum OperationKind {
    #[default]
    Query,
    Mutation,
    Subscription,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum RequiresSelection {
    Field(RequiresField),
    InlineFragment(RequiresInlineFragment),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiresField {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selections: Option<Vec<RequiresSelection>>,
}

impl RequiresField {
    pub fn response_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiresInlineFragment {
    pub type_condition: String,
    pub selections: Vec<RequiresSelection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum FetchRewrite {
    ValueSetter(ValueSetter),
    KeyRenamer(KeyRenamer),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueSetter {
    pub path: Vec<FetchNodePathSegment>,
    pub set_value_to: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyRenamer {
    pub path: Vec<FetchNodePathSegment>,
    pub rename_key_to: String,
}

pub type FlattenNodePath = Vec<FlattenNodePathSegment>;

/// One step of a Flatten path. On the wire a plain string:
/// `"@"` descends into every list item, `"... on T"` narrows to `T`,
/// anything else is a field name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FlattenNodePathSegment {
    Field(String),
    Cast(String),
    List,
}

impl From<&str> for FlattenNodePathSegment {
    fn from(raw: &str) -> Self {
        if raw == LIST_SEGMENT {
            FlattenNodePathSegment::List
        } else if let Some(type_condition) = raw.strip_prefix(TYPE_CONDITION_PREFIX) {
            FlattenNodePathSegment::Cast(type_condition.trim().to_string())
        } else {
            FlattenNodePathSegment::Field(raw.to_string())
        }
    }
}

impl Display for FlattenNodePathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlattenNodePathSegment::Field(name) => write!(f, "{}", name),
            FlattenNodePathSegment::Cast(type_condition) => {
                write!(f, "{}{}", TYPE_CONDITION_PREFIX, type_condition)
            }
            FlattenNodePathSegment::List => write!(f, "{}", LIST_SEGMENT),
        }
    }
}

impl Serialize for FlattenNodePathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FlattenNodePathSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SegmentVisitor::<FlattenNodePathSegment>::new())
    }
}

pub fn flatten_path_to_string(path: &[FlattenNodePathSegment]) -> String {
    path.iter()
        .map(|segment| segment.to_string())
        .collect::<Vec<_>>()
        .join(".")
}

/// One step of a rewrite path: a key, or a `"... on T"` guard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FetchNodePathSegment {
    Key(String),
    TypenameEquals(String),
}

impl From<&str> for FetchNodePathSegment {
    fn from(raw: &str) -> Self {
        match raw.strip_prefix(TYPE_CONDITION_PREFIX) {
            Some(type_condition) => {
                FetchNodePathSegment::TypenameEquals(type_condition.trim().to_string())
            }
            None => FetchNodePathSegment::Key(raw.to_string()),
        }
    }
}

impl Display for FetchNodePathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchNodePathSegment::Key(key) => write!(f, "{}", key),
            FetchNodePathSegment::TypenameEquals(type_condition) => {
                write!(f, "{}{}", TYPE_CONDITION_PREFIX, type_condition)
            }
        }
    }
}

impl Serialize for FetchNodePathSegment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FetchNodePathSegment {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_str(SegmentVisitor::<FetchNodePathSegment>::new())
    }
}

struct SegmentVisitor<T>(std::marker::PhantomData<T>);

impl<T> SegmentVisitor<T> {
    fn new() -> Self {
        SegmentVisitor(std::marker::PhantomData)
    }
}

impl<'de, T> de::Visitor<'de> for SegmentVisitor<T>
where
    T: for<'a> From<&'a str>,
{
    type Value = T;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string path segment")
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        Ok(T::from(value))
    }
}
