//! Earth Engine expression graphs.
//!
//! A computation is sent as a flat table of [`ValueNode`]s keyed by id, with
//! one id marked as the result. Nodes refer to each other either inline or
//! through [`ValueNode::ValueReference`]; function bodies must be references.
//!
//! ```json
//! {
//!   "result": "2",
//!   "values": {
//!     "0": { "constantValue": "COPERNICUS/S2_SR_HARMONIZED" },
//!     "1": { "functionInvocationValue": {
//!              "functionName": "ImageCollection.load",
//!              "arguments": { "id": { "valueReference": "0" } } } },
//!     "2": { ... }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One node of an expression graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ValueNode {
    /// Any JSON literal.
    ConstantValue(serde_json::Value),
    /// Reference to another entry of [`Expression::values`].
    ValueReference(String),
    /// Reference to an argument of the enclosing function definition.
    ArgumentReference(String),
    ArrayValue {
        values: Vec<ValueNode>,
    },
    DictionaryValue {
        values: BTreeMap<String, ValueNode>,
    },
    FunctionInvocationValue {
        #[serde(rename = "functionName")]
        function_name: String,
        arguments: BTreeMap<String, ValueNode>,
    },
    FunctionDefinitionValue {
        #[serde(rename = "argumentNames")]
        argument_names: Vec<String>,
        /// Id of the body in [`Expression::values`].
        body: String,
    },
}

impl ValueNode {
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Self::ConstantValue(value.into())
    }

    /// Call a platform function with named arguments.
    pub fn invoke<I, K>(function_name: &str, arguments: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueNode)>,
        K: Into<String>,
    {
        Self::FunctionInvocationValue {
            function_name: function_name.to_string(),
            arguments: arguments.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn array(values: Vec<ValueNode>) -> Self {
        Self::ArrayValue { values }
    }

    pub fn dictionary<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, ValueNode)>,
        K: Into<String>,
    {
        Self::DictionaryValue {
            values: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn argument(name: &str) -> Self {
        Self::ArgumentReference(name.to_string())
    }

    pub fn reference(id: &str) -> Self {
        Self::ValueReference(id.to_string())
    }

    /// Function name, when this node is an invocation.
    pub fn function_name(&self) -> Option<&str> {
        match self {
            Self::FunctionInvocationValue { function_name, .. } => Some(function_name),
            _ => None,
        }
    }

    /// Named argument of an invocation.
    pub fn arg(&self, name: &str) -> Option<&ValueNode> {
        match self {
            Self::FunctionInvocationValue { arguments, .. } => arguments.get(name),
            _ => None,
        }
    }
}

/// A complete expression: value table plus the id of the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expression {
    pub result: String,
    pub values: BTreeMap<String, ValueNode>,
}

impl Expression {
    /// The node marked as result.
    pub fn result_node(&self) -> Option<&ValueNode> {
        self.values.get(&self.result)
    }

    /// Follow value references until a concrete node is reached.
    pub fn resolve<'a>(&'a self, node: &'a ValueNode) -> Option<&'a ValueNode> {
        let mut current = node;
        // A well-formed graph is acyclic; bound the walk anyway.
        for _ in 0..=self.values.len() {
            match current {
                ValueNode::ValueReference(id) => current = self.values.get(id)?,
                other => return Some(other),
            }
        }
        None
    }
}

/// Assigns sequential ids to nodes as they are added.
#[derive(Debug, Default)]
pub struct ExpressionBuilder {
    values: BTreeMap<String, ValueNode>,
    next_id: usize,
}

impl ExpressionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` and return a reference to it.
    pub fn push(&mut self, node: ValueNode) -> ValueNode {
        let id = self.push_id(node);
        ValueNode::ValueReference(id)
    }

    /// Store `node` and return its id.
    pub fn push_id(&mut self, node: ValueNode) -> String {
        let id = self.next_id.to_string();
        self.next_id += 1;
        self.values.insert(id.clone(), node);
        id
    }

    /// Store `result` and mark it as the expression's result.
    pub fn finish(mut self, result: ValueNode) -> Expression {
        let result = self.push_id(result);
        Expression {
            result,
            values: self.values,
        }
    }
}
