//! Tool definitions exposed to the model
//!
//! The schema is built from explicit typed structs and serialized to the
//! JSON-schema wire form, rather than assembled from loose maps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Name of the command execution tool
pub const EXECUTE_COMMAND_TOOL: &str = "execute_command";

/// A tool entry in the request payload
#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionSpec,
}

/// Function description and parameter schema
#[derive(Debug, Clone, Serialize)]
pub struct FunctionSpec {
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// Object schema with an explicit required list
#[derive(Debug, Clone, Serialize)]
pub struct ParameterSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub properties: BTreeMap<String, PropertySpec>,
    pub required: Vec<String>,
}

/// A single named parameter
#[derive(Debug, Clone, Serialize)]
pub struct PropertySpec {
    #[serde(rename = "type")]
    pub prop_type: String,
    pub description: String,
}

impl FunctionSpec {
    /// Start a function spec with an empty parameter object
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: ParameterSchema {
                schema_type: "object".to_string(),
                properties: BTreeMap::new(),
                required: Vec::new(),
            },
        }
    }

    /// Add a string parameter
    pub fn string_param(
        mut self,
        name: &str,
        description: impl Into<String>,
        required: bool,
    ) -> Self {
        self.parameters.properties.insert(
            name.to_string(),
            PropertySpec {
                prop_type: "string".to_string(),
                description: description.into(),
            },
        );
        if required {
            self.parameters.required.push(name.to_string());
        }
        self
    }

    /// Wrap into a tool definition entry
    pub fn into_tool(self) -> ToolDefinition {
        ToolDefinition {
            kind: "function".to_string(),
            function: self,
        }
    }
}

/// Parsed arguments of an `execute_command` call
#[derive(Debug, Clone, Deserialize)]
pub struct ExecuteCommandArgs {
    /// Exact shell command text
    pub command: String,
    /// Why this command serves the user's request; shown at confirmation
    pub reasoning: String,
}

/// The command execution tool definition
pub fn execute_command_tool() -> ToolDefinition {
    FunctionSpec::new(
        EXECUTE_COMMAND_TOOL,
        "Execute a shell command in the user's terminal and return the output. \
         Use this to help users with system tasks, file operations, git commands, \
         package management, and other terminal operations. The command will run \
         in the user's current working directory.",
    )
    .string_param(
        "command",
        "The shell command to execute (e.g., 'ls -la', 'git status', 'npm install')",
        true,
    )
    .string_param(
        "reasoning",
        "Brief explanation of why this command is needed to accomplish the user's request",
        true,
    )
    .into_tool()
}

/// The default toolset sent with every model round
pub fn default_toolset() -> Vec<ToolDefinition> {
    vec![execute_command_tool()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_wire_shape() {
        let tool = execute_command_tool();
        let json = serde_json::to_value(&tool).unwrap();

        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "execute_command");
        assert_eq!(json["function"]["parameters"]["type"], "object");
        assert_eq!(
            json["function"]["parameters"]["properties"]["command"]["type"],
            "string"
        );
        let required = json["function"]["parameters"]["required"]
            .as_array()
            .unwrap();
        assert!(required.contains(&"command".into()));
        assert!(required.contains(&"reasoning".into()));
    }

    #[test]
    fn test_args_parse() {
        let args: ExecuteCommandArgs =
            serde_json::from_str(r#"{"command":"ls -la","reasoning":"list files"}"#).unwrap();
        assert_eq!(args.command, "ls -la");
        assert_eq!(args.reasoning, "list files");
    }

    #[test]
    fn test_args_missing_field_is_error() {
        let parsed: Result<ExecuteCommandArgs, _> =
            serde_json::from_str(r#"{"command":"ls"}"#);
        assert!(parsed.is_err());
    }
}
