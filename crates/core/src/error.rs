use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
  /// Fatal problem with the benchmark definition document itself.
  #[error("Definition: {0}")]
  Definition(String),

  /// Fatal problem inside one task-definition file.
  #[error("Task definition {file}: {reason}")]
  TaskDefinition { file: String, reason: String },

  #[error("Unknown tool {0:?}")]
  UnknownTool(String),

  #[error("{name} limit {value:?}: {reason}")]
  InvalidLimit {
    name: &'static str,
    value: String,
    reason: String,
  },

  #[error("Double specification of required {0}")]
  DuplicateRequirement(&'static str),

  #[error("Requirement: {0}")]
  InvalidRequirement(String),

  /// A tool adapter violated its contract (e.g. produced an empty argument).
  #[error("Tool: {0}")]
  Tool(String),

  /// The executor has not assigned the tool executable yet.
  #[error("Tool executable not set")]
  ExecutableNotSet,

  #[error("IO: {0}")]
  Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
