pub mod capability;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod fold;
pub mod graph;
pub mod id;
pub mod kind;
pub mod math;
pub mod node;
pub mod socket;
pub mod topology;

// Re-export commonly used types
pub use context::{AovKind, SceneContext};
pub use diagnostics::GraphDiagnostic;
pub use error::CoreError;
pub use fold::ConstantFolder;
pub use graph::{Connection, NodeMap, NodeSet, ShaderGraph};
pub use id::{InputRef, NodeId, OutputRef};
pub use kind::{ClosureKind, NodeKind, OslNode, OslSocket, SpecialType, VOLUME_STACK_SIZE};
pub use math::{ClampType, MathType, MixType, VectorMathType};
pub use node::{BumpState, ShaderNode};
pub use socket::{DefaultLink, ShaderInput, ShaderOutput, SocketFlags, SocketType, SocketValue};
