//! Shared types for toolsync.
//!
//! Everything the engine and the CLI need to agree on lives here: the
//! declared tool list, the persisted state records, and the platform
//! matching rules used to pick release assets.

pub mod arch;
pub mod asset;
pub mod types;

pub use arch::Arch;
pub use asset::{ArchiveKind, infer_tool_name};
pub use types::{
    Alias, AliasConfig, FontRecord, FontSpec, Setting, SettingRecord, SourceKind, StateStore,
    ToolRecord, ToolSpec,
};
