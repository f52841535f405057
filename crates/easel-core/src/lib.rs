//! Easel Core Library
//!
//! Platform-agnostic editing engine for the Easel design editor: the scene
//! graph, selection and transforms, undo history, tools, layer view and the
//! persistence bridge to a design store.

pub mod assets;
pub mod color;
pub mod config;
pub mod design;
pub mod history;
pub mod input;
pub mod layers;
pub mod notify;
pub mod objects;
pub mod scene;
pub mod selection;
pub mod session;
pub mod storage;
pub mod tools;
pub mod viewport;

pub use assets::{AssetError, AssetKind, AssetRef};
pub use color::Color;
pub use config::{ConfigError, EditorConfig};
pub use design::{DesignRecord, DesignUpdate, Dimensions, NewDesign, TemplateRecord};
pub use history::HistoryManager;
pub use input::{KeyPress, Modifiers, MouseButton, PointerEvent};
pub use layers::{LayerCommand, LayerRow, LayerView};
pub use notify::{Notice, NoticeLevel, NoticeQueue};
pub use objects::{AttributePatch, ObjectId, ObjectKind, SceneObject};
pub use scene::{ChangeOrigin, SceneError, SceneGraph, ScenePayload, ZDirection};
pub use selection::SelectionController;
pub use session::{EditorSession, OpenStatus};
pub use storage::{DesignStore, LoadOutcome, PersistenceBridge, SaveReason, StorageError};
pub use tools::{Preset, ShapePreset, TextPreset, Tool, ToolCommand, ToolMachine};
pub use viewport::Viewport;
