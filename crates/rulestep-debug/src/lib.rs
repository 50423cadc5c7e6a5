//! Rulestep Debug: step-through debugging of rule-language sources
//!
//! A [`DebugSession`] owns one execution engine and drives an
//! [`EditorSurface`]. Given the generated code compiled from the same rules
//! it can also translate generated-code lines back to rule lines.
//!
//! # Example
//!
//! ```ignore
//! use rulestep_debug::{DebugConfig, DebugSession};
//! use rulestep_engine::RuleKind;
//!
//! let mut session = DebugSession::new(DebugConfig::default());
//! session.initialize("price = 10\nqty = 3\ntotal = price", None, RuleKind::Standard);
//! session.set_breakpoints([3]);
//! session.start();
//! session.continue_();
//! assert_eq!(session.get_current_state().line, 3);
//! ```

pub mod commands;
pub mod config;
pub mod editor;
pub mod error;
pub mod history;
pub mod logging;
pub mod relevance;
pub mod session;
pub mod state;
pub mod terminal;

pub use commands::Command;
pub use config::DebugConfig;
pub use editor::{EditorSurface, HeadlessEditor};
pub use error::DebugError;
pub use history::{VariableChange, VariableHistory};
pub use relevance::{assess, filter_relevant, is_relevant, Relevance};
pub use session::DebugSession;
pub use state::{DebugState, Frame, FrameOrigin, TraceEntry};
pub use terminal::{MessageKind, Terminal, TerminalMessage};
