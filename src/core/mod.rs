pub mod buffer;
pub mod command;
pub mod content;
pub mod cursor;
pub mod editor;
pub mod engine;
pub mod history;
pub mod key;
pub mod keymap;
pub mod mode;
pub mod motion;
pub mod position;
pub mod register;
pub mod settings;
pub mod view;

pub use buffer::Buffer;
pub use command::{Command, CommandExecutionError, TextTarget};
pub use content::TextContent;
pub use cursor::{CaretType, Cursor, CursorService};
pub use editor::{EditorAdaptor, UserInterfaceService};
pub use engine::Engine;
pub use key::{parse_keys, KeyStroke};
pub use mode::{Mode, ModeArgs};
pub use position::{Position, TextRange};
pub use register::RegisterManager;
pub use settings::Settings;
