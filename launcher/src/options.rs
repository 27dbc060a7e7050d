//! Launch configuration consumed by the launcher.

use std::path::PathBuf;

use serde::Deserialize;

const fn default_true() -> bool {
    true
}

fn default_logging_level() -> String {
    "information".to_string()
}

/// Fallback when neither the language-scoped nor the global setting is set.
pub const DEFAULT_TAB_SIZE: u32 = 4;

/// Configuration for launching the analysis server.
///
/// ```toml
/// [launch]
/// use_modern_net = true
/// wait_for_debugger = false
/// use_editor_formatting_settings = true
/// server_path = "~/.kindle/server/Server.dll"
///
/// [launch.formatting]
/// insert_spaces = true
/// tab_size = 4
///
/// [launch.formatting.csharp]
/// tab_size = 2
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct LaunchOptions {
    /// Run the server on the managed runtime instead of the legacy one.
    #[serde(default = "default_true")]
    pub use_modern_net: bool,
    /// Start the legacy runtime with a debugger agent listening.
    #[serde(default)]
    pub wait_for_debugger: bool,
    /// Forward editor formatting settings as server arguments.
    #[serde(default = "default_true")]
    pub use_editor_formatting_settings: bool,
    /// Server executable or assembly. Used as the launch path hint.
    #[serde(default)]
    pub server_path: Option<PathBuf>,
    /// `dotnet` executable, or the directory containing it.
    #[serde(default)]
    pub dotnet_path: Option<PathBuf>,
    /// Mono installation prefix (the directory holding `bin/mono`).
    #[serde(default)]
    pub mono_path: Option<PathBuf>,
    /// Value of the server's `--loglevel` argument.
    #[serde(default = "default_logging_level")]
    pub logging_level: String,
    #[serde(default)]
    pub formatting: EditorFormatting,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            use_modern_net: true,
            wait_for_debugger: false,
            use_editor_formatting_settings: true,
            server_path: None,
            dotnet_path: None,
            mono_path: None,
            logging_level: default_logging_level(),
            formatting: EditorFormatting::default(),
        }
    }
}

/// One layer of formatting settings. Unset fields defer to the next layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct FormattingSettings {
    pub insert_spaces: Option<bool>,
    pub tab_size: Option<u32>,
}

/// Global editor formatting settings plus the C#-scoped overrides.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct EditorFormatting {
    #[serde(flatten)]
    pub global: FormattingSettings,
    #[serde(default)]
    pub csharp: FormattingSettings,
}

impl EditorFormatting {
    #[must_use]
    pub fn use_tabs(&self) -> bool {
        !self
            .csharp
            .insert_spaces
            .or(self.global.insert_spaces)
            .unwrap_or(true)
    }

    #[must_use]
    pub fn tab_size(&self) -> u32 {
        self.csharp
            .tab_size
            .or(self.global.tab_size)
            .unwrap_or(DEFAULT_TAB_SIZE)
    }

    /// The editor has no separate indentation setting; it follows the tab size.
    #[must_use]
    pub fn indentation_size(&self) -> u32 {
        self.tab_size()
    }
}
