//! Host platform descriptor.
//!
//! Passed explicitly so Windows command composition can be exercised on any host.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformInfo {
    os: Os,
}

impl PlatformInfo {
    #[must_use]
    pub const fn new(os: Os) -> Self {
        Self { os }
    }

    /// The platform this binary was compiled for.
    #[must_use]
    pub const fn current() -> Self {
        let os = if cfg!(windows) {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else if cfg!(target_os = "linux") {
            Os::Linux
        } else {
            Os::Other
        };
        Self { os }
    }

    #[must_use]
    pub const fn os(self) -> Os {
        self.os
    }

    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self.os, Os::Windows)
    }

    /// Name of the managed runtime host executable on this platform.
    #[must_use]
    pub const fn dotnet_executable_name(self) -> &'static str {
        if self.is_windows() {
            "dotnet.exe"
        } else {
            "dotnet"
        }
    }
}
